//! Arena of tracked elements keyed by generational handles.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::Vector2D;

/// Opaque reference to a slot in an [`ElementRegistry`].
///
/// A handle stays valid until it is unregistered. The slot may later be
/// reused, but with a new generation, so an old handle never aliases a new
/// element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementHandle {
    index: u32,
    generation: u32,
}

impl ElementHandle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Packs the handle into one integer for hosts that can only pass numbers
    /// around (e.g. JavaScript).
    pub fn to_bits(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

/// Kinematic state of one registered element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedElement {
    /// Undisplaced center, captured at registration.
    pub base_position: Vector2D,
    pub velocity: Vector2D,
    /// Cumulative translation applied to the element.
    pub offset: Vector2D,
}

impl TrackedElement {
    pub fn new(base_position: Vector2D) -> Self {
        Self {
            base_position,
            velocity: Vector2D::zero(),
            offset: Vector2D::zero(),
        }
    }

    pub fn current_center(&self) -> Vector2D {
        self.base_position + self.offset
    }
}

#[derive(Debug, Clone)]
enum SlotState {
    Free,
    Reserved,
    Active(TrackedElement),
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    state: SlotState,
}

/// Set of elements participating in the simulation.
#[derive(Debug, Clone, Default)]
pub struct ElementRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    active: usize,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a fresh handle. The element is not simulated until it is
    /// registered.
    pub fn reserve(&mut self) -> ElementHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.state = SlotState::Reserved;
            return ElementHandle {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            state: SlotState::Reserved,
        });
        ElementHandle {
            index,
            generation: 0,
        }
    }

    /// Starts simulating `handle` with `base_position` as its undisplaced
    /// center. Returns `false` without touching any state when the handle is
    /// already registered or stale.
    pub fn register(&mut self, handle: ElementHandle, base_position: Vector2D) -> bool {
        let Some(slot) = self.slot_mut(handle) else {
            return false;
        };
        if !matches!(slot.state, SlotState::Reserved) {
            return false;
        }

        slot.state = SlotState::Active(TrackedElement::new(base_position));
        self.active += 1;
        log::debug!(
            "registered element {:?} at ({}, {})",
            handle,
            base_position.x,
            base_position.y
        );
        true
    }

    /// Drops all state for `handle` and retires it. Returns `false` when the
    /// handle was unknown or already unregistered.
    pub fn unregister(&mut self, handle: ElementHandle) -> bool {
        let Some(slot) = self.slot_mut(handle) else {
            return false;
        };

        let was_active = matches!(slot.state, SlotState::Active(_));
        slot.state = SlotState::Free;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        if was_active {
            self.active -= 1;
        }
        log::debug!("unregistered element {:?}", handle);
        true
    }

    pub fn contains(&self, handle: ElementHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: ElementHandle) -> Option<&TrackedElement> {
        let slot = self.slots.get(handle.index as usize)?;
        match &slot.state {
            SlotState::Active(element) if slot.generation == handle.generation => Some(element),
            _ => None,
        }
    }

    /// Number of registered (active) elements.
    pub fn len(&self) -> usize {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// Registered elements in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ElementHandle, &TrackedElement)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| match &slot.state {
            SlotState::Active(element) => Some((
                ElementHandle {
                    index: index as u32,
                    generation: slot.generation,
                },
                element,
            )),
            _ => None,
        })
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (ElementHandle, &mut TrackedElement)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| match &mut slot.state {
                SlotState::Active(element) => Some((
                    ElementHandle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    element,
                )),
                _ => None,
            })
    }

    /// Unregisters everything. Every outstanding handle becomes stale.
    pub fn clear(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            slot.state = SlotState::Free;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(index as u32);
        }
        self.active = 0;
        log::debug!("registry cleared");
    }

    fn slot_mut(&mut self, handle: ElementHandle) -> Option<&mut Slot> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && !matches!(slot.state, SlotState::Free))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_initializes_state() {
        let mut registry = ElementRegistry::new();
        let handle = registry.reserve();
        assert!(!registry.contains(handle));

        assert!(registry.register(handle, Vector2D::new(10.0, 20.0)));

        let element = registry.get(handle).unwrap();
        assert_eq!(element.base_position, Vector2D::new(10.0, 20.0));
        assert_eq!(element.velocity, Vector2D::zero());
        assert_eq!(element.offset, Vector2D::zero());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_twice_is_noop() {
        let mut registry = ElementRegistry::new();
        let handle = registry.reserve();
        registry.register(handle, Vector2D::new(10.0, 20.0));
        let before = *registry.get(handle).unwrap();

        assert!(!registry.register(handle, Vector2D::new(99.0, 99.0)));

        assert_eq!(*registry.get(handle).unwrap(), before);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_twice_is_noop() {
        let mut registry = ElementRegistry::new();
        let handle = registry.reserve();
        registry.register(handle, Vector2D::zero());

        assert!(registry.unregister(handle));
        assert!(!registry.unregister(handle));
        assert!(registry.is_empty());
        assert!(!registry.contains(handle));
    }

    #[test]
    fn test_unregister_reserved_handle_frees_slot() {
        let mut registry = ElementRegistry::new();
        let handle = registry.reserve();
        assert!(registry.unregister(handle));
        assert_eq!(registry.len(), 0);
        assert!(!registry.register(handle, Vector2D::zero()));
    }

    #[test]
    fn test_stale_handle_does_not_alias_reused_slot() {
        let mut registry = ElementRegistry::new();
        let old = registry.reserve();
        registry.register(old, Vector2D::new(1.0, 1.0));
        registry.unregister(old);

        let new = registry.reserve();
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());
        registry.register(new, Vector2D::new(2.0, 2.0));

        assert!(registry.get(old).is_none());
        assert!(!registry.unregister(old));
        assert!(registry.contains(new));
    }

    #[test]
    fn test_iter_skips_inactive_slots() {
        let mut registry = ElementRegistry::new();
        let a = registry.reserve();
        // Reserved but never registered.
        let _b = registry.reserve();
        let c = registry.reserve();
        registry.register(a, Vector2D::new(1.0, 0.0));
        registry.register(c, Vector2D::new(3.0, 0.0));

        let handles: Vec<_> = registry.iter().map(|(h, _)| h).collect();
        assert_eq!(handles, vec![a, c]);
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut registry = ElementRegistry::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let h = registry.reserve();
                registry.register(h, Vector2D::new(i as f32, 0.0));
                h
            })
            .collect();

        registry.clear();

        assert!(registry.is_empty());
        assert_eq!(registry.iter().count(), 0);
        for handle in handles {
            assert!(!registry.contains(handle));
            assert!(!registry.unregister(handle));
        }
    }

    #[test]
    fn test_handle_bits_round_trip() {
        let mut registry = ElementRegistry::new();
        let first = registry.reserve();
        registry.unregister(first);
        let handle = registry.reserve();
        assert_eq!(ElementHandle::from_bits(handle.to_bits()), handle);
    }
}
