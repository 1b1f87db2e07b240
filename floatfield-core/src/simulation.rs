//! Per-frame integration of every tracked element.

use crate::config::{validate_viewport, ConfigError, SimulationConfig};
use crate::input::InputTracker;
use crate::registry::{ElementHandle, ElementRegistry, TrackedElement};
use crate::Vector2D;

/// Lifecycle of a [`Simulation`]. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Receives rendered offsets from [`Simulation::render`].
///
/// This is the only place the simulation touches the presentation layer.
pub trait RenderTarget {
    type Error;

    fn apply(&mut self, handle: ElementHandle, offset: Vector2D) -> Result<(), Self::Error>;
}

/// Repulsive force exerted by `cursor` on an element centered at `center`.
///
/// Zero outside the repulsion radius and when the element sits exactly on the
/// cursor, where the direction is undefined. The easing output is kept within
/// [0, 1] (non-finite output counts as 0), since custom curves are only
/// validated at sample points.
pub fn repulsion(center: Vector2D, cursor: Vector2D, config: &SimulationConfig) -> Vector2D {
    let delta = center - cursor;
    let distance = delta.magnitude();

    if distance > 0.0 && distance < config.repulsion_radius {
        let proximity = 1.0 - distance / config.repulsion_radius;
        let scale = config.easing.apply(proximity);
        let scale = if scale.is_finite() {
            scale.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let magnitude = scale * config.max_repulsion;
        (delta / distance) * magnitude
    } else {
        Vector2D::zero()
    }
}

/// Advances one element by one frame against a fixed cursor.
pub fn advance(element: &mut TrackedElement, cursor: Vector2D, config: &SimulationConfig) {
    let force = repulsion(element.current_center(), cursor, config);

    element.velocity = (element.velocity + force) * (1.0 - config.damping);
    // Drift goes in after damping so it acts as a constant forcing term.
    element.velocity.y -= config.drift_rate;
    element.offset += element.velocity;
}

/// The simulation loop: registry, cursor and configuration for one session.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
    registry: ElementRegistry,
    input: InputTracker,
    state: LoopState,
    frame: u64,
}

impl Simulation {
    /// Validates `config` and starts a running loop whose cursor rests at the
    /// center of the given viewport.
    pub fn new(
        config: SimulationConfig,
        viewport_width: f32,
        viewport_height: f32,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        validate_viewport(viewport_width, viewport_height)?;

        Ok(Self {
            config,
            registry: ElementRegistry::new(),
            input: InputTracker::new(viewport_width, viewport_height),
            state: LoopState::Running,
            frame: 0,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    /// Mutable registry access; `None` once the loop is stopped.
    pub fn registry_mut(&mut self) -> Option<&mut ElementRegistry> {
        match self.state {
            LoopState::Running => Some(&mut self.registry),
            LoopState::Stopped => None,
        }
    }

    pub fn input(&self) -> &InputTracker {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputTracker {
        &mut self.input
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Number of frames stepped so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Reserves and registers an element in one call. Refused once the loop
    /// is stopped.
    pub fn track(&mut self, base_position: Vector2D) -> Option<ElementHandle> {
        let registry = self.registry_mut()?;
        let handle = registry.reserve();
        registry.register(handle, base_position);
        Some(handle)
    }

    pub fn untrack(&mut self, handle: ElementHandle) -> bool {
        self.registry.unregister(handle)
    }

    pub fn offset(&self, handle: ElementHandle) -> Option<Vector2D> {
        self.registry.get(handle).map(|element| element.offset)
    }

    /// Advances every registered element by one frame.
    ///
    /// The cursor is read once, so every element sees the same snapshot.
    /// Returns `false` (and changes nothing) once the loop is stopped.
    pub fn step(&mut self) -> bool {
        if self.state == LoopState::Stopped {
            return false;
        }

        let cursor = self.input.current_cursor();
        for (_, element) in self.registry.iter_mut() {
            advance(element, cursor, &self.config);
        }
        self.frame += 1;

        log::trace!(
            "frame {}: {} elements, cursor ({}, {})",
            self.frame,
            self.registry.len(),
            cursor.x,
            cursor.y
        );
        true
    }

    /// Hands the current offset of every registered element to `target`.
    pub fn render<T: RenderTarget>(&self, target: &mut T) -> Result<(), T::Error> {
        for (handle, element) in self.registry.iter() {
            target.apply(handle, element.offset)?;
        }
        Ok(())
    }

    /// Stops the loop for good and releases every element.
    pub fn shutdown(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }
        self.state = LoopState::Stopped;
        self.registry.clear();
        log::debug!("simulation stopped after {} frames", self.frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Easing;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    struct Collect(Vec<(ElementHandle, Vector2D)>);

    impl RenderTarget for Collect {
        type Error = ();

        fn apply(&mut self, handle: ElementHandle, offset: Vector2D) -> Result<(), ()> {
            self.0.push((handle, offset));
            Ok(())
        }
    }

    #[test]
    fn test_repulsion_zero_at_cursor() {
        let config = SimulationConfig::default();
        let point = Vector2D::new(40.0, 40.0);
        let force = repulsion(point, point, &config);
        assert_eq!(force, Vector2D::zero());
        assert!(force.is_finite());
    }

    #[test]
    fn test_repulsion_points_away_from_cursor() {
        let config = SimulationConfig::default();
        let force = repulsion(Vector2D::new(0.0, 0.0), Vector2D::new(100.0, 0.0), &config);
        // proximity 0.6, quadratic easing -> 0.36 * 100
        assert!(approx(force.x, -36.0));
        assert_eq!(force.y, 0.0);
    }

    #[test]
    fn test_repulsion_zero_at_and_beyond_radius() {
        let config = SimulationConfig::default();
        let cursor = Vector2D::zero();
        assert_eq!(repulsion(Vector2D::new(250.0, 0.0), cursor, &config), Vector2D::zero());
        assert_eq!(repulsion(Vector2D::new(0.0, 900.0), cursor, &config), Vector2D::zero());
    }

    #[test]
    fn test_single_step_matches_hand_computation() {
        let mut sim = Simulation::new(SimulationConfig::default(), 800.0, 600.0).unwrap();
        sim.input_mut().on_mouse_move(Vector2D::new(100.0, 0.0));
        let handle = sim.track(Vector2D::new(0.0, 0.0)).unwrap();

        assert!(sim.step());

        let element = sim.registry().get(handle).unwrap();
        assert!(approx(element.velocity.x, -32.4));
        assert!(approx(element.velocity.y, -0.5));
        assert!(approx(element.offset.x, -32.4));
        assert!(approx(element.offset.y, -0.5));
        assert_eq!(sim.frame(), 1);
    }

    #[test]
    fn test_element_on_cursor_only_drifts() {
        let mut sim = Simulation::new(SimulationConfig::default(), 200.0, 200.0).unwrap();
        let handle = sim.track(Vector2D::new(100.0, 100.0)).unwrap();

        sim.step();

        let element = sim.registry().get(handle).unwrap();
        assert_eq!(element.velocity, Vector2D::new(0.0, -0.5));
        assert!(element.offset.is_finite());
    }

    #[test]
    fn test_untracked_element_receives_no_more_offsets() {
        let mut sim = Simulation::new(SimulationConfig::default(), 800.0, 600.0).unwrap();
        let keep = sim.track(Vector2D::new(10.0, 10.0)).unwrap();
        let drop = sim.track(Vector2D::new(20.0, 20.0)).unwrap();
        sim.step();
        assert!(sim.untrack(drop));
        sim.step();

        let mut out = Collect(Vec::new());
        sim.render(&mut out).unwrap();
        assert_eq!(out.0.len(), 1);
        assert_eq!(out.0[0].0, keep);
        assert!(sim.offset(drop).is_none());
    }

    #[test]
    fn test_shutdown_is_terminal() {
        let mut sim = Simulation::new(SimulationConfig::default(), 800.0, 600.0).unwrap();
        let handle = sim.track(Vector2D::new(10.0, 10.0)).unwrap();
        sim.step();

        sim.shutdown();

        assert_eq!(sim.state(), LoopState::Stopped);
        assert!(!sim.step());
        assert_eq!(sim.frame(), 1);
        assert!(!sim.registry().contains(handle));

        assert!(sim.track(Vector2D::zero()).is_none());
        assert!(sim.registry_mut().is_none());
        assert_eq!(sim.registry().len(), 0);
        assert!(!sim.step());
        assert!(!sim.is_running());
    }

    #[test]
    fn test_custom_easing_output_is_guarded_between_samples() {
        // Both curves pass sampled validation: no sample lands in (0.5, 0.51).
        let nan_gap = SimulationConfig::new()
            .with_easing(Easing::Custom(|t| if t > 0.5 && t < 0.51 { f32::NAN } else { t }));
        let spike = SimulationConfig::new()
            .with_easing(Easing::Custom(|t| if t > 0.5 && t < 0.51 { 5.0 } else { t }));
        assert!(nan_gap.validate().is_ok());
        assert!(spike.validate().is_ok());

        // proximity 0.505
        let center = Vector2D::new(123.75, 0.0);
        let cursor = Vector2D::zero();

        assert_eq!(repulsion(center, cursor, &nan_gap), Vector2D::zero());
        let force = repulsion(center, cursor, &spike);
        assert!(force.is_finite());
        assert!(force.magnitude() <= spike.max_repulsion + 1e-3);

        let mut sim = Simulation::new(nan_gap, 800.0, 600.0).unwrap();
        sim.input_mut().on_mouse_move(cursor);
        let handle = sim.track(center).unwrap();
        sim.step();
        assert!(sim.offset(handle).unwrap().is_finite());
    }

    #[test]
    fn test_rejects_invalid_config_and_viewport() {
        let bad = SimulationConfig::new().with_damping(0.0);
        assert!(Simulation::new(bad, 800.0, 600.0).is_err());
        assert_eq!(
            Simulation::new(SimulationConfig::default(), -1.0, 600.0).unwrap_err(),
            ConfigError::InvalidViewport {
                width: -1.0,
                height: 600.0
            }
        );
    }
}
