use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use floatfield_core::{ElementHandle, RenderTarget, Simulation, Vector2D};
use floatfield_shared::SimulationSettings;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{AddEventListenerOptions, Event, HtmlElement, MouseEvent, TouchEvent, Window};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

macro_rules! console_log {
    ($($t:tt)*) => (log(&format_args!($($t)*).to_string()))
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

struct FieldState {
    simulation: Simulation,
    elements: HashMap<ElementHandle, HtmlElement>,
    frame_request: Option<i32>,
}

/// Writes offsets into each element's inline `transform`.
struct StyleWriter<'a> {
    elements: &'a HashMap<ElementHandle, HtmlElement>,
}

impl RenderTarget for StyleWriter<'_> {
    type Error = JsValue;

    fn apply(&mut self, handle: ElementHandle, offset: Vector2D) -> Result<(), JsValue> {
        if let Some(element) = self.elements.get(&handle) {
            element
                .style()
                .set_property("transform", &translate(offset))?;
        }
        Ok(())
    }
}

fn translate(offset: Vector2D) -> String {
    format!("translate({}px, {}px)", offset.x, offset.y)
}

fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))
}

fn request_frame(callback: &Closure<dyn FnMut()>) -> Result<i32, JsValue> {
    let function: &js_sys::Function = callback.as_ref().unchecked_ref();
    window()?.request_animation_frame(function)
}

/// Steps once and renders. `Ok(false)` means the simulation is stopped.
fn advance_frame(state: &RefCell<FieldState>) -> Result<bool, JsValue> {
    let mut state = state.borrow_mut();
    let FieldState {
        simulation,
        elements,
        ..
    } = &mut *state;

    if !simulation.step() {
        return Ok(false);
    }
    simulation.render(&mut StyleWriter { elements })?;
    Ok(true)
}

/// Center of the element's current bounding box, in viewport coordinates.
fn element_center(element: &HtmlElement) -> Vector2D {
    let rect = element.get_bounding_client_rect();
    Vector2D::new(
        (rect.left() + rect.width() / 2.0) as f32,
        (rect.top() + rect.height() / 2.0) as f32,
    )
}

/// Browser binding for the floating element field.
///
/// Listens for pointer and touch events on the window, runs one simulation
/// step per animation frame while any element is tracked, and writes each
/// element's offset as a CSS translation.
#[wasm_bindgen]
pub struct FloatField {
    state: Rc<RefCell<FieldState>>,
    frame_callback: FrameCallback,
    listeners: Vec<(&'static str, Closure<dyn FnMut(Event)>)>,
}

#[wasm_bindgen]
impl FloatField {
    /// `settings_json` uses the camelCase settings format; omitted keys take
    /// their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(settings_json: Option<String>) -> Result<FloatField, JsValue> {
        let settings = match settings_json.as_deref() {
            Some(json) => SimulationSettings::from_json(json)
                .map_err(|e| JsValue::from_str(&e.to_string()))?,
            None => SimulationSettings::default(),
        };
        let config = settings
            .to_config()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        let window = window()?;
        let width = window.inner_width()?.as_f64().unwrap_or(0.0) as f32;
        let height = window.inner_height()?.as_f64().unwrap_or(0.0) as f32;

        let simulation =
            Simulation::new(config, width, height).map_err(|e| JsValue::from_str(&e.to_string()))?;
        console_log!(
            "Initializing float field {}x{} (radius {}, damping {})",
            width,
            height,
            config.repulsion_radius,
            config.damping
        );

        let mut field = FloatField {
            state: Rc::new(RefCell::new(FieldState {
                simulation,
                elements: HashMap::new(),
                frame_request: None,
            })),
            frame_callback: Rc::new(RefCell::new(None)),
            listeners: Vec::new(),
        };
        field.attach_listeners(&window)?;
        field.install_frame_callback();
        Ok(field)
    }

    /// Starts simulating `element` from its current on-screen center and
    /// returns its key. Tracking an element twice returns the existing key.
    /// Fails once the field is stopped.
    pub fn track(&mut self, element: HtmlElement) -> Result<u64, JsValue> {
        let handle = {
            let mut state = self.state.borrow_mut();
            if !state.simulation.is_running() {
                return Err(JsValue::from_str("float field is stopped"));
            }
            let target: &JsValue = element.as_ref();
            let existing = state
                .elements
                .iter()
                .find(|(_, tracked)| {
                    let tracked: &JsValue = tracked.as_ref();
                    tracked == target
                })
                .map(|(handle, _)| *handle);
            if let Some(handle) = existing {
                return Ok(handle.to_bits());
            }

            let handle = state
                .simulation
                .track(element_center(&element))
                .ok_or_else(|| JsValue::from_str("float field is stopped"))?;
            state.elements.insert(handle, element);
            handle
        };

        self.start()?;
        Ok(handle.to_bits())
    }

    /// Stops simulating the element behind `key`. Unknown keys are ignored.
    pub fn untrack(&mut self, key: u64) -> bool {
        let handle = ElementHandle::from_bits(key);
        let mut state = self.state.borrow_mut();
        state.elements.remove(&handle);
        let removed = state.simulation.untrack(handle);

        if state.simulation.registry().is_empty() {
            if let Some(id) = state.frame_request.take() {
                if let Ok(window) = window() {
                    let _ = window.cancel_animation_frame(id);
                }
            }
        }
        removed
    }

    /// Schedules the next animation frame unless one is already pending.
    pub fn start(&mut self) -> Result<(), JsValue> {
        let mut state = self.state.borrow_mut();
        if state.frame_request.is_some() || !state.simulation.is_running() {
            return Ok(());
        }
        if let Some(callback) = self.frame_callback.borrow().as_ref() {
            state.frame_request = Some(request_frame(callback)?);
        }
        Ok(())
    }

    /// Shuts the simulation down: cancels the pending frame and detaches all
    /// listeners. A stopped field cannot be restarted.
    pub fn stop(&mut self) {
        let pending = {
            let mut state = self.state.borrow_mut();
            state.simulation.shutdown();
            state.elements.clear();
            state.frame_request.take()
        };

        if let Ok(window) = window() {
            if let Some(id) = pending {
                let _ = window.cancel_animation_frame(id);
            }
            for (kind, listener) in self.listeners.drain(..) {
                let _ = window
                    .remove_event_listener_with_callback(kind, listener.as_ref().unchecked_ref());
            }
        }
        self.frame_callback.borrow_mut().take();
        console_log!("Float field stopped");
    }

    /// Runs a single step and render outside the animation loop.
    pub fn tick(&mut self) -> Result<bool, JsValue> {
        advance_frame(&self.state)
    }

    pub fn element_count(&self) -> usize {
        self.state.borrow().simulation.registry().len()
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().simulation.is_running()
    }

    pub fn frame(&self) -> f64 {
        self.state.borrow().simulation.frame() as f64
    }

    /// Whether an animation frame is currently scheduled.
    pub fn has_pending_frame(&self) -> bool {
        self.state.borrow().frame_request.is_some()
    }

    /// Current `transform` value for a tracked element.
    pub fn transform_of(&self, key: u64) -> Option<String> {
        self.state
            .borrow()
            .simulation
            .offset(ElementHandle::from_bits(key))
            .map(translate)
    }
}

impl FloatField {
    fn listen<F>(
        &mut self,
        window: &Window,
        kind: &'static str,
        options: Option<&AddEventListenerOptions>,
        handler: F,
    ) -> Result<(), JsValue>
    where
        F: FnMut(Event) + 'static,
    {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        let callback: &js_sys::Function = closure.as_ref().unchecked_ref();
        match options {
            Some(options) => window
                .add_event_listener_with_callback_and_add_event_listener_options(
                    kind, callback, options,
                )?,
            None => window.add_event_listener_with_callback(kind, callback)?,
        }
        self.listeners.push((kind, closure));
        Ok(())
    }

    fn attach_listeners(&mut self, window: &Window) -> Result<(), JsValue> {
        let state = self.state.clone();
        self.listen(window, "mousemove", None, move |event| {
            if let Some(event) = event.dyn_ref::<MouseEvent>() {
                let position = Vector2D::new(event.client_x() as f32, event.client_y() as f32);
                state.borrow_mut().simulation.input_mut().on_mouse_move(position);
            }
        })?;

        // Browsers report the contact point on touchstart; record it so the
        // cursor does not sit at a stale touch position until the first move.
        let state = self.state.clone();
        self.listen(window, "touchstart", None, move |event| {
            let mut state = state.borrow_mut();
            let input = state.simulation.input_mut();
            input.on_touch_start();
            if let Some(position) = first_touch(&event) {
                input.on_touch_move(position);
            }
        })?;

        // Passive: the handler never calls preventDefault.
        let passive = AddEventListenerOptions::new();
        passive.set_passive(true);
        let state = self.state.clone();
        self.listen(window, "touchmove", Some(&passive), move |event| {
            if let Some(position) = first_touch(&event) {
                state.borrow_mut().simulation.input_mut().on_touch_move(position);
            }
        })?;

        for kind in ["touchend", "touchcancel"] {
            let state = self.state.clone();
            self.listen(window, kind, None, move |_| {
                state.borrow_mut().simulation.input_mut().on_touch_end();
            })?;
        }

        Ok(())
    }

    fn install_frame_callback(&mut self) {
        let state = self.state.clone();
        let callback = self.frame_callback.clone();

        *self.frame_callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            match advance_frame(&state) {
                Ok(true) => {
                    let next = match callback.borrow().as_ref() {
                        Some(callback) => request_frame(callback),
                        None => return,
                    };
                    match next {
                        Ok(id) => state.borrow_mut().frame_request = Some(id),
                        Err(e) => {
                            console_log!("Failed to schedule frame: {:?}", e);
                            state.borrow_mut().frame_request = None;
                        }
                    }
                }
                Ok(false) => state.borrow_mut().frame_request = None,
                Err(e) => {
                    console_log!("Render failed: {:?}", e);
                    state.borrow_mut().frame_request = None;
                }
            }
        }) as Box<dyn FnMut()>));
    }
}

impl Drop for FloatField {
    fn drop(&mut self) {
        if self.is_running() || !self.listeners.is_empty() {
            self.stop();
        }
    }
}

fn first_touch(event: &Event) -> Option<Vector2D> {
    let touch = event.dyn_ref::<TouchEvent>()?.touches().item(0)?;
    Some(Vector2D::new(touch.client_x() as f32, touch.client_y() as f32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_format() {
        assert_eq!(
            translate(Vector2D::new(-3.5, 12.0)),
            "translate(-3.5px, 12px)"
        );
    }
}
