//! Reduces mouse and touch events to one authoritative cursor.

use crate::Vector2D;

/// Which input source currently owns the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMode {
    #[default]
    Pointer,
    Touch,
}

/// Raw pointer events delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    MouseMove(Vector2D),
    TouchStart,
    TouchMove(Vector2D),
    TouchEnd,
}

/// Two-state machine over [`SourceMode`].
///
/// `TouchStart` enters touch mode and `TouchEnd` leaves it. Both sources keep
/// their last known position regardless of mode; only the reported cursor
/// depends on the mode, so synthetic mouse events fired during a touch cannot
/// pull the cursor away from the finger.
#[derive(Debug, Clone)]
pub struct InputTracker {
    mouse: Vector2D,
    touch: Vector2D,
    mode: SourceMode,
}

impl InputTracker {
    /// Both sources start at the center of the viewport.
    pub fn new(viewport_width: f32, viewport_height: f32) -> Self {
        let center = Vector2D::new(viewport_width / 2.0, viewport_height / 2.0);
        Self {
            mouse: center,
            touch: center,
            mode: SourceMode::Pointer,
        }
    }

    pub fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::MouseMove(position) => self.mouse = position,
            InputEvent::TouchStart => self.mode = SourceMode::Touch,
            InputEvent::TouchMove(position) => self.touch = position,
            InputEvent::TouchEnd => self.mode = SourceMode::Pointer,
        }
    }

    pub fn on_mouse_move(&mut self, position: Vector2D) {
        self.apply(InputEvent::MouseMove(position));
    }

    pub fn on_touch_start(&mut self) {
        self.apply(InputEvent::TouchStart);
    }

    pub fn on_touch_move(&mut self, position: Vector2D) {
        self.apply(InputEvent::TouchMove(position));
    }

    pub fn on_touch_end(&mut self) {
        self.apply(InputEvent::TouchEnd);
    }

    pub fn current_cursor(&self) -> Vector2D {
        match self.mode {
            SourceMode::Pointer => self.mouse,
            SourceMode::Touch => self.touch,
        }
    }

    pub fn source_mode(&self) -> SourceMode {
        self.mode
    }
}
