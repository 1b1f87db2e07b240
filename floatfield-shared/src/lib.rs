#![cfg_attr(not(feature = "std"), no_std)]

//! Serializable settings, scripted input and frame reports shared by the
//! browser adapter and the headless client.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use core::fmt;

use floatfield_core::{ConfigError, Easing, InputEvent, SimulationConfig, Vector2D};
use serde::{Deserialize, Serialize};

/// Represents a 2D position in screen coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<Position> for Vector2D {
    fn from(p: Position) -> Self {
        Vector2D::new(p.x, p.y)
    }
}

impl From<Vector2D> for Position {
    fn from(v: Vector2D) -> Self {
        Position::new(v.x, v.y)
    }
}

/// Named easing curves that can be selected from settings files.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EasingKind {
    #[default]
    Quadratic,
    CubicOut,
    Linear,
}

impl From<EasingKind> for Easing {
    fn from(kind: EasingKind) -> Self {
        match kind {
            EasingKind::Quadratic => Easing::Quadratic,
            EasingKind::CubicOut => Easing::CubicOut,
            EasingKind::Linear => Easing::Linear,
        }
    }
}

/// Simulation tuning as it appears in JSON. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationSettings {
    pub repulsion_radius: f32,
    pub max_repulsion: f32,
    pub damping: f32,
    pub drift_rate: f32,
    pub easing: EasingKind,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        let config = SimulationConfig::default();
        Self {
            repulsion_radius: config.repulsion_radius,
            max_repulsion: config.max_repulsion,
            damping: config.damping,
            drift_rate: config.drift_rate,
            easing: EasingKind::Quadratic,
        }
    }
}

impl SimulationSettings {
    /// Converts to a validated core configuration.
    pub fn to_config(&self) -> Result<SimulationConfig, ConfigError> {
        let config = SimulationConfig::new()
            .with_repulsion_radius(self.repulsion_radius)
            .with_max_repulsion(self.max_repulsion)
            .with_damping(self.damping)
            .with_drift_rate(self.drift_rate)
            .with_easing(self.easing.into());
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "std")]
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json).map_err(SettingsError::Json)?;
        settings.to_config().map_err(SettingsError::Config)?;
        Ok(settings)
    }
}

/// Why a settings document was rejected.
#[derive(Debug)]
pub enum SettingsError {
    #[cfg(feature = "std")]
    Json(serde_json::Error),
    Config(ConfigError),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "std")]
            SettingsError::Json(e) => write!(f, "malformed settings: {}", e),
            SettingsError::Config(e) => write!(f, "invalid settings: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Json(e) => Some(e),
            SettingsError::Config(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SettingsError {
    fn from(e: ConfigError) -> Self {
        SettingsError::Config(e)
    }
}

/// A pointer event in a recorded or scripted input stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScriptedInput {
    MouseMove { x: f32, y: f32 },
    TouchStart,
    TouchMove { x: f32, y: f32 },
    TouchEnd,
}

impl From<ScriptedInput> for InputEvent {
    fn from(input: ScriptedInput) -> Self {
        match input {
            ScriptedInput::MouseMove { x, y } => InputEvent::MouseMove(Vector2D::new(x, y)),
            ScriptedInput::TouchStart => InputEvent::TouchStart,
            ScriptedInput::TouchMove { x, y } => InputEvent::TouchMove(Vector2D::new(x, y)),
            ScriptedInput::TouchEnd => InputEvent::TouchEnd,
        }
    }
}

/// An input event delivered just before the given frame is stepped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimedInput {
    pub frame: u64,
    pub event: ScriptedInput,
}

/// Rendered translation of one element.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ElementOffset {
    /// Packed element handle.
    pub handle: u64,
    pub x: f32,
    pub y: f32,
}

/// Everything rendered in one frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub cursor: Position,
    pub offsets: Vec<ElementOffset>,
}
