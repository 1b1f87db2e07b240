//! Tuning parameters for the repulsion simulation.

use core::fmt;

/// Number of evenly spaced points at which an easing curve is probed during
/// validation.
const EASING_SAMPLES: u16 = 64;

/// Maps normalized proximity in `[0, 1]` to a force scale in `[0, 1]`.
///
/// Proximity is `1` when an element sits on the cursor and `0` at the edge of
/// the repulsion radius.
#[derive(Debug, Clone, Copy, Default)]
pub enum Easing {
    /// `t^2`: gentle at the edge of the radius, strong up close.
    #[default]
    Quadratic,
    /// `1 - (1 - t)^3`: ramps up quickly, then flattens near the cursor.
    CubicOut,
    /// `t`
    Linear,
    /// Any caller-provided curve. [`SimulationConfig::validate`] only checks
    /// it at evenly spaced sample points; between samples the force scale is
    /// clamped to `[0, 1]` and non-finite output is treated as `0`.
    Custom(fn(f32) -> f32),
}

impl Easing {
    pub fn apply(&self, t: f32) -> f32 {
        match self {
            Easing::Quadratic => t * t,
            Easing::CubicOut => {
                let inv = 1.0 - t;
                1.0 - inv * inv * inv
            }
            Easing::Linear => t,
            Easing::Custom(curve) => curve(t),
        }
    }

    fn check(&self) -> Result<(), ConfigError> {
        let mut previous = f32::NEG_INFINITY;
        for i in 0..=EASING_SAMPLES {
            let t = f32::from(i) / f32::from(EASING_SAMPLES);
            let value = self.apply(t);
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::EasingOutOfRange { at: t });
            }
            if value < previous {
                return Err(ConfigError::NonMonotonicEasing { at: t });
            }
            previous = value;
        }
        Ok(())
    }
}

/// Errors reported when a configuration is rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Repulsion radius must be positive and finite.
    InvalidRepulsionRadius(f32),
    /// Maximum repulsion must be non-negative and finite.
    InvalidMaxRepulsion(f32),
    /// Damping must be in (0, 1].
    InvalidDamping(f32),
    /// Drift rate must be non-negative and finite.
    InvalidDriftRate(f32),
    /// Easing produced a value outside [0, 1] (or NaN).
    EasingOutOfRange { at: f32 },
    /// Easing decreased between two samples.
    NonMonotonicEasing { at: f32 },
    /// Viewport dimensions must be non-negative and finite.
    InvalidViewport { width: f32, height: f32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidRepulsionRadius(v) => {
                write!(f, "repulsion radius must be positive and finite (got {})", v)
            }
            ConfigError::InvalidMaxRepulsion(v) => {
                write!(f, "max repulsion must be non-negative and finite (got {})", v)
            }
            ConfigError::InvalidDamping(v) => write!(f, "damping must be in (0, 1] (got {})", v),
            ConfigError::InvalidDriftRate(v) => {
                write!(f, "drift rate must be non-negative and finite (got {})", v)
            }
            ConfigError::EasingOutOfRange { at } => {
                write!(f, "easing curve leaves [0, 1] at t = {}", at)
            }
            ConfigError::NonMonotonicEasing { at } => {
                write!(f, "easing curve decreases at t = {}", at)
            }
            ConfigError::InvalidViewport { width, height } => {
                write!(f, "invalid viewport {}x{}", width, height)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

/// Per-session simulation parameters.
///
/// ```
/// use floatfield_core::{Easing, SimulationConfig};
///
/// let config = SimulationConfig::new()
///     .with_repulsion_radius(180.0)
///     .with_easing(Easing::CubicOut);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    /// Distance beyond which an element feels no force. Default: 250.
    pub repulsion_radius: f32,
    /// Force magnitude at zero distance. Default: 100.
    pub max_repulsion: f32,
    /// Fraction of velocity lost each frame, in (0, 1]. Default: 0.1.
    pub damping: f32,
    /// Upward velocity added every frame after damping. Default: 0.5.
    pub drift_rate: f32,
    /// Proximity to force scale curve. Default: [`Easing::Quadratic`].
    pub easing: Easing,
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self {
            repulsion_radius: 250.0,
            max_repulsion: 100.0,
            damping: 0.1,
            drift_rate: 0.5,
            easing: Easing::Quadratic,
        }
    }

    pub fn with_repulsion_radius(mut self, radius: f32) -> Self {
        self.repulsion_radius = radius;
        self
    }

    pub fn with_max_repulsion(mut self, max_repulsion: f32) -> Self {
        self.max_repulsion = max_repulsion;
        self
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_drift_rate(mut self, drift_rate: f32) -> Self {
        self.drift_rate = drift_rate;
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Rejects out-of-range parameters. Nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.repulsion_radius.is_finite() && self.repulsion_radius > 0.0) {
            return Err(ConfigError::InvalidRepulsionRadius(self.repulsion_radius));
        }
        if !(self.max_repulsion.is_finite() && self.max_repulsion >= 0.0) {
            return Err(ConfigError::InvalidMaxRepulsion(self.max_repulsion));
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(ConfigError::InvalidDamping(self.damping));
        }
        if !(self.drift_rate.is_finite() && self.drift_rate >= 0.0) {
            return Err(ConfigError::InvalidDriftRate(self.drift_rate));
        }
        self.easing.check()
    }
}

/// Rejects a viewport that is negative or not finite. Zero-sized is allowed.
pub fn validate_viewport(width: f32, height: f32) -> Result<(), ConfigError> {
    let valid = width.is_finite() && height.is_finite() && width >= 0.0 && height >= 0.0;
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidViewport { width, height })
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.repulsion_radius, 250.0);
        assert_eq!(config.max_repulsion, 100.0);
        assert_eq!(config.damping, 0.1);
        assert_eq!(config.drift_rate, 0.5);
        assert!(matches!(config.easing, Easing::Quadratic));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_builtin_easings() {
        assert_eq!(Easing::Quadratic.apply(0.5), 0.25);
        assert_eq!(Easing::CubicOut.apply(0.5), 0.875);
        assert_eq!(Easing::Linear.apply(0.3), 0.3);
        for easing in [Easing::Quadratic, Easing::CubicOut, Easing::Linear] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
        }
    }

    #[test]
    fn test_rejects_bad_damping() {
        for damping in [0.0, -0.1, 1.5, f32::NAN] {
            let config = SimulationConfig::new().with_damping(damping);
            assert!(matches!(config.validate(), Err(ConfigError::InvalidDamping(_))));
        }
        assert!(SimulationConfig::new().with_damping(1.0).validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_radius_and_forces() {
        let config = SimulationConfig::new().with_repulsion_radius(-1.0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidRepulsionRadius(-1.0)));

        let config = SimulationConfig::new().with_repulsion_radius(0.0);
        assert!(config.validate().is_err());

        let config = SimulationConfig::new().with_max_repulsion(f32::INFINITY);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMaxRepulsion(_))));

        let config = SimulationConfig::new().with_drift_rate(-0.5);
        assert_eq!(config.validate(), Err(ConfigError::InvalidDriftRate(-0.5)));
    }

    #[test]
    fn test_zero_force_and_drift_are_allowed() {
        let config = SimulationConfig::new()
            .with_max_repulsion(0.0)
            .with_drift_rate(0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_custom_easing_out_of_range() {
        let config = SimulationConfig::new().with_easing(Easing::Custom(|t| t * 2.0));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EasingOutOfRange { .. })
        ));
    }

    #[test]
    fn test_rejects_non_monotonic_easing() {
        let config = SimulationConfig::new().with_easing(Easing::Custom(|t| 1.0 - t));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonMonotonicEasing { .. })
        ));
    }

    #[test]
    fn test_accepts_custom_monotonic_easing() {
        let config = SimulationConfig::new().with_easing(Easing::Custom(|t| t * t * t));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_viewport() {
        assert_eq!(validate_viewport(1280.0, 720.0), Ok(()));
        assert_eq!(validate_viewport(0.0, 0.0), Ok(()));
        assert!(validate_viewport(f32::INFINITY, 720.0).is_err());
        assert!(validate_viewport(1280.0, f32::NAN).is_err());
        assert_eq!(
            validate_viewport(-5.0, 10.0),
            Err(ConfigError::InvalidViewport {
                width: -5.0,
                height: 10.0
            })
        );
    }
}
