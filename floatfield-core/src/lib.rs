#![cfg_attr(not(feature = "std"), no_std)]

//! Pointer-reactive floating element simulation.
//!
//! Elements opt in through the [`ElementRegistry`], pointer and touch input is
//! reduced to one cursor by the [`InputTracker`], and the [`Simulation`] advances
//! every element once per frame: repelled from the cursor, damped, and drifting
//! upward. Rendering is left to a [`RenderTarget`] supplied by the host.

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod config;
pub mod input;
pub mod registry;
pub mod simulation;

pub use config::{validate_viewport, ConfigError, Easing, SimulationConfig};
pub use input::{InputEvent, InputTracker, SourceMode};
pub use registry::{ElementHandle, ElementRegistry, TrackedElement};
pub use simulation::{repulsion, LoopState, RenderTarget, Simulation};

#[inline]
fn sqrt(value: f32) -> f32 {
    #[cfg(feature = "std")]
    {
        value.sqrt()
    }
    #[cfg(not(feature = "std"))]
    {
        libm::sqrtf(value)
    }
}

/// A 2D vector used for positions, offsets and velocities, in screen units
/// (y grows downward).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector2D {
    pub x: f32,
    pub y: f32,
}

impl Vector2D {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn magnitude(&self) -> f32 {
        sqrt(self.x * self.x + self.y * self.y)
    }

    /// Unit vector in the same direction, or zero for the zero vector.
    pub fn normalize(&self) -> Self {
        let mag = self.magnitude();
        if mag > 0.0 {
            Self {
                x: self.x / mag,
                y: self.y / mag,
            }
        } else {
            Self::zero()
        }
    }

    pub fn distance(&self, other: &Vector2D) -> f32 {
        (*self - *other).magnitude()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl core::ops::Add for Vector2D {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl core::ops::Sub for Vector2D {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl core::ops::Mul<f32> for Vector2D {
    type Output = Self;

    fn mul(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }
}

impl core::ops::Div<f32> for Vector2D {
    type Output = Self;

    fn div(self, scalar: f32) -> Self {
        Self {
            x: self.x / scalar,
            y: self.y / scalar,
        }
    }
}

impl core::ops::AddAssign for Vector2D {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl core::ops::SubAssign for Vector2D {
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
    }
}
