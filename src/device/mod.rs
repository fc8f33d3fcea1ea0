pub mod lifx;
pub mod mock;

pub use lifx::LifxLamp;
pub use mock::MockLamp;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

/// Hue/saturation/brightness/kelvin color at the device boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsbk {
    /// Degrees in [0, 360).
    pub hue: f64,
    /// 0 to 1.
    pub saturation: f64,
    /// 0 to 1.
    pub brightness: f64,
    /// Color temperature in kelvin.
    pub kelvin: u16,
}

impl Hsbk {
    /// The visually-off state. Hue is irrelevant at zero saturation.
    pub fn off(kelvin: u16) -> Self {
        Self {
            hue: 0.0,
            saturation: 0.0,
            brightness: 0.0,
            kelvin,
        }
    }
}

/// Trait implemented by color output devices.
#[async_trait]
pub trait Lamp: Send {
    /// Applies `color`, fading over `duration`. Errors are reported to the
    /// caller, which decides whether they are fatal.
    async fn set_color(&mut self, color: Hsbk, duration: Duration) -> Result<()>;
}
