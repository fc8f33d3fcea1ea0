use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::{Hsbk, Lamp};

/// Lamp double that records every push and can be told to fail.
#[derive(Clone, Default)]
pub struct MockLamp {
    calls: Arc<Mutex<Vec<(Hsbk, Duration)>>>,
    failures_remaining: Arc<Mutex<u32>>,
}

impl MockLamp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` `set_color` calls fail.
    pub fn fail_next(&self, n: u32) {
        *self.failures_remaining.lock().expect("mock lamp lock") = n;
    }

    pub fn calls(&self) -> Vec<(Hsbk, Duration)> {
        self.calls.lock().expect("mock lamp lock").clone()
    }
}

#[async_trait]
impl Lamp for MockLamp {
    async fn set_color(&mut self, color: Hsbk, duration: Duration) -> Result<()> {
        let mut failures = self.failures_remaining.lock().expect("mock lamp lock");
        if *failures > 0 {
            *failures -= 1;
            bail!("simulated lamp failure");
        }
        drop(failures);

        self.calls
            .lock()
            .expect("mock lamp lock")
            .push((color, duration));
        Ok(())
    }
}
