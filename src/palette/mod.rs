pub mod pool;
pub mod store;

pub use pool::{HuePool, Slot};
pub use store::{JsonFileStore, MemoryStore, PaletteStore};

use std::net::Ipv4Addr;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing::warn;

/// Stable line-to-hue assignment backed by a persisted slot pool.
///
/// Every reservation runs as one locked read-modify-write, so two lines
/// resolved within the same frame can never race onto the same free slot,
/// and the pool on disk always reflects the last hue handed out.
pub struct ColorCache {
    store: Box<dyn PaletteStore>,
    pool: Mutex<HuePool>,
}

impl ColorCache {
    /// Opens the persisted pool, rebuilding it when nothing is on disk yet
    /// or when the configured size changed. A rebuild discards all prior
    /// reservations; hue identity is a soft affordance, not durable state.
    pub fn open(store: Box<dyn PaletteStore>, phone_lines: usize) -> Result<Self> {
        let pool = match store.load().context("Failed to open palette store")? {
            Some(pool) if pool.len() == phone_lines => pool,
            _ => {
                let fresh = HuePool::with_size(phone_lines);
                store
                    .commit(&fresh)
                    .context("Failed to initialize palette store")?;
                fresh
            }
        };

        Ok(Self {
            store,
            pool: Mutex::new(pool),
        })
    }

    /// Returns the hue reserved for `line`, assigning or evicting a slot as
    /// needed. A commit failure is retried once and then downgraded to a
    /// logged error; the in-memory hue is still returned so one bad write
    /// cannot stall the pipeline.
    pub fn reserve(&self, line: Ipv4Addr) -> Result<f64> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.reserve_at(line, now)
    }

    fn reserve_at(&self, line: Ipv4Addr, now: u64) -> Result<f64> {
        let mut pool = self.pool.lock().expect("palette lock");
        let hue = pool
            .reserve(line, now)
            .context("Hue pool has no slots")?;

        if self.store.commit(&pool).is_err() {
            if let Err(err) = self.store.commit(&pool) {
                warn!(%line, error = %err, "palette commit failed twice, keeping in-memory hue");
            }
        }

        Ok(hue)
    }
}
