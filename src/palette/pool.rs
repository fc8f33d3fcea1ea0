use std::net::Ipv4Addr;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// One reservation unit. The hue is fixed when the pool is built; only the
/// occupant and its timestamp ever change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub hue: f64,
    pub line: Option<Ipv4Addr>,
    pub reserved_at: Option<u64>,
}

/// Fixed-size pool of hue slots with least-recently-reserved eviction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HuePool {
    slots: Vec<Slot>,
}

impl HuePool {
    /// Builds a fresh pool of `n` unreserved slots, hues spaced 360/n apart
    /// and then shuffled once so slot order carries no positional bias.
    pub fn with_size(n: usize) -> Self {
        let mut hues: Vec<f64> = (0..n).map(|i| i as f64 * 360.0 / n as f64).collect();
        hues.shuffle(&mut rand::thread_rng());

        Self {
            slots: hues
                .into_iter()
                .map(|hue| Slot {
                    hue,
                    line: None,
                    reserved_at: None,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Reserves a hue for `line` at time `now` (unix seconds).
    ///
    /// A resident line keeps its slot and refreshes the timestamp; a new
    /// line takes any free slot, or evicts the occupant with the oldest
    /// reservation when the pool is full. Returns `None` only for a pool
    /// with no slots.
    pub fn reserve(&mut self, line: Ipv4Addr, now: u64) -> Option<f64> {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.line == Some(line)) {
            slot.reserved_at = Some(now);
            return Some(slot.hue);
        }

        let idx = self
            .slots
            .iter()
            .position(|s| s.line.is_none())
            .or_else(|| {
                self.slots
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, s)| s.reserved_at.unwrap_or(0))
                    .map(|(idx, _)| idx)
            })?;

        let slot = &mut self.slots[idx];
        slot.line = Some(line);
        slot.reserved_at = Some(now);
        Some(slot.hue)
    }

    #[cfg(test)]
    pub(crate) fn occupants(&self) -> Vec<Option<Ipv4Addr>> {
        self.slots.iter().map(|s| s.line).collect()
    }
}
