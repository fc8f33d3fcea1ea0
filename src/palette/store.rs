use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};

use super::pool::HuePool;

/// Durable home for the hue pool.
///
/// `commit` must be atomic: a crash mid-write may never leave a torn pool
/// behind, since a half-written pool would scramble every line's color on
/// the next start.
pub trait PaletteStore: Send {
    /// Reads the persisted pool, or `None` when nothing has been saved yet.
    fn load(&self) -> Result<Option<HuePool>>;

    fn commit(&self, pool: &HuePool) -> Result<()>;
}

/// Pool persisted as pretty JSON, committed by writing a sibling temp file
/// and renaming it over the target.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PaletteStore for JsonFileStore {
    fn load(&self) -> Result<Option<HuePool>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path)
            .context(format!("Failed to read palette from {:?}", self.path))?;
        let pool: HuePool =
            serde_json::from_str(&json).context("Failed to deserialize palette")?;

        Ok(Some(pool))
    }

    fn commit(&self, pool: &HuePool) -> Result<()> {
        let json = serde_json::to_string_pretty(pool).context("Failed to serialize palette")?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).context(format!("Failed to write palette to {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .context(format!("Failed to replace palette at {:?}", self.path))?;

        Ok(())
    }
}

/// Volatile store backing tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    pool: Mutex<Option<HuePool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PaletteStore for MemoryStore {
    fn load(&self) -> Result<Option<HuePool>> {
        Ok(self.pool.lock().expect("palette store lock").clone())
    }

    fn commit(&self, pool: &HuePool) -> Result<()> {
        *self.pool.lock().expect("palette store lock") = Some(pool.clone());
        Ok(())
    }
}
