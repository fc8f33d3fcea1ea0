use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Process configuration, validated once at load and never mutated after.
///
/// Unknown fields are rejected so a typo in the config file fails at startup
/// instead of silently falling back to a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub router: RouterConfig,
    /// Remote VoIP server the torch destination filter is narrowed to.
    pub voip_server: Ipv4Addr,
    /// A phone line counts as active at or above this rate.
    pub activity_threshold_kbps: f64,
    /// Heartbeat period for re-pushing an unchanged lamp state.
    pub refresh_interval_secs: f64,
    /// Marker torch redraws once per sampling interval; doubles as the
    /// frame boundary in the raw stream.
    #[serde(default = "default_sentinel")]
    pub frame_sentinel: String,
    pub light: LightConfig,
    pub palette: PaletteConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    pub host: String,
    pub user: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LightConfig {
    /// Label of the lamp to discover on the LAN.
    pub label: String,
    /// Saturation for the active color, 0 to 1.
    pub saturation: f64,
    /// Brightness for the active color, 0 to 1.
    pub brightness: f64,
    /// Color temperature in kelvin.
    pub kelvin: u16,
    /// Fade duration for each color change, in seconds.
    pub fade_secs: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaletteConfig {
    /// Number of hue slots; one per phone line being watched.
    pub phone_lines: usize,
    #[serde(default = "default_palette_path")]
    pub path: PathBuf,
}

fn default_sentinel() -> String {
    "Q quit".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

fn default_palette_path() -> PathBuf {
    PathBuf::from("palette.json")
}

impl Config {
    /// Loads and validates the config file. Any problem here is fatal; the
    /// process has nothing sensible to do with a partial configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .context(format!("Failed to read config from {:?}", path))?;
        let config: Config =
            serde_json::from_str(&json).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.router.host.is_empty() {
            bail!("router.host must not be empty");
        }
        if self.router.user.is_empty() {
            bail!("router.user must not be empty");
        }
        if !(self.activity_threshold_kbps > 0.0) {
            bail!("activity_threshold_kbps must be positive");
        }
        if !(self.refresh_interval_secs > 0.0) {
            bail!("refresh_interval_secs must be positive");
        }
        if self.frame_sentinel.is_empty() {
            bail!("frame_sentinel must not be empty");
        }
        if self.light.label.is_empty() {
            bail!("light.label must not be empty");
        }
        if !(0.0..=1.0).contains(&self.light.saturation) {
            bail!("light.saturation must be between 0 and 1");
        }
        if !(0.0..=1.0).contains(&self.light.brightness) {
            bail!("light.brightness must be between 0 and 1");
        }
        if !(self.light.fade_secs >= 0.0) {
            bail!("light.fade_secs must not be negative");
        }
        if self.palette.phone_lines == 0 {
            bail!("palette.phone_lines must be at least 1");
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs_f64(self.refresh_interval_secs)
    }
}

impl LightConfig {
    pub fn fade(&self) -> Duration {
        Duration::from_secs_f64(self.fade_secs)
    }
}
