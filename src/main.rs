use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use torchlight::config::Config;
use torchlight::device::lifx::{LifxLamp, DISCOVERY_TIMEOUT};
use torchlight::palette::{ColorCache, JsonFileStore};
use torchlight::session::Monitor;
use torchlight::transport::SshSource;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.json".to_string());
    let config = Config::load(&config_path)?;

    let store = JsonFileStore::new(&config.palette.path);
    let cache = ColorCache::open(Box::new(store), config.palette.phone_lines)?;

    info!(label = %config.light.label, "discovering lamp");
    let lamp = LifxLamp::discover(&config.light.label, DISCOVERY_TIMEOUT)
        .await
        .context("Failed to discover the configured lamp")?;
    info!(addr = %lamp.addr(), "lamp found");

    let mut source = SshSource::new(config.router.clone(), config.voip_server);
    info!(host = %config.router.host, "starting telemetry session");
    Monitor::new(&config, cache, Box::new(lamp))
        .run(&mut source)
        .await
}
