pub mod ssh;

pub use ssh::SshSource;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Trait implemented by telemetry stream providers.
///
/// Chunks arrive exactly as the transport produced them and may split or
/// merge logical lines arbitrarily. A closed channel means the stream is
/// gone for good; the session treats that as terminal rather than freezing
/// the lamp on stale state.
#[async_trait]
pub trait TelemetrySource: Send {
    /// Starts the stream and hands back its chunk channel.
    async fn open(&mut self) -> Result<mpsc::Receiver<String>>;
}
