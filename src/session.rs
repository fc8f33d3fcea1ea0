use std::net::Ipv4Addr;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

use crate::config::{Config, LightConfig};
use crate::device::{Hsbk, Lamp};
use crate::gate::UpdateGate;
use crate::palette::ColorCache;
use crate::telemetry::{active_sources, parse_frame, FrameAssembler};
use crate::transport::TelemetrySource;

/// The monitoring session: transport chunks in, lamp colors out.
///
/// All per-frame work runs synchronously in arrival order; one sampling
/// interval is far longer than a parse-classify-reserve pass, so there is
/// nothing to parallelize.
pub struct Monitor {
    assembler: FrameAssembler,
    threshold_kbps: f64,
    cache: ColorCache,
    gate: UpdateGate,
    lamp: Box<dyn Lamp>,
    light: LightConfig,
}

impl Monitor {
    pub fn new(config: &Config, cache: ColorCache, lamp: Box<dyn Lamp>) -> Self {
        Self {
            assembler: FrameAssembler::new(config.frame_sentinel.clone()),
            threshold_kbps: config.activity_threshold_kbps,
            cache,
            gate: UpdateGate::new(config.refresh_interval()),
            lamp,
            light: config.light.clone(),
        }
    }

    /// Consumes the telemetry stream until it closes. Closure is terminal:
    /// without fresh telemetry the lamp would display stale state forever,
    /// which is worse than dying visibly.
    pub async fn run(mut self, source: &mut dyn TelemetrySource) -> Result<()> {
        let mut chunks = source
            .open()
            .await
            .context("Failed to open telemetry stream")?;

        while let Some(chunk) = chunks.recv().await {
            self.handle_chunk(&chunk).await?;
        }
        bail!("telemetry stream closed")
    }

    /// Feeds one transport chunk through the pipeline.
    pub async fn handle_chunk(&mut self, chunk: &str) -> Result<()> {
        for frame in self.assembler.feed(chunk) {
            self.handle_frame(&frame).await?;
        }
        Ok(())
    }

    async fn handle_frame(&mut self, frame: &str) -> Result<()> {
        let samples = parse_frame(frame);
        let active = active_sources(&samples, self.threshold_kbps);
        debug!(samples = samples.len(), active = active.len(), "frame classified");

        let color = self.color_for(&active)?;

        if !self.gate.should_emit(active.len(), Instant::now()) {
            return Ok(());
        }

        info!(active = active.len(), hue = color.hue, "pushing lamp state");
        if let Err(err) = self.lamp.set_color(color, self.light.fade()).await {
            warn!(error = %err, "lamp update failed, will retry on the next accepted state");
        }
        Ok(())
    }

    /// Plain linear mean of the reserved hues. Wrong near the 0/360 wrap
    /// (two reds can average to cyan), but the emitted colors are part of
    /// the observable behavior users have tuned around, so the averaging
    /// stays as is.
    fn color_for(&self, active: &[Ipv4Addr]) -> Result<Hsbk> {
        if active.is_empty() {
            return Ok(Hsbk::off(self.light.kelvin));
        }

        let mut total = 0.0;
        for line in active {
            total += self.cache.reserve(*line)?;
        }

        Ok(Hsbk {
            hue: total / active.len() as f64,
            saturation: self.light.saturation,
            brightness: self.light.brightness,
            kelvin: self.light.kelvin,
        })
    }
}
