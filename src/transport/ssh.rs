use std::net::Ipv4Addr;
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::RouterConfig;

use super::TelemetrySource;

const CHUNK_CAPACITY: usize = 64;

/// Telemetry over the system ssh client.
///
/// Runs torch on the router with a forced TTY so it renders its interactive
/// screen, and forwards raw stdout bytes as chunks. Authentication rides on
/// the operator's ssh config or agent; torchlight never touches credentials.
pub struct SshSource {
    router: RouterConfig,
    command: String,
}

impl SshSource {
    pub fn new(router: RouterConfig, voip_server: Ipv4Addr) -> Self {
        // Watch every source talking to the VoIP server, any local address.
        let command = format!(
            "/tool torch bridge-local src-address=0.0.0.0/0 dst-address={voip_server}"
        );
        Self { router, command }
    }
}

#[async_trait]
impl TelemetrySource for SshSource {
    async fn open(&mut self) -> Result<mpsc::Receiver<String>> {
        let mut child = Command::new("ssh")
            .arg("-tt")
            .arg("-p")
            .arg(self.router.port.to_string())
            .arg(format!("{}@{}", self.router.user, self.router.host))
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context("Failed to start ssh")?;

        let mut stdout = child.stdout.take().context("ssh stdout unavailable")?;
        let stderr = child.stderr.take().context("ssh stderr unavailable")?;

        let (tx, rx) = mpsc::channel(CHUNK_CAPACITY);
        tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                        if tx.send(chunk).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "ssh stdout read failed");
                        break;
                    }
                }
            }
        });

        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!("ssh: {line}");
            }
        });

        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => warn!(%status, "ssh exited"),
                Err(err) => warn!(error = %err, "ssh wait failed"),
            }
        });

        Ok(rx)
    }
}
