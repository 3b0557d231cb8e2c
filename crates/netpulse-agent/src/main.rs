//! netpulse-agent - host state monitoring agent
//!
//! Reads control signals from stdin, one per line, and writes change reports
//! to stdout as JSON lines. Logs go to stderr.

use std::io::BufRead;
use std::sync::Arc;

use anyhow::{Context, Result};
use netpulse_agent::{parse_control_line, AgentConfig, StateProbe, Supervisor, SystemPlatform};
use netpulse_common::MonitorReport;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AgentConfig::load().context("Failed to load configuration")?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("netpulse_agent={}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".into());

    tracing::info!("Starting netpulse-agent");
    tracing::info!("Platform: {}", std::env::consts::OS);
    tracing::info!("Monitoring host: {}", host);
    tracing::debug!(?config, "Configuration loaded");

    let platform = SystemPlatform::new().context("Failed to initialize platform")?;
    let probe = StateProbe::new(Arc::new(platform));

    let (control_tx, control_rx) = mpsc::channel(config.channel_capacity);
    let (supervisor, reports) = Supervisor::new(probe, config);

    // Plain thread: a blocked stdin read must not hold up runtime shutdown
    std::thread::spawn(move || {
        if let Err(e) = read_control(std::io::stdin().lock(), control_tx) {
            tracing::error!("Control input failed: {:#}", e);
        }
    });
    let writer = tokio::spawn(write_reports(reports));

    // The writer ends once the supervisor and its workers are gone
    let outcome = supervisor.run(control_rx).await;
    writer.await.context("Report writer panicked")??;

    match outcome {
        Ok(()) => {
            tracing::info!("netpulse-agent stopped");
            Ok(())
        }
        Err(e) => {
            tracing::error!("netpulse-agent stopping: {:#}", e);
            Err(e)
        }
    }
}

/// Forward input lines as control codes until EOF or the supervisor is gone
fn read_control(input: impl BufRead, control: mpsc::Sender<i32>) -> Result<()> {
    for line in input.lines() {
        let line = line.context("Failed to read stdin")?;
        match parse_control_line(&line) {
            Some(code) => {
                if control.blocking_send(code).is_err() {
                    break;
                }
            }
            None if line.trim().is_empty() => {}
            None => tracing::warn!("Ignoring unrecognised control input: {}", line.trim()),
        }
    }

    tracing::debug!("Control input closed");
    Ok(())
}

/// Write each report as one JSON line on stdout
async fn write_reports(mut reports: mpsc::Receiver<MonitorReport>) -> Result<()> {
    let mut stdout = tokio::io::stdout();

    while let Some(report) = reports.recv().await {
        let mut line = serde_json::to_vec(&report).context("Failed to encode report")?;
        line.push(b'\n');
        stdout.write_all(&line).await.context("Failed to write report")?;
        stdout.flush().await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_read_control_forwards_every_code() {
        let (tx, mut rx) = mpsc::channel(8);
        read_control(Cursor::new("1\nburst\n\n300\nbogus\n-1\n"), tx).unwrap();

        let mut codes = Vec::new();
        while let Ok(code) = rx.try_recv() {
            codes.push(code);
        }
        assert_eq!(codes, vec![1, 2, 300, -1]);
    }

    #[test]
    fn test_read_control_stops_when_supervisor_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        assert!(read_control(Cursor::new("1\n4\n"), tx).is_ok());
    }
}
