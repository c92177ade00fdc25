//! # posecast-relay
//!
//! Relay binary: settings → logging → extractor → server, then waits for
//! ctrl-c and shuts down gracefully.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use posecast_server::{PosecastServer, ServerConfig};
use posecast_settings::{ExtractorKind, PosecastSettings};
use posecast_vision::{ImageFrameDecoder, build_extractor};
use tracing::{info, warn};

/// Real-time pose landmark relay.
#[derive(Parser, Debug)]
#[command(name = "posecast-relay", about = "Real-time pose landmark relay")]
struct Cli {
    /// Settings file (defaults to `~/.posecast/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// ONNX pose model; enables the onnx extractor.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Log level or `tracing` filter directive.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Overlay command-line flags on loaded settings.
    fn apply(&self, settings: &mut PosecastSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(model) = &self.model {
            settings.pose.extractor = ExtractorKind::Onnx;
            settings.pose.model_path = Some(model.to_string_lossy().into_owned());
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

/// Defaults → file → env → CLI, validated.
fn resolve_settings(cli: &Cli) -> Result<PosecastSettings> {
    let mut settings = match &cli.config {
        Some(path) => posecast_settings::load_settings_from_path(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => posecast_settings::load_settings().with_context(|| {
            format!(
                "failed to load settings from {}",
                posecast_settings::settings_path().display()
            )
        })?,
    };
    cli.apply(&mut settings);
    settings.validate().context("invalid settings")?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;

    posecast_logging::init_subscriber(&settings.logging.level, settings.logging.format);

    let extractor =
        build_extractor(&settings.pose).context("failed to initialize landmark extractor")?;
    info!(
        extractor = extractor.name(),
        landmarks = ?extractor.landmark_count(),
        "landmark extractor ready"
    );
    let metrics = posecast_server::metrics::install_recorder()
        .context("failed to install metrics recorder")?;

    let config = ServerConfig::from_settings(&settings.server);
    let shutdown_timeout = config.shutdown_timeout;
    let server = PosecastServer::new(config, Arc::new(ImageFrameDecoder::default()), extractor)
        .with_metrics(metrics);

    let (addr, handle) = server.listen().await.context("failed to bind server")?;
    info!(
        %addr,
        extractor = ?settings.pose.extractor,
        origins = settings.server.allowed_origins.len(),
        "posecast relay ready at ws://{addr}/ws"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    info!("shutting down");
    if !server
        .shutdown()
        .graceful_shutdown(vec![handle], shutdown_timeout)
        .await
    {
        warn!("forced shutdown with sessions still draining");
    }
    info!("shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_leave_settings_alone() {
        let cli = Cli::parse_from(["posecast-relay"]);
        let mut settings = PosecastSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.pose.extractor, ExtractorKind::Disabled);
    }

    #[test]
    fn cli_flags_override() {
        let cli = Cli::parse_from([
            "posecast-relay",
            "--host",
            "127.0.0.1",
            "--port",
            "9001",
            "--log-level",
            "debug",
        ]);
        let mut settings = PosecastSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 9001);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn model_flag_enables_onnx() {
        let cli = Cli::parse_from(["posecast-relay", "--model", "/models/movenet.onnx"]);
        let mut settings = PosecastSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.pose.extractor, ExtractorKind::Onnx);
        assert_eq!(
            settings.pose.model_path.as_deref(),
            Some("/models/movenet.onnx")
        );
    }

    #[test]
    fn resolve_reads_config_file_then_cli() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server":{"port":7000,"replyScope":"sender"}}"#).unwrap();

        let cli = Cli::parse_from([
            "posecast-relay",
            "--config",
            path.to_str().unwrap(),
            "--host",
            "127.0.0.1",
        ]);
        let settings = resolve_settings(&cli).unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.reply_scope.to_string(), "sender");
    }

    #[test]
    fn resolve_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ nope").unwrap();
        let cli = Cli::parse_from(["posecast-relay", "--config", path.to_str().unwrap()]);
        assert!(resolve_settings(&cli).is_err());
    }
}
