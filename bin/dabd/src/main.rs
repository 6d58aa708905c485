//! ---
//! dab_section: "04-daemon"
//! dab_subsection: "binary"
//! dab_type: "source"
//! dab_scope: "code"
//! dab_description: "Binary entrypoint and simulated device for the DAB bridge daemon."
//! dab_version: "v0.0.0-prealpha"
//! dab_owner: "tbd"
//! ---
//! DAB bridge daemon.
//!
//! Loads configuration, builds one adapter per configured device from
//! the catalogue, and serves the request/response loop over a JSON-lines
//! session on stdin/stdout. An MQTT transport slots in at the same seam;
//! until one is wired the line session makes the bridge fully drivable
//! from a terminal or a pipe.

mod sim;

use std::io::BufRead as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use dab_common::config::AppConfig;
use dab_common::logging::init_tracing;
use dab_common::version::VersionInfo;
use dab_core::{CatalogueEntry, DabError, DeviceBridge};
use dab_json::JsonValue;
use tracing::{debug, info, warn};

use crate::sim::SimulatedDevice;

#[derive(Debug, Parser)]
#[command(author, about = "DAB bridge daemon", long_about = None, disable_version_flag = true)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print extended version information and exit"
    )]
    version: bool,
}

fn catalogue() -> Vec<CatalogueEntry> {
    vec![CatalogueEntry::for_device("simulated", |_, _| {
        Ok(SimulatedDevice::new())
    })]
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let version = VersionInfo::current();
    if cli.version {
        println!("{}", version.extended());
        return Ok(());
    }

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/example.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let config = loaded.config;
    init_tracing("dabd", &config.logging)?;
    info!(banner = %version.banner(), config = %loaded.source.display(), "daemon starting");

    let mut bridge = DeviceBridge::new(catalogue());
    for (device_id, device) in &config.devices {
        bridge
            .make_device_instance(device_id, device.ip_address.as_deref())
            .with_context(|| format!("unable to create device instance {device_id}"))?;
        info!(
            device = %device_id,
            ip = device.ip_address.as_deref().unwrap_or("(on-device)"),
            "device registered"
        );
    }

    // telemetry and discovery fan-out share the reply channel in the
    // line session: everything is one JSON object per line on stdout
    bridge.set_publish_callback(Arc::new(|message: &JsonValue| {
        println!("{}", message.to_wire_string());
    }));
    info!(topics = bridge.topics().len(), "subscription topics ready");
    for topic in bridge.topics() {
        debug!(%topic, "subscribing");
    }

    serve_lines(&bridge)
}

/// One request envelope per stdin line, one response per stdout line.
/// EOF ends the session.
fn serve_lines(bridge: &DeviceBridge) -> Result<()> {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("stdin read failed")?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match dab_json::parse(&line) {
            Ok(envelope) => bridge.dispatch(&envelope),
            Err(err) => {
                warn!(error = %err, "discarding unparseable request");
                DabError::bad_request("unable to parse request").response()
            }
        };
        println!("{}", response.to_wire_string());
    }
    info!("input closed, shutting down");
    Ok(())
}
