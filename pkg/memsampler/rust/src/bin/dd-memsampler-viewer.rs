// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Chart viewer for memory sampler dumps.
//!
//! Serves a line chart of the most recent dump found in `--dir`.
//!
//! # Usage
//!
//! ```bash
//! dd-memsampler-viewer --dir /tmp/memsampler
//! dd-memsampler-viewer --service api --port 8080 --unit GByte
//! dd-memsampler-viewer --record-self --interval-secs 2   # chart the viewer itself
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use dd_memsampler::config::{DEFAULT_DUMP_DIR, DEFAULT_SERVICE_NAME};
use dd_memsampler::viewer::{run_server, ViewerConfig};
use dd_memsampler::{CollectorConfig, Unit};

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "dd-memsampler-viewer")]
#[command(about = "Serve a chart of the latest memory sampler dump")]
#[command(version)]
struct Args {
    /// Directory containing dump files
    #[arg(long, env = "DD_MEMSAMPLER_DIR", default_value = DEFAULT_DUMP_DIR)]
    dir: PathBuf,

    /// Service name the dumps were written with
    #[arg(long, env = "DD_MEMSAMPLER_SERVICE", default_value = DEFAULT_SERVICE_NAME)]
    service: String,

    /// Port for web server
    #[arg(short, long, default_value = "8050")]
    port: u16,

    /// Path serving the chart page
    #[arg(long, default_value = "/")]
    uri: String,

    /// Default display unit (Byte, KByte, MByte, GByte)
    #[arg(long, default_value = "MByte")]
    unit: Unit,

    /// Also sample this viewer process into --dir
    #[arg(long)]
    record_self: bool,

    /// Sampling interval in seconds for --record-self
    #[arg(long, default_value = "10")]
    interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing - RUST_LOG takes precedence, fallback to info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if !args.uri.starts_with('/') || args.uri.starts_with("/api/") {
        bail!("--uri must start with '/' and must not be under /api/: {}", args.uri);
    }

    // Kept alive for the lifetime of the server
    let _collector = if args.record_self {
        let config = CollectorConfig::default()
            .with_dir(&args.dir)
            .with_service_name(&args.service)
            .with_interval(Duration::from_secs(args.interval_secs));
        Some(dd_memsampler::start(config).context("failed to start memory sampler")?)
    } else {
        None
    };

    let config = ViewerConfig {
        dir: args.dir,
        service_name: args.service,
        unit: args.unit,
        uri: args.uri,
        port: args.port,
    };

    tokio::select! {
        result = run_server(config) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT, shutting down");
            Ok(())
        }
    }
}
