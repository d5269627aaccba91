//! # Tide Dashboard Entry Point
//!
//! Loads the configuration, builds the pipeline over the live HTTP source,
//! then either serves the dashboard or, in development mode (`--stdout`),
//! performs a single load and prints the ASCII summary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use argh::FromArgs;
use chrono::Utc;
use tide_dash_lib::config::{self, Config};
use tide_dash_lib::pipeline::Pipeline;
use tide_dash_lib::renderer::draw_ascii;
use tide_dash_lib::server;
use tide_dash_lib::source::HttpSource;

/// Weather and tide dashboard for one location and one NOAA station
#[derive(FromArgs)]
struct Args {
    /// configuration file (default: tide-config.toml)
    #[argh(option, short = 'c', default = "PathBuf::from(config::DEFAULT_PATH)")]
    config: PathBuf,

    /// log level: error, warn, info, debug or trace (default: info)
    #[argh(option, default = "log::LevelFilter::Info")]
    log_level: log::LevelFilter,

    /// print one ASCII summary to stdout instead of serving
    #[argh(switch)]
    stdout: bool,

    /// listen address, overriding [server].bind
    #[argh(option, short = 'b')]
    bind: Option<String>,
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .target(env_logger::Target::Stderr)
        .init();

    let config = Config::load_from_path(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let bind = args.bind.clone().unwrap_or_else(|| config.server.bind.clone());
    let source = HttpSource::new(config.request_timeout()).context("building HTTP client")?;
    let pipeline = Pipeline::new(config, source).context("building pipeline")?;
    log::info!(
        "Dashboard for {} at station {} in {}",
        pipeline.config().location.name,
        pipeline.config().station.id,
        pipeline.zone()
    );

    let rt = tokio::runtime::Runtime::new()?;

    // Development mode: one load, ASCII output
    if args.stdout {
        let dashboard = rt
            .block_on(pipeline.load(Utc::now()))
            .context("loading dashboard")?;
        draw_ascii(&dashboard);
        return Ok(());
    }

    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid listen address {bind:?}"))?;
    rt.block_on(server::serve(addr, Arc::new(pipeline)))
}
