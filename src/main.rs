use std::process;

use anyhow::Result;
use sched_analyzer::{parse, usage, Config, ParseError};
use tracing::{debug, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// RUST_LOG wins over the verbosity flags.
fn env_filter(verbosity: u8) -> EnvFilter {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the stderr logger before parsing so warnings raised while parsing
/// are shown. The level is adjusted once `-v` has been seen.
fn init_logging() -> reload::Handle<EnvFilter, Registry> {
    let (filter, handle) = reload::Layer::new(env_filter(0));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
    handle
}

fn report(err: ParseError) -> ! {
    match err {
        // clap already formats help, version and its own usage errors.
        ParseError::Usage(e) => e.exit(),
        e => {
            eprintln!("sched-analyzer: {e}");
            eprintln!("{}", usage());
            eprintln!("Try 'sched-analyzer --help' for more information.");
            process::exit(e.exit_code());
        }
    }
}

fn summarize(config: &Config) -> Result<()> {
    let mode = if config.app { "app" } else { "system" };
    info!(
        "mode: {}, trace: {}, max size: {} bytes",
        mode,
        config.trace_path().display(),
        config.max_size
    );
    info!("events: {}", config.enabled_events().join(", "));
    if config.has_pid_filter() {
        info!("filtering on pid {}", config.pid);
    }
    if config.has_comm_filter() {
        info!("filtering on comm '{}'", config.comm_str());
    }
    debug!("config: {}", config.to_json()?);
    Ok(())
}

fn main() -> Result<()> {
    let log_handle = init_logging();
    let config = match parse(std::env::args_os()) {
        Ok(config) => config,
        Err(e) => report(e),
    };
    log_handle.reload(env_filter(config.verbosity))?;
    summarize(&config)
}
