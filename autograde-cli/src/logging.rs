//! CLI logging setup
//!
//! Per-phase filtering on top of `tracing-subscriber`. Logs go to standard
//! error so they never mix with replayed program output.

use crate::config::LogConfig;
use autograde_config::Phase;
use clap::ValueEnum;
use std::io;
use tracing_subscriber::{filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Multi-line, colored
    Pretty,
    Compact,
    /// One JSON object per event, for tooling
    Json,
}

pub fn init(log_config: &LogConfig, format: LogFormat) {
    let targets = Phase::all().into_iter().fold(
        Targets::new()
            .with_default(log_config.global)
            .with_target("autograde::cli", log_config.global),
        |targets, phase| targets.with_target(phase.target(), log_config.level_for(phase)),
    );
    let layer = create_format_layer(format, io::stderr).with_filter(targets);
    // a second init (tests) keeps the first subscriber
    let _ = tracing_subscriber::registry().with(layer).try_init();
}

fn create_format_layer<W, F>(format: LogFormat, make_writer: F) -> Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>
where
    W: io::Write + Send + Sync + 'static,
    F: Fn() -> W + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_names(true)
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .without_time()
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_writer(make_writer)
            .boxed(),
    }
}
