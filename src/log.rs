//! Logging via `tracing`. Records that goose emits through the `log` crate
//! end up here as well, with targets like `goose::metrics`.

use std::{
    collections::HashMap,
    fs::{File, OpenOptions},
    io::Write as _,
    path::{Path, PathBuf},
};
use serde::Deserialize;
use tracing_subscriber::{
    filter::{FilterFn, LevelFilter},
    fmt,
    prelude::*,
};

use crate::prelude::*;


#[derive(Debug, confique::Config)]
pub(crate) struct LogConfig {
    /// Minimum log level per module path prefix. For every log message, the
    /// entry with the longest prefix of the message's target decides; messages
    /// without a matching entry are dropped. Valid levels: off, error, warn,
    /// info, debug, trace.
    ///
    /// By default, this tool logs at "info" while goose, which is chatty at
    /// "info" (one line per launched user), only gets to report warnings.
    /// To see every request the driver sends, together with goose's own
    /// progress messages:
    ///
    ///    [log]
    ///    filters."ticket_loadtest::driver" = "trace"
    ///    filters.goose = "info"
    #[config(default = { "ticket_loadtest": "info", "goose": "warn" })]
    pub(crate) filters: Filters,

    /// Log file that messages are appended to, in addition to stdout. Useful
    /// to keep the logs of several runs next to goose's report.
    pub(crate) file: Option<PathBuf>,

    /// Whether to write log messages to stdout. Goose prints its own report to
    /// stdout after a run, so turning this off leaves only the report there.
    #[config(default = true)]
    pub(crate) stdout: bool,
}

#[derive(Debug, Deserialize)]
#[serde(try_from = "HashMap<String, String>")]
pub(crate) struct Filters(HashMap<String, LevelFilter>);

impl TryFrom<HashMap<String, String>> for Filters {
    type Error = String;
    fn try_from(value: HashMap<String, String>) -> Result<Self, Self::Error> {
        value.into_iter()
            .map(|(target_prefix, level)| {
                let level = level.parse::<LevelFilter>()
                    .map_err(|_| format!("invalid log level '{level}'"))?;
                Ok((target_prefix, level))
            })
            .collect::<Result<_, _>>()
            .map(Self)
    }
}

/// The filter entry with the longest prefix of `target` decides.
fn is_enabled(filters: &HashMap<String, LevelFilter>, target: &str, level: &tracing::Level) -> bool {
    filters.iter()
        .filter(|(target_prefix, _)| target.starts_with(target_prefix.as_str()))
        .max_by_key(|(target_prefix, _)| target_prefix.len())
        .map(|(_, level_filter)| level <= level_filter)
        .unwrap_or(false)
}

pub(crate) fn init(config: &LogConfig) -> Result<()> {
    let filters = config.filters.0.clone();
    let max_level = filters.values().max().copied().unwrap_or(LevelFilter::OFF);
    let filter = FilterFn::new(move |metadata| {
        is_enabled(&filters, metadata.target(), metadata.level())
    }).with_max_level_hint(max_level);

    let stdout_output = config.stdout.then(|| fmt::layer().with_writer(std::io::stdout));
    let file_output = config.file.as_deref()
        .map(open_log_file)
        .transpose()?
        .map(|file| fmt::layer().with_ansi(false).with_writer(file));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_output)
        .with(stdout_output)
        .init();

    Ok(())
}

fn open_log_file(path: &Path) -> Result<File> {
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("failed to open/create log file '{}'", path.display()))?;

    // Blank lines between runs.
    file.write_all(b"\n\n").context("could not write to log file")?;
    Ok(file)
}
