use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};
use confique::{Config as _, serde::{self, Deserialize as _}};

use crate::{
    driver::{LoadConfig, TargetConfig},
    log::LogConfig,
    prelude::*,
    scenario::ScenarioConfig,
};


/// Environment variable that can point to the config file.
pub const PATH_ENV: &str = "TICKET_LOADTEST_CONFIG_PATH";

/// Locations checked (in order) if no path was given explicitly.
pub const DEFAULT_PATHS: [&str; 2] = ["config.toml", "/etc/ticket-loadtest/config.toml"];


/// Loads the configuration. Returns the path of the file it was loaded from,
/// or `None` if no file was found and only defaults are used.
pub fn load(explicit: Option<&Path>) -> Result<(Config, Option<PathBuf>)> {
    let path = find_path(explicit, env::var_os(PATH_ENV), &DEFAULT_PATHS);
    let config = load_from(path.as_deref())?;
    Ok((config, path))
}

/// Picks the config file: explicit path, then the env variable, then the
/// first existing default path. The first two are returned even if they
/// don't exist.
fn find_path(explicit: Option<&Path>, env: Option<OsString>, defaults: &[&str]) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf)
        .or_else(|| env.map(PathBuf::from))
        .or_else(|| defaults.iter().map(PathBuf::from).find(|p| p.exists()))
}

fn load_from(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            if !path.exists() {
                bail!("config file '{}' does not exist", path.display());
            }
            Config::from_file(path)
                .with_context(|| format!("failed to load config file '{}'", path.display()))
        }
        None => Config::builder().load().context("failed to build default config"),
    }
}

pub fn template() -> String {
    let mut options = confique::toml::FormatOptions::default();
    options.general.nested_field_gap = 2;
    confique::toml::template::<Config>(options)
}

#[derive(Debug, confique::Config)]
pub struct Config {
    #[config(nested)]
    pub target: TargetConfig,

    #[config(nested)]
    pub load: LoadConfig,

    #[config(nested)]
    pub scenario: ScenarioConfig,

    #[config(nested)]
    pub log: LogConfig,
}


/// Custom format for durations. We allow a couple useful units and required
/// a unit to increase readability of config files.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(D::Error::custom)
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    // Allow unit-less zeroes
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let start_unit = s.find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| "no time unit for duration".to_owned())?;
    let (num, unit) = s.split_at(start_unit);
    let num: u32 = num.parse()
        .map_err(|e| format!("invalid integer for duration: {e}"))?;
    let num: u64 = num.into();

    match unit {
        "ms" => Ok(Duration::from_millis(num)),
        "s" => Ok(Duration::from_secs(num)),
        "min" => Ok(Duration::from_secs(num * 60)),
        "h" => Ok(Duration::from_secs(num * 60 * 60)),
        "d" => Ok(Duration::from_secs(num * 60 * 60 * 24)),
        _ => Err("invalid unit of time for duration".into()),
    }
}
