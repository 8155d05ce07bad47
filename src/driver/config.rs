use std::{fmt, num::NonZeroUsize, time::Duration};

use serde::Deserialize;


#[derive(Debug, confique::Config)]
pub struct TargetConfig {
    /// Base URL of the ticketing application under test, e.g.
    /// "https://tickets.staging.example.com". Must not contain a path. All
    /// action paths (like `/events`) are appended to this.
    #[config(default = "http://localhost:8000")]
    pub host: HttpHost,
}

#[derive(Debug, confique::Config)]
#[config(validate = Self::validate)]
pub struct LoadConfig {
    /// Number of simulated users to spawn. Users are distributed over the
    /// profiles of the scenario set according to their weights.
    #[config(default = 10)]
    pub users: NonZeroUsize,

    /// How many users to spawn per second, e.g. "1" or "0.5".
    #[config(default = "1", validate = validate_hatch_rate)]
    pub hatch_rate: String,

    /// How long to run the load test after all users were spawned, e.g.
    /// "90s" or "10min". "0" means no limit (stop with Ctrl+C or via
    /// `iterations`).
    #[config(default = "0", deserialize_with = crate::config::deserialize_duration)]
    pub run_time: Duration,

    /// If set, every user stops after running through its profile's actions
    /// this many times. Cannot be combined with `run_time`.
    pub iterations: Option<NonZeroUsize>,

    /// If set, limits the total number of requests per second across all users.
    pub throttle_requests: Option<NonZeroUsize>,
}

impl LoadConfig {
    fn validate(&self) -> Result<(), String> {
        if self.iterations.is_some() && !self.run_time.is_zero() {
            return Err("`iterations` and `run_time` cannot both be set".into());
        }
        Ok(())
    }
}

fn validate_hatch_rate(value: &String) -> Result<(), &'static str> {
    match value.parse::<f32>() {
        Ok(rate) if rate.is_finite() && rate > 0.0 => Ok(()),
        _ => Err("must be a positive number"),
    }
}


/// Scheme and authority of an HTTP(S) server, without trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct HttpHost(String);

impl HttpHost {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HttpHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HttpHost {
    type Error = &'static str;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.trim() != s {
            return Err("host has trailing or leading whitespace");
        }
        let Some((scheme, authority)) = s.split_once("://") else {
            return Err("invalid URL: does not contain scheme");
        };
        if scheme != "http" && scheme != "https" {
            return Err("host must have HTTP or HTTPS scheme");
        }
        let authority = authority.strip_suffix('/').unwrap_or(authority);
        if authority.is_empty() {
            return Err("host is missing the authority part");
        }
        if ['/', '?', '#', '@'].iter().any(|c| authority.contains(*c)) {
            return Err("host must not contain path, query, fragment or user part");
        }

        Ok(Self(format!("{scheme}://{authority}")))
    }
}
