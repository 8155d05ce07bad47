use std::path::PathBuf;

use crate::scenario::Variant;


#[derive(clap::Parser)]
#[command(version, about)]
pub struct Cli {
    #[clap(subcommand)]
    pub cmd: Command,

    /// Specifies config file location. Default locations are: 'config.toml' and
    /// '/etc/ticket-loadtest/config.toml'. Can also be set via env
    /// `TICKET_LOADTEST_CONFIG_PATH`. Without any config file, defaults are used.
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Runs the load test against the configured host.
    Run {
        /// Scenario set to run, overriding `scenario.variant` from the config.
        #[clap(long, value_enum)]
        variant: Option<Variant>,
    },

    /// Checks the config and the scenario set, then prints all profiles and
    /// actions with their selection probabilities. Sends no requests.
    Check {
        /// Scenario set to check, overriding `scenario.variant` from the config.
        #[clap(long, value_enum)]
        variant: Option<Variant>,
    },

    /// Outputs a template of the configuration, including all config options
    /// with descriptions, great as a starting point.
    GenConfigTemplate {
        /// File to write it to. If unspecified, written to stdout.
        #[clap(short, long)]
        out: Option<PathBuf>,
    },
}
