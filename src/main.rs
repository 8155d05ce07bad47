use std::{fs, io::{self, Write}, path::Path};

use clap::Parser as _;

use crate::{
    cli::{Cli, Command},
    prelude::*,
};


mod cli;
mod config;
mod driver;
mod log;
mod prelude;
mod scenario;


#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;


#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::GenConfigTemplate { out } => {
            let template = config::template();
            match out {
                Some(path) => fs::write(&path, &template)
                    .with_context(|| format!("failed to write '{}'", path.display()))?,
                None => io::stdout().write_all(template.as_bytes())?,
            }
        }

        Command::Check { variant } => {
            let config = load_config(cli.config.as_deref())?;
            let set = config.scenario.build(variant)?;
            let session = config.scenario.session();
            info!(host = %config.target.host, "config and scenario set '{}' are valid", set.name());
            io::stdout().write_all(set.describe(&session).as_bytes())?;
        }

        Command::Run { variant } => {
            let config = load_config(cli.config.as_deref())?;
            let set = config.scenario.build(variant)?;
            let summary = driver::run(&set, config.scenario.session(), &config.target, &config.load)
                .await?;
            debug!(requests = summary.requests.len(), "load test done");
        }
    }

    Ok(())
}

/// Loads the config and initializes logging according to it.
fn load_config(path: Option<&Path>) -> Result<config::Config> {
    let (config, path) = config::load(path)?;
    log::init(&config.log)?;
    match path {
        Some(path) => info!("loaded config from '{}'", path.display()),
        None => warn!(
            "no config file found (checked {}), using defaults",
            config::DEFAULT_PATHS.join(", "),
        ),
    }
    Ok(config)
}
