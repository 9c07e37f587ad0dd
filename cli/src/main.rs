mod cli;
mod client;
mod config;
mod logging;
mod manifest;
mod pipeline;

use std::error::Error;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use color_eyre::eyre::Result;
use tracing::{debug, warn};

use cli::Cli;
use client::BuildNumClient;
use config::Config;

fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => {
            // --help and --version
            e.print()?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => {
            let rendered = e.render().to_string();
            print!("{}", rendered);
            if !rendered.contains("Usage:") {
                println!("{}", Cli::command().render_usage());
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    let config = match Config::from_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            println!("error: {}", e);
            println!("{}", Cli::command().render_usage());
            return Ok(ExitCode::FAILURE);
        }
    };

    logging::init(config.log_level);

    let client = BuildNumClient::new(&config.server);
    debug!(url = %client.url(), "Using build server");
    match pipeline::run(&config, &client) {
        Ok(updated) => {
            println!(
                "Updated file \"{}\" with version \"{}\"",
                updated.path.display(),
                updated.version
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            warn!(error = %e, "Build number update failed");
            report(&e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn report(err: &dyn Error) {
    println!("error: {}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        println!("  caused by: {}", cause);
        source = cause.source();
    }
}
