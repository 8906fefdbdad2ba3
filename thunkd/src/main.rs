use std::{panic, process::exit};

use clap::Parser;
use env_logger::Env;
use error::CliError;
use log::{error, LevelFilter};

use crate::commands::project::project_cli::PullOptions;
use crate::utils::console::console_info;

mod commands;
mod config;
mod error;
mod utils;

async fn run_thunkd_command(args: thunkd_cli_opts::Thunkd) -> Result<(), CliError> {
    match args.command {
        thunkd_cli_opts::Subcommand::Pull {
            project_id,
            path,
            clean,
            modular,
            yes,
        } => {
            let options = PullOptions {
                clean,
                modular,
                assume_yes: yes,
            };
            commands::project::project_cli::pull(
                project_id,
                path,
                options,
                &args.profile,
                args.endpoint,
            )
            .await?
        }
        thunkd_cli_opts::Subcommand::Push {
            project_id,
            path,
            modular,
        } => {
            commands::project::project_cli::push(
                project_id,
                path,
                modular,
                &args.profile,
                args.endpoint,
            )
            .await?
        }
        thunkd_cli_opts::Subcommand::Set { variable, value } => {
            commands::configure::configure_cli::set_setting(&args.profile, variable, value).await?
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = thunkd_cli_opts::Thunkd::parse();

    let log_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Error
    }
    .as_str();

    panic::set_hook(Box::new(move |info| {
        error!("{}", info);
    }));

    env_logger::Builder::from_env(
        Env::default()
            .default_filter_or(log_level)
            .default_write_style_or("always"),
    )
    .init();

    if let Err(e) = run_thunkd_command(args).await {
        log::debug!("command failed: {:?}", e.kind());
        console_info!("{}", e);
        exit(1)
    }
}
