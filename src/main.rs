mod cli;
mod commands;
mod config;
mod device;
mod engine;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let result = match cli.command {
        Command::Plan(args) => commands::converge::plan(&ctx, args),
        Command::Apply(args) => commands::converge::apply(&ctx, args),
        Command::Show(args) => commands::show::run(&ctx, args),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "plbsync", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        ui::error(&format!("{e:#}"));
        std::process::exit(1);
    }
    Ok(())
}
