//! Sheetsync CLI - spreadsheet to CSV, kept in sync
//!
//! Converts every sheet of the input to `<sheet>.csv` in the current
//! directory, then (unless `--watch false`) keeps polling the input and
//! reconverts when it changes.

use clap::{ArgAction, CommandFactory, Parser};
use colored::Colorize;
use sheetsync_core::Converter;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "sheetsync")]
#[command(author = "Sheetsync Contributors")]
#[command(version)]
#[command(about = "Convert spreadsheet sheets to CSV files and keep them in sync", long_about = None)]
struct Cli {
    /// Spreadsheet to convert (xlsx, xlsm, xlsb, xls, ods)
    #[arg(short, long, value_name = "FILE", default_value = "")]
    input: String,

    /// Watch the input and reconvert it when it changes
    #[arg(short, long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    watch: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.input.is_empty() {
        eprintln!("{}", Cli::command().render_help());
        std::process::exit(1);
    }

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let input = Path::new(&cli.input);
    let converter = Converter::workbook_to_csv(".");

    let mut result = commands::convert(&converter, input).map(|_| ());
    if result.is_ok() && cli.watch {
        result = commands::watch(&converter, input).await;
    }

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
