//! CLI command implementations.

use colored::Colorize;
use sheetsync_core::{ConversionSummary, Converter};
use sheetsync_watcher::{ChangeWatcher, DEFAULT_INTERVAL};
use std::path::Path;
use tokio_util::sync::CancellationToken;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Convert every sheet of `input` once.
pub fn convert(converter: &Converter, input: &Path) -> Result<ConversionSummary> {
    let summary = converter.convert(input)?;
    report(&summary, input);
    Ok(summary)
}

/// Keep reconverting `input` whenever its modification time moves forward.
///
/// Runs until Ctrl+C or a fatal error.
pub async fn watch(converter: &Converter, input: &Path) -> Result<()> {
    let watcher = ChangeWatcher::new(input)?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    println!(
        "{} Watching {} every {}s",
        "✓".green(),
        input.display().to_string().cyan(),
        DEFAULT_INTERVAL.as_secs()
    );
    println!("  Press {} to stop", "Ctrl+C".cyan());

    watcher
        .run(DEFAULT_INTERVAL, cancel, |path| {
            converter.convert(path).map(|summary| report(&summary, path))
        })
        .await?;

    println!("{} Stopped", "✓".green());
    Ok(())
}

fn report(summary: &ConversionSummary, input: &Path) {
    println!(
        "{} Converted {} sheets ({} rows) from {}",
        "✓".green(),
        summary.sheets.len().to_string().cyan(),
        summary.total_rows(),
        input.display()
    );
    for sheet in &summary.sheets {
        println!(
            "  {} {}",
            sheet.sheet,
            format!("-> {}", sheet.output.display()).dimmed()
        );
    }
}
