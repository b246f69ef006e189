use anyhow::Result;
use colored::Colorize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use dropsort::output::lane_label;
use dropsort::{status_print, Config, ConsoleReporter, Disposition, ErrorReporter, LogReporter, Pipeline};

pub async fn run(config: Config, once: bool, quiet: bool) -> Result<()> {
    // Quiet mode mutes the console, so reports go to the log instead
    let reporter: Arc<dyn ErrorReporter> = if quiet {
        Arc::new(LogReporter)
    } else {
        Arc::new(ConsoleReporter)
    };

    let mut pipeline = Pipeline::new(config, reporter)?;
    let config = pipeline.config().clone();

    status_print!("{}", "dropsort".bright_cyan().bold());
    status_print!("  input: {}", config.input_dir.display());
    status_print!("  csv:   {}", config.csv_dir.display());
    status_print!("  txt:   {}", config.txt_dir.display());

    if once {
        let outcomes = pipeline.run_cycle().await;
        if outcomes.is_empty() {
            status_print!("Nothing to do");
        }
        for outcome in &outcomes {
            let detail = match &outcome.disposition {
                Disposition::Moved { to, .. } | Disposition::Quarantined { to } => {
                    format!("-> {}", to.display())
                }
                Disposition::Reported => "reported".to_string(),
                Disposition::Failed => "failed".yellow().to_string(),
            };
            status_print!(
                "[{}] {} {}",
                lane_label(outcome.lane),
                outcome.path.display(),
                detail
            );
        }
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received, shutting down"),
            Err(err) => warn!("Failed to listen for Ctrl-C: {}", err),
        }
        on_signal.cancel();
    });

    status_print!("Press Ctrl-C to stop");
    let stats = pipeline.run(shutdown).await;
    stats.print_summary();

    Ok(())
}
