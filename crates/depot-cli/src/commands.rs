use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use depot_client::HttpRegistryClient;
use depot_sync::{CancelToken, Orchestrator, RunOutcome, SyncReport, TransferStatus};
use tracing::warn;

use crate::cli::*;
use crate::config::MirrorConfig;

/// Run the selected command and return the process exit code.
pub async fn run_command(cli: Cli) -> anyhow::Result<i32> {
    let orchestrator = match &cli.command {
        Command::Sync(args) => build(&args.config)?,
        Command::Keys(args) => build(&args.config)?,
    };
    watch_for_interrupt(orchestrator.cancel_token());

    let report = match cli.command {
        Command::Sync(_) => orchestrator.run().await?,
        Command::Keys(_) => orchestrator.sync_keys_only().await?,
    };

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print!("{}", render_text(&report)),
    }
    Ok(report.outcome().exit_code())
}

fn build(config_path: &Path) -> anyhow::Result<Orchestrator> {
    let config = MirrorConfig::load(config_path)?;
    let upstream = HttpRegistryClient::new(&config.upstream).context("upstream depot")?;
    let target = HttpRegistryClient::new(&config.target).context("target depot")?;
    Ok(Orchestrator::new(
        Arc::new(upstream),
        Arc::new(target),
        config.origins.clone(),
        config.sync_config(),
    ))
}

/// Exit status for a run killed by a second interrupt (128 + SIGINT).
const FORCED_EXIT: i32 = 130;

/// The first Ctrl-C stops the run at the next stage boundary; a second one
/// exits immediately.
fn watch_for_interrupt(cancel: CancelToken) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if interrupt(&cancel) {
                warn!("second interrupt; exiting now");
                std::process::exit(FORCED_EXIT);
            }
            warn!("interrupt received; stopping after in-flight transfers (Ctrl-C again to force)");
        }
    });
}

/// Cancel the run; `true` when it was already cancelled.
fn interrupt(cancel: &CancelToken) -> bool {
    let repeated = cancel.is_cancelled();
    cancel.cancel();
    repeated
}

fn render_text(report: &SyncReport) -> String {
    let mut out = String::new();

    for keys in &report.keys {
        match &keys.error {
            Some(e) => {
                let _ = writeln!(out, "{} keys {}: {}", "✗".red(), keys.origin.bold(), e);
            }
            None => {
                let _ = writeln!(
                    out,
                    "  keys {}: {} imported, {} failed",
                    keys.origin.bold(),
                    keys.imported.len(),
                    keys.failed.len()
                );
            }
        }
        for failure in &keys.failed {
            let _ = writeln!(out, "    {} {}: {}", "✗".red(), failure.key, failure.reason);
        }
    }

    for channel in &report.channels {
        let scope = format!("{}/{}", channel.origin, channel.channel);
        if let Some(e) = &channel.error {
            let _ = writeln!(out, "{} {}: {}", "✗".red(), scope.bold(), e);
            continue;
        }
        let _ = writeln!(
            out,
            "  {}: {} upstream, {} target, {} missing",
            scope.bold(),
            channel.upstream_count,
            channel.target_count,
            channel.missing
        );
        for package in &channel.packages {
            if let Some(TransferStatus::Failed { reason }) = package.status() {
                let _ = writeln!(out, "    {} {}: {}", "✗".red(), package.package, reason);
            }
        }
    }

    let _ = writeln!(
        out,
        "Transferred {} ({} bytes), skipped {}, failed {}, keys imported {}",
        report.transferred(),
        report.bytes_transferred(),
        report.skipped(),
        report.failed(),
        report.keys_imported()
    );
    let outcome = report.outcome();
    let headline = match outcome {
        RunOutcome::FullySynced => format!("{} {}", "✓".green().bold(), outcome),
        RunOutcome::PartiallySynced => format!("{} {}", "!".yellow().bold(), outcome),
        RunOutcome::Aborted => format!("{} {}", "✗".red().bold(), outcome),
    };
    let _ = writeln!(out, "{headline} (run {})", report.run_id.to_string().dimmed());
    out
}
