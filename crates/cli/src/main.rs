//! Projector entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: flags and `PRJ_*` environment variables ([`config`]).
//! 2. **Wire observability**: `tracing-subscriber` with a JSON or pretty layer
//!    and an optional OpenTelemetry OTLP exporter ([`telemetry`]).
//! 3. **Construct infrastructure**: the `GithubClient`, injected into the
//!    `RuleEngine` and `ReportAggregator` as `Arc<dyn BoardClient>`.
//! 4. **Run the selected command**:
//!    - `serve`: log the org inventory, register the org hook, then serve
//!      `/health`, `/webhook` and `/reports`, optionally with a report timer.
//!    - `report`: generate every board's report once and print it.
//!    - `check-rules`: load and print the rule set.

mod config;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use automation::{ensure_org_hook, log_inventory, ReportAggregator, RuleEngine};
use board::{BoardClient, LabelRule};
use clap::Parser;
use listener::{create_routes, AppState};
use tracing::{info, warn};

use crate::config::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _telemetry = telemetry::init(cli.log_format, cli.otlp_endpoint.as_deref())?;

    match cli.selected_command() {
        Command::Serve => serve(&cli).await,
        Command::Report => report(&cli).await,
        Command::CheckRules => check_rules(&cli),
    }
}

async fn serve(cli: &Cli) -> Result<()> {
    let client: Arc<dyn BoardClient> = Arc::new(cli.github_client()?);

    log_inventory(client.as_ref()).await;
    match &cli.hook_url {
        Some(url) => match ensure_org_hook(client.as_ref(), url).await {
            Ok(status) => info!(?status, url = %url, "Org hook checked"),
            Err(err) => warn!(error = %err, "Unable to register org hook"),
        },
        None => info!("PRJ_HOOK_URL not set; skipping org hook registration"),
    }

    let mut engine =
        RuleEngine::new(client.clone(), cli.load_rules()?).with_call_deadline(cli.request_timeout());
    if let Some(placement) = cli.default_placement()? {
        info!(board = %placement.board, column = %placement.column, "Default placement enabled");
        engine = engine.with_default_placement(placement);
    }
    let engine = Arc::new(engine);
    let aggregator = ReportAggregator::new(client.clone());

    if let Some(interval) = cli.report_interval() {
        tokio::spawn(scheduled_reports(aggregator.clone(), interval));
    }
    #[cfg(unix)]
    tokio::spawn(reload_on_hangup(engine.clone(), cli.rules_path.clone()));

    let mut state = AppState::new(engine, aggregator);
    if let Some(secret) = &cli.webhook_secret {
        state = state.with_secret(secret);
    } else {
        warn!("PRJ_WEBHOOK_SECRET not set; webhook deliveries are not authenticated");
    }

    let listener = tokio::net::TcpListener::bind(&cli.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", cli.listen_addr))?;
    info!(addr = %cli.listen_addr, "Server listening");

    axum::serve(listener, create_routes(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn report(cli: &Cli) -> Result<()> {
    let client: Arc<dyn BoardClient> = Arc::new(cli.github_client()?);
    let reports = ReportAggregator::new(client).generate_all().await?;
    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

fn check_rules(cli: &Cli) -> Result<()> {
    let rules = cli.load_rules()?;
    let rules: Vec<&LabelRule> = rules.iter().collect();
    println!("{}", serde_json::to_string_pretty(&rules)?);
    Ok(())
}

async fn scheduled_reports(aggregator: ReportAggregator, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match aggregator.generate_all().await {
            Ok(set) => {
                for (board, report) in &set.reports {
                    info!(
                        run = %set.run,
                        board = %board,
                        closed = report.closed_count,
                        labels = ?report.label_counts,
                        "Board report"
                    );
                }
                for omitted in &set.omitted {
                    warn!(run = %set.run, board = %omitted.board, cause = %omitted.cause, "Board omitted from report");
                }
            }
            Err(err) => warn!(error = %err, "Scheduled report failed"),
        }
    }
}

/// Reloads the rule set on SIGHUP. A file that fails to parse keeps the
/// current rules.
#[cfg(unix)]
async fn reload_on_hangup(engine: Arc<RuleEngine>, rules_path: Option<std::path::PathBuf>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(err) => {
            warn!(error = %err, "Unable to listen for SIGHUP; rule reload disabled");
            return;
        }
    };
    while hangup.recv().await.is_some() {
        match config::load_rules(rules_path.as_deref()) {
            Ok(rules) => engine.reload(rules).await,
            Err(err) => warn!(error = %err, "Rule reload failed; keeping current rules"),
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received");
}
