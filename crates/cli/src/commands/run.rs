//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::bench::{BenchConfig, BenchRunner};
use crate::cli::RunArgs;
use crate::error::CliError;

use super::load_profile;

/// Execute the `run` command
pub async fn run_bench(args: &RunArgs) -> Result<()> {
    let profile = load_profile(args.config.as_deref(), &args.overrides)?;

    info!(
        dispatcher = %profile.dispatcher.name,
        capacity = profile.dispatcher.capacity,
        delay_ms = profile.dispatcher.delay_ms,
        scheduler = ?profile.scheduler,
        producers = profile.load.producers,
        items = profile.load.total_items(),
        "Profile loaded"
    );

    if args.dry_run {
        info!("Dry run mode - profile is valid, exiting");
        println!("{}", config_loader::ConfigLoader::to_toml(&profile)?);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    let runner = BenchRunner::new(BenchConfig {
        profile,
        idle_timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
    });
    let (dispatcher, processor) = runner.build()?;
    let control = dispatcher.clone();

    let mut task =
        tokio::task::spawn_blocking(move || runner.drive(&dispatcher, &processor));

    let shutdown_signal = setup_shutdown_signal();

    let stats = tokio::select! {
        joined = &mut task => joined
            .map_err(|e| CliError::bench_task(e.to_string()))?
            .context("Bench run failed")?,
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping dispatcher...");
            control.stop();
            let discarded = control.clear();
            warn!(discarded, "Discarded undelivered items");
            task.await
                .map_err(|e| CliError::bench_task(e.to_string()))?
                .context("Bench run failed")?
        }
    };

    info!(
        delivered = stats.delivered_items,
        flushes = stats.snapshot.flush_count,
        duration_secs = stats.duration.as_secs_f64(),
        throughput = format!("{:.1}", stats.throughput()),
        "Bench run finished"
    );

    if args.json {
        let json = serde_json::to_string_pretty(&stats.report())
            .context("Failed to serialize bench report")?;
        println!("{json}");
    } else {
        stats.print_summary();
    }

    if !stats.is_complete() {
        return Err(CliError::Incomplete {
            expected: stats.expected_items,
            delivered: stats.delivered_items,
            violations: stats.order_violations,
        }
        .into());
    }
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
