//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::{RunArgs, SourceKind};
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_logger(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let enabled = blueprint.enabled_sinks();
    info!(
        logger = %blueprint.logger.name,
        source_url = %blueprint.source.url,
        tags = blueprint.tags.len(),
        metrics = enabled.metrics,
        http = enabled.http,
        broadcast = enabled.broadcast,
        document_store = enabled.document_store,
        "Configuration loaded"
    );

    if blueprint.source.generate_cert {
        info!("source.generate_cert is set; certificate bootstrap is left to the OPC-UA client");
    }

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    if args.source == SourceKind::Replay && args.replay.is_none() {
        anyhow::bail!("--source replay requires --replay <file>");
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        source: args.source,
        replay_path: args.replay.clone(),
        interval: Duration::from_millis(args.interval_ms),
        max_readings: (args.max_readings > 0).then_some(args.max_readings),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        buffer_size: args.buffer_size.get(),
    });

    info!("Starting pipeline...");

    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        readings = stats.readings_received,
        duration_secs = stats.duration.as_secs_f64(),
        rate = format!("{:.2}", stats.readings_per_sec()),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("Tag Logger finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
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

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::LoggerBlueprint) {
    let context = blueprint.publish_context();

    println!("\n=== Configuration Summary ===\n");
    println!("Logger:");
    println!("  Name: {}", blueprint.logger.name);
    println!("  Namespace: {}", context.namespace);
    println!("  Source: {}", blueprint.source.url);
    println!("\nTags ({}):", blueprint.tags.len());
    for tag in &blueprint.tags {
        println!(
            "  - {} ({}) [{:?}]",
            tag.tag_id, tag.display_name, tag.metric_kind
        );
    }

    let exporters = &blueprint.exporters;
    let enabled = blueprint.enabled_sinks();
    println!("\nExporters ({} enabled):", enabled.count());
    if enabled.metrics {
        println!(
            "  - metrics: http://{}{}",
            exporters.metrics.bind,
            observability::metrics_path(&context.namespace)
        );
    }
    if enabled.http {
        println!("  - http: POST {}", exporters.http.url);
    }
    if enabled.broadcast {
        println!("  - broadcast: ws://{}/ws", exporters.broadcast.bind);
    }
    if enabled.document_store {
        println!(
            "  - document_store: {}",
            dispatcher::sinks::collection_path(&exporters.document_store.base_path, &context.namespace)
                .display()
        );
    }

    println!();
}
