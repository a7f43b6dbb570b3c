//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{HttpAuth, LoggerBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    logger: LoggerInfo,
    tag_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<TagInfo>,
    exporters: Vec<ExporterInfo>,
}

#[derive(Serialize)]
struct LoggerInfo {
    name: String,
    namespace: String,
    source_url: String,
    generate_cert: bool,
}

#[derive(Serialize)]
struct TagInfo {
    tag_id: String,
    display_name: String,
    metric_kind: String,
}

#[derive(Serialize)]
struct ExporterInfo {
    name: &'static str,
    enabled: bool,
    target: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint, args.tags);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &LoggerBlueprint, with_tags: bool) -> ConfigInfo {
    let namespace = blueprint.publish_context().namespace;
    let exporters = &blueprint.exporters;
    let enabled = blueprint.enabled_sinks();

    let tags = if with_tags {
        blueprint
            .tags
            .iter()
            .map(|t| TagInfo {
                tag_id: t.tag_id.to_string(),
                display_name: t.display_name.clone(),
                metric_kind: format!("{:?}", t.metric_kind).to_lowercase(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let auth = match &exporters.http.auth {
        HttpAuth::None => "no auth",
        HttpAuth::Basic { .. } => "basic auth",
        HttpAuth::Bearer { .. } => "bearer auth",
    };

    let exporters = vec![
        ExporterInfo {
            name: "metrics",
            enabled: enabled.metrics,
            target: format!(
                "http://{}{}",
                exporters.metrics.bind,
                observability::metrics_path(&namespace)
            ),
        },
        ExporterInfo {
            name: "http",
            enabled: enabled.http,
            target: format!("POST {} ({auth})", exporters.http.url),
        },
        ExporterInfo {
            name: "broadcast",
            enabled: enabled.broadcast,
            target: format!("ws://{}/ws", exporters.broadcast.bind),
        },
        ExporterInfo {
            name: "document_store",
            enabled: enabled.document_store,
            target: dispatcher::sinks::collection_path(
                &exporters.document_store.base_path,
                &namespace,
            )
            .display()
            .to_string(),
        },
    ];

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        logger: LoggerInfo {
            name: blueprint.logger.name.clone(),
            namespace,
            source_url: blueprint.source.url.clone(),
            generate_cert: blueprint.source.generate_cert,
        },
        tag_count: blueprint.tags.len(),
        tags,
        exporters,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Tag Logger Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("Logger");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Name: {}", info.logger.name);
    println!("   ├─ Namespace: {}", info.logger.namespace);
    println!("   ├─ Source: {}", info.logger.source_url);
    println!("   └─ Generate cert: {}", info.logger.generate_cert);

    println!("\nTags ({})", info.tag_count);
    for (i, tag) in info.tags.iter().enumerate() {
        let prefix = if i == info.tags.len() - 1 { "└─" } else { "├─" };
        println!(
            "   {} {} ({}, {})",
            prefix, tag.tag_id, tag.display_name, tag.metric_kind
        );
    }

    println!("\nExporters");
    for (i, exporter) in info.exporters.iter().enumerate() {
        let prefix = if i == info.exporters.len() - 1 { "└─" } else { "├─" };
        let state = if exporter.enabled { "on " } else { "off" };
        println!("   {} [{}] {}: {}", prefix, state, exporter.name, exporter.target);
    }

    println!();
}
