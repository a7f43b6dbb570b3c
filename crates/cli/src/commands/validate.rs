//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{HttpAuth, LoggerBlueprint, MetricKind};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    logger: String,
    namespace: String,
    tag_count: usize,
    counter_count: usize,
    exporter_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    logger: blueprint.logger.name.clone(),
                    namespace: blueprint.publish_context().namespace,
                    tag_count: blueprint.tags.len(),
                    counter_count: blueprint
                        .tags
                        .iter()
                        .filter(|t| t.metric_kind == MetricKind::Counter)
                        .count(),
                    exporter_count: blueprint.enabled_sinks().count(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &LoggerBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let exporters = &blueprint.exporters;
    let enabled = blueprint.enabled_sinks();

    if enabled.count() == 0 {
        warnings.push("No exporters enabled - readings will be dropped".to_string());
    }

    if enabled.http {
        if exporters.http.url.starts_with("http://") && exporters.http.auth != HttpAuth::None {
            warnings.push("HTTP exporter sends credentials over plain http".to_string());
        }
        if exporters.http.timeout_secs == 0 {
            warnings.push("exporters.http.timeout_secs is 0 - requests will fail immediately".to_string());
        }
    }

    if enabled.metrics && enabled.broadcast && exporters.metrics.bind == exporters.broadcast.bind {
        warnings.push(format!(
            "metrics and broadcast exporters both bind {}",
            exporters.metrics.bind
        ));
    }

    if blueprint.source.generate_cert {
        warnings.push(
            "source.generate_cert is set - certificates are generated by the OPC-UA client bootstrap"
                .to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Logger: {} (namespace {})", summary.logger, summary.namespace);
            println!(
                "  Tags: {} ({} counters)",
                summary.tag_count, summary.counter_count
            );
            println!("  Exporters enabled: {}", summary.exporter_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
