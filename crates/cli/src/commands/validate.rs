//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::BenchProfile;
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
    summary: Option<ProfileSummary>,
}

#[derive(Serialize)]
struct ProfileSummary {
    dispatcher: String,
    capacity: usize,
    delay_ms: u64,
    scheduler: String,
    producers: usize,
    total_items: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating profile");

    let result = validate_profile(args);

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
        anyhow::bail!("Profile validation failed")
    }
}

fn validate_profile(args: &ValidateArgs) -> ValidationResult {
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
        Ok(profile) => {
            let warnings = collect_warnings(&profile);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ProfileSummary {
                    dispatcher: profile.dispatcher.name.clone(),
                    capacity: profile.dispatcher.capacity,
                    delay_ms: profile.dispatcher.delay_ms,
                    scheduler: format!("{:?}", profile.scheduler),
                    producers: profile.load.producers,
                    total_items: profile.load.total_items(),
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

/// Collect non-fatal profile issues
fn collect_warnings(profile: &BenchProfile) -> Vec<String> {
    let mut warnings = Vec::new();
    let dispatcher = &profile.dispatcher;
    let load = &profile.load;

    if dispatcher.delay_ms == 0 {
        warnings.push(
            "dispatcher.delay_ms is 0 - every enqueue may trigger its own flush".to_string(),
        );
    }

    if dispatcher.capacity == 1 {
        warnings.push("dispatcher.capacity is 1 - items are never batched".to_string());
    }

    if load.chunk_size > dispatcher.capacity {
        warnings.push(format!(
            "load.chunk_size ({}) exceeds capacity ({}) - chunks will be split across batches",
            load.chunk_size, dispatcher.capacity
        ));
    }

    if load.interval_ms > 0 && load.interval_ms >= dispatcher.delay_ms && dispatcher.delay_ms > 0 {
        warnings.push(
            "load.interval_ms >= dispatcher.delay_ms - producers trickle, batches stay small"
                .to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Profile is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Dispatcher: {}", summary.dispatcher);
            println!("  Capacity: {}", summary.capacity);
            println!("  Delay: {} ms", summary.delay_ms);
            println!("  Scheduler: {}", summary.scheduler);
            println!("  Producers: {}", summary.producers);
            println!("  Total items: {}", summary.total_items);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Profile is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
