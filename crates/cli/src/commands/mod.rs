//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_bench;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::BenchProfile;
use tracing::info;

use crate::cli::ProfileOverrides;
use crate::error::CliError;

/// Load the profile (or defaults), apply overrides and validate the result
pub(crate) fn load_profile(
    path: Option<&Path>,
    overrides: &ProfileOverrides,
) -> Result<BenchProfile> {
    let mut profile = match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()).into());
            }
            info!(config = %path.display(), "Loading profile");
            ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load profile from {}", path.display()))?
        }
        None => {
            info!("No profile given, using defaults");
            BenchProfile::default()
        }
    };

    apply_overrides(&mut profile, overrides);
    ConfigLoader::validate(&profile)
        .map_err(|e| CliError::config_validation(e.to_string()))?;
    Ok(profile)
}

fn apply_overrides(profile: &mut BenchProfile, overrides: &ProfileOverrides) {
    if let Some(capacity) = overrides.capacity {
        info!(capacity, "Overriding capacity from CLI");
        profile.dispatcher.capacity = capacity;
    }
    if let Some(delay_ms) = overrides.delay_ms {
        info!(delay_ms, "Overriding delay from CLI");
        profile.dispatcher.delay_ms = delay_ms;
    }
    if let Some(producers) = overrides.producers {
        info!(producers, "Overriding producers from CLI");
        profile.load.producers = producers;
    }
    if let Some(items) = overrides.items {
        info!(items, "Overriding items per producer from CLI");
        profile.load.items_per_producer = items;
        profile.load.chunk_size = profile.load.chunk_size.min(items.max(1));
    }
    if let Some(scheduler) = overrides.scheduler {
        profile.scheduler = scheduler.into();
    }
}
