//! Profile validation
//!
//! Rules:
//! - dispatcher name non-empty, capacity >= 1
//! - producers, items_per_producer, chunk_size >= 1
//! - chunk_size <= items_per_producer
//! - fail_every of 1 would fail every batch and is rejected

use contracts::{BenchProfile, ContractError};
use validator::Validate;

/// Validate a profile, returning the first error found
pub fn validate(profile: &BenchProfile) -> Result<(), ContractError> {
    profile
        .dispatcher
        .check()
        .map_err(|e| prefix_field("dispatcher", e))?;
    validate_load(profile)?;
    validate_processor(profile)?;
    Ok(())
}

fn validate_load(profile: &BenchProfile) -> Result<(), ContractError> {
    let load = &profile.load;
    if let Err(errors) = load.validate() {
        let field = errors
            .field_errors()
            .into_keys()
            .next()
            .map(|f| f.to_string())
            .unwrap_or_default();
        return Err(ContractError::config_validation(
            format!("load.{field}"),
            "must be >= 1",
        ));
    }

    if load.chunk_size > load.items_per_producer {
        return Err(ContractError::config_validation(
            "load.chunk_size",
            format!(
                "chunk_size ({}) must be <= items_per_producer ({})",
                load.chunk_size, load.items_per_producer
            ),
        ));
    }
    Ok(())
}

fn validate_processor(profile: &BenchProfile) -> Result<(), ContractError> {
    if profile.processor.fail_every == 1 {
        return Err(ContractError::config_validation(
            "processor.fail_every",
            "fail_every = 1 fails every batch; use 0 to disable failures",
        ));
    }
    Ok(())
}

fn prefix_field(prefix: &str, err: ContractError) -> ContractError {
    match err {
        ContractError::ConfigValidation { field, message } => {
            ContractError::config_validation(format!("{prefix}.{field}"), message)
        }
        other => other,
    }
}
