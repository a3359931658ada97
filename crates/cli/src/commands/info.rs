//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::BenchProfile;
use serde::Serialize;
use tracing::info;

use crate::cli::{InfoArgs, ProfileOverrides};

use super::load_profile;

/// Derived figures shown next to the profile
#[derive(Serialize)]
struct ProfileInfo<'a> {
    profile: &'a BenchProfile,
    total_items: usize,
    /// Fewest batches a complete run needs
    min_batches: usize,
    /// Lower bound on run time when flushes are back to back (ms)
    paced_duration_ms: u64,
}

impl<'a> ProfileInfo<'a> {
    fn new(profile: &'a BenchProfile) -> Self {
        let total_items = profile.load.total_items();
        let min_batches = total_items.div_ceil(profile.dispatcher.capacity.max(1));
        Self {
            profile,
            total_items,
            min_batches,
            paced_duration_ms: (min_batches.saturating_sub(1) as u64)
                .saturating_mul(profile.dispatcher.delay_ms),
        }
    }
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!("Loading profile info");

    let profile = load_profile(args.config.as_deref(), &ProfileOverrides::default())?;
    let info = ProfileInfo::new(&profile);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize profile info")?;
        println!("{}", json);
    } else if args.toml {
        println!("{}", config_loader::ConfigLoader::to_toml(&profile)?);
    } else {
        print_profile_info(&info);
    }

    Ok(())
}

fn print_profile_info(info: &ProfileInfo<'_>) {
    let profile = info.profile;
    println!("=== Bench Profile ===\n");

    println!("Dispatcher");
    println!("   ├─ Name: {}", profile.dispatcher.name);
    println!("   ├─ Capacity: {}", profile.dispatcher.capacity);
    println!("   ├─ Delay: {} ms", profile.dispatcher.delay_ms);
    println!("   └─ Scheduler: {:?}", profile.scheduler);

    let load = &profile.load;
    println!("\nLoad");
    println!("   ├─ Producers: {}", load.producers);
    println!("   ├─ Items per producer: {}", load.items_per_producer);
    println!("   ├─ Chunk size: {}", load.chunk_size);
    println!("   ├─ Interval: {} ms", load.interval_ms);
    println!("   └─ Payload: {} bytes", load.payload_bytes);

    println!("\nProcessor");
    println!("   ├─ Work per item: {} us", profile.processor.work_per_item_us);
    match profile.processor.fail_every {
        0 => println!("   └─ Failures: never"),
        n => println!("   └─ Failures: every {n}th batch"),
    }

    println!("\nEstimates");
    println!("   ├─ Total items: {}", info.total_items);
    println!("   ├─ Minimum batches: {}", info.min_batches);
    println!("   └─ Paced duration: >= {} ms", info.paced_duration_ms);
    println!();
}
