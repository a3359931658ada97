//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Monotonic clock (`std::time::Instant`) only
//! - Delays are whole milliseconds in configuration, `Duration` in code

mod config;
mod error;
mod processor;
mod profile;
mod scheduler;

pub use config::*;
pub use error::*;
pub use processor::BatchProcessor;
pub use profile::*;
pub use scheduler::{ErrorHook, ScheduledTask, Scheduler, Task};
