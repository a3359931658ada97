//! Processor implementations
//!
//! Contains LogProcessor and ChannelProcessor.

mod channel;
mod log;

pub use self::channel::ChannelProcessor;
pub use self::log::LogProcessor;
