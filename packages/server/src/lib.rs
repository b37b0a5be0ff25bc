// Interface Exception Collector - lifecycle core
//
// Validated status transitions, an audited mutation pipeline and a filtered
// fan-out of lifecycle events to live subscribers.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
