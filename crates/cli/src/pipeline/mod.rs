//! Session orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{RunMode, SessionConfig, SessionRunner};
pub use stats::SessionReport;
