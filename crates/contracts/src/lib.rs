//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the workspace.
//! Business crates depend only on this crate, never on each other's internals.
//!
//! ## Time Model
//! - Device timestamps: milliseconds of the wearable's onboard clock
//! - Host time: milliseconds of the ingesting system's clock, the canonical base
//! - Every timestamp an engine hands out is host-relative

mod blueprint;
mod diagnostics;
mod error;
mod sample_source;
mod sensor;
mod sync;
mod sync_engine_config;

pub use blueprint::*;
pub use diagnostics::*;
pub use error::*;
pub use sample_source::{SampleCallback, SampleSource};
pub use sensor::*;
pub use sync::*;
pub use sync_engine_config::*;
