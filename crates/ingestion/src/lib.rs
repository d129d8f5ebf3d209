//! # Ingestion Pipeline
//!
//! Biosignal sample ingestion module.
//!
//! Responsibilities:
//! - Register sample sources (simulated or real devices)
//! - Reject samples with unusable timestamps
//! - Backpressure management and drop policy
//! - Send to downstream via async-channel
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngestionPipeline, MockDeviceSource};
//!
//! let mut pipeline = IngestionPipeline::from_settings(blueprint.ingestion);
//! pipeline.register_source(Box::new(MockDeviceSource::from_profile(&blueprint.device)), None)?;
//!
//! let rx = pipeline.take_receiver().unwrap();
//! pipeline.start_all();
//! while let Ok(sample) = rx.recv().await {
//!     engine.normalize_timestamp(sample.device_timestamp, sample.sensor);
//! }
//! ```
//!
//! ## Offline Simulation
//!
//! ```ignore
//! use ingestion::DeviceSimulator;
//!
//! let session = DeviceSimulator::new(profile).with_host_start(0.0).run();
//! for arrival in &session.arrivals {
//!     clock.set(arrival.host_time_ms);
//!     engine.normalize_timestamp(arrival.sample.device_timestamp, arrival.sample.sensor);
//! }
//! ```

mod adapter;
mod config;
mod error;
mod generic_adapter;
mod mock;
mod pipeline;
mod send;
mod simulator;

// Re-exports
pub use adapter::SourceAdapter;
pub use config::{BackpressureConfig, DropPolicy, IngestionMetrics, MetricsSnapshot};
pub use contracts::SensorSample;
pub use error::{IngestionError, Result};
pub use generic_adapter::GenericSourceAdapter;
pub use mock::MockDeviceSource;
pub use pipeline::IngestionPipeline;
pub use send::send_sample;
pub use simulator::{Arrival, DeviceSimulator, SimulatedSession};
