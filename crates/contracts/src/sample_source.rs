//! SampleSource trait - biosignal stream abstraction
//!
//! Decouples the ingestion pipeline from whatever produces samples (a real
//! BLE link in production, a simulator in tests and demos).

use std::sync::Arc;

use crate::{SensorKind, SensorSample};

/// Sample callback type
///
/// Uses `Arc` to allow callback sharing across multiple contexts.
pub type SampleCallback = Arc<dyn Fn(SensorSample) + Send + Sync>;

/// Source of samples for one or more sensor streams
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn SampleSource> = get_source();
/// source.listen(Arc::new(|sample| {
///     println!("{} @ {}", sample.sensor, sample.device_timestamp);
/// }));
/// source.stop();
/// ```
pub trait SampleSource: Send + Sync {
    /// Source name (used for logging)
    fn name(&self) -> &str;

    /// Streams this source produces
    fn sensors(&self) -> Vec<SensorKind>;

    /// Register data callback
    ///
    /// Repeated calls while already listening are ignored.
    fn listen(&self, callback: SampleCallback);

    /// Stop producing samples
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
