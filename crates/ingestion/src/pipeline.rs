//! Ingestion Pipeline main entry

use std::collections::BTreeMap;
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender};
use contracts::{IngestionSettings, SampleSource, SensorSample};
use tracing::{debug, info, instrument};

use crate::adapter::SourceAdapter;
use crate::config::{BackpressureConfig, IngestionMetrics};
use crate::error::{IngestionError, Result};
use crate::generic_adapter::GenericSourceAdapter;

/// Ingestion Pipeline
///
/// Fans every registered source into one bounded channel, so the engine
/// sees a single interleaved sample stream.
pub struct IngestionPipeline {
    /// Registered adapters, keyed by source name
    adapters: BTreeMap<String, Box<dyn SourceAdapter>>,

    /// Shared metrics
    metrics: Arc<IngestionMetrics>,

    /// Sample sender (shared by all adapters)
    tx: Sender<SensorSample>,

    /// Receiver handle kept for drop-oldest eviction
    evictor: Receiver<SensorSample>,

    /// Sample receiver
    rx: Option<Receiver<SensorSample>>,

    /// Default backpressure configuration
    default_config: BackpressureConfig,
}

impl IngestionPipeline {
    /// Create new Ingestion Pipeline
    ///
    /// # Arguments
    /// * `channel_capacity` - Channel capacity
    pub fn new(channel_capacity: usize) -> Self {
        Self::with_config(BackpressureConfig {
            channel_capacity,
            ..Default::default()
        })
    }

    /// Create with custom backpressure configuration
    pub fn with_config(config: BackpressureConfig) -> Self {
        let (tx, rx) = bounded(config.channel_capacity.max(1));

        Self {
            adapters: BTreeMap::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            tx,
            evictor: rx.clone(),
            rx: Some(rx),
            default_config: config,
        }
    }

    /// Create from session settings
    pub fn from_settings(settings: IngestionSettings) -> Self {
        Self::with_config(settings.into())
    }

    /// Register a sample source
    ///
    /// # Arguments
    /// * `source` - Data source implementing `SampleSource`
    /// * `config` - Optional backpressure configuration
    ///
    /// # Errors
    /// A source with the same name is already registered.
    #[instrument(
        name = "ingestion_register_source",
        skip(self, source, config),
        fields(source = %source.name())
    )]
    pub fn register_source(
        &mut self,
        source: Box<dyn SampleSource>,
        config: Option<BackpressureConfig>,
    ) -> Result<()> {
        let name = source.name().to_string();
        if self.adapters.contains_key(&name) {
            return Err(IngestionError::DuplicateSource { source_name: name });
        }

        let adapter = GenericSourceAdapter::new(
            source,
            config.unwrap_or_else(|| self.default_config.clone()),
        );
        debug!(source = %name, sensors = ?adapter.sensors(), "registered sample source");
        self.adapters.insert(name, Box::new(adapter));
        Ok(())
    }

    /// Start all registered sources
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) {
        info!(count = self.adapters.len(), "starting all sample sources");
        for (name, adapter) in &self.adapters {
            if !adapter.is_listening() {
                debug!(source = %name, "starting adapter");
                adapter.start(self.tx.clone(), self.evictor.clone(), self.metrics.clone());
            }
        }
    }

    /// Stop all sources
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.adapters.len(), "stopping all sample sources");
        for (name, adapter) in &self.adapters {
            if adapter.is_listening() {
                debug!(source = %name, "stopping adapter");
                adapter.stop();
            }
        }
    }

    /// Get sample stream receiver
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<Receiver<SensorSample>> {
        self.rx.take()
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Get registered source count
    pub fn source_count(&self) -> usize {
        self.adapters.len()
    }

    /// Check if the named source is forwarding samples
    pub fn is_source_listening(&self, name: &str) -> bool {
        self.adapters
            .get(name)
            .map(|a| a.is_listening())
            .unwrap_or(false)
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}
