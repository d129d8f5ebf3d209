//! Session orchestrator - drives samples from a simulated device through
//! the synchronization engine.
//!
//! Two modes:
//! - virtual: arrivals are replayed instantly with a `ManualClock` set to
//!   each arrival's host time, so results are deterministic
//! - realtime: a `MockDeviceSource` streams through the ingestion pipeline
//!   and the engine reads a (optionally accelerated) wall clock

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{SensorSample, SessionBlueprint};
use ingestion::{DeviceSimulator, IngestionPipeline, MockDeviceSource, SimulatedSession};
use observability::{SyncMetricsAggregator, TelemetrySink};
use sync_engine::{HostClock, ManualClock, SyncEngine, SystemClock};
use tracing::{info, warn};

use super::stats::{IngestionCounts, SimulationCounts};
use super::SessionReport;

/// Samples between metric publications
const PUBLISH_EVERY: u64 = 250;

/// Completion re-check period while the channel is idle
const IDLE_POLL: Duration = Duration::from_millis(50);

/// How samples reach the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunMode {
    Virtual,
    Realtime { speed: f64 },
}

impl RunMode {
    fn as_str(self) -> &'static str {
        match self {
            RunMode::Virtual => "virtual",
            RunMode::Realtime { .. } => "realtime",
        }
    }
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Validated session blueprint
    pub blueprint: SessionBlueprint,

    pub mode: RunMode,

    /// Realtime timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main session runner
pub struct SessionRunner {
    config: SessionConfig,
}

impl SessionRunner {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Run the session to completion
    pub async fn run(self) -> Result<SessionReport> {
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let blueprint = &self.config.blueprint;
        info!(
            session = %blueprint.session_id,
            device = %blueprint.device.name,
            sensors = ?blueprint.device.sensors,
            duration_s = blueprint.device.duration_s,
            mode = self.config.mode.as_str(),
            "Starting session"
        );

        let simulated = DeviceSimulator::new(blueprint.device.clone()).run();

        match self.config.mode {
            RunMode::Virtual => Ok(self.run_virtual(simulated)),
            RunMode::Realtime { speed } => self.run_realtime(simulated, speed).await,
        }
    }

    fn run_virtual(&self, simulated: SimulatedSession) -> SessionReport {
        let started = Instant::now();
        // Simulated host times start at zero
        let clock = ManualClock::new(0.0);
        let mut processor = SessionProcessor::new(&self.config.blueprint, Arc::new(clock.clone()));

        for arrival in &simulated.arrivals {
            clock.set(arrival.host_time_ms);
            processor.process(arrival.sample);
        }

        processor.finish(
            &self.config.blueprint,
            self.config.mode,
            started.elapsed(),
            SimulationCounts::from(&simulated),
            None,
        )
    }

    async fn run_realtime(&self, simulated: SimulatedSession, speed: f64) -> Result<SessionReport> {
        let started = Instant::now();
        let blueprint = &self.config.blueprint;
        let counts = SimulationCounts::from(&simulated);

        let source = MockDeviceSource::new(
            blueprint.device.name.clone(),
            blueprint.device.sensors.clone(),
            simulated,
        )
        .with_speed(speed);
        let expected = source.len() as u64;

        let mut ingestion = IngestionPipeline::from_settings(blueprint.ingestion);
        ingestion
            .register_source(Box::new(source), None)
            .context("Failed to register device source")?;
        let rx = ingestion
            .take_receiver()
            .context("Failed to get ingestion receiver")?;
        let metrics = ingestion.metrics();

        let clock = ScaledClock::new(speed);
        let mut processor = SessionProcessor::new(blueprint, Arc::new(clock));

        info!(expected, speed, "Streaming device session");
        ingestion.start_all();

        let processing = async {
            loop {
                let snapshot = metrics.snapshot();
                if processor.processed + snapshot.samples_dropped + snapshot.samples_rejected
                    >= expected
                {
                    break;
                }

                // Drops never wake the receiver, so completion is re-checked periodically
                tokio::select! {
                    received = rx.recv() => match received {
                        Ok(sample) => processor.process(sample),
                        Err(_) => {
                            warn!("Ingestion channel closed");
                            break;
                        }
                    },
                    _ = tokio::time::sleep(IDLE_POLL) => {}
                }
            }
        };

        match self.config.timeout {
            Some(timeout) => {
                if tokio::time::timeout(timeout, processing).await.is_err() {
                    warn!(timeout_secs = timeout.as_secs(), "Session timed out");
                }
            }
            None => processing.await,
        }

        info!("Shutting down ingestion...");
        ingestion.stop_all();

        Ok(processor.finish(
            blueprint,
            self.config.mode,
            started.elapsed(),
            counts,
            Some(IngestionCounts::from(metrics.snapshot())),
        ))
    }
}

/// Engine plus aggregation for one session
struct SessionProcessor {
    engine: SyncEngine,
    aggregator: SyncMetricsAggregator,
    processed: u64,
}

impl SessionProcessor {
    fn new(blueprint: &SessionBlueprint, clock: Arc<dyn HostClock>) -> Self {
        let engine = SyncEngine::with_clock(blueprint.sync.clone(), clock)
            .with_diagnostics(Arc::new(TelemetrySink::with_session(&blueprint.session_id)));
        Self {
            engine,
            aggregator: SyncMetricsAggregator::new(),
            processed: 0,
        }
    }

    fn process(&mut self, sample: SensorSample) {
        let result = self
            .engine
            .normalize_timestamp(sample.device_timestamp, sample.sensor);
        observability::record_validation(&result);
        self.aggregator.update(&result);
        self.processed += 1;

        if self.processed % PUBLISH_EVERY == 0 {
            self.publish();
        }
    }

    fn publish(&self) {
        observability::record_sync_state(&self.engine.metrics());
        observability::record_sync_status(&self.engine.sync_status());
        observability::record_sensor_timings(&self.engine.sensor_timings());
    }

    fn finish(
        mut self,
        blueprint: &SessionBlueprint,
        mode: RunMode,
        wall_time: Duration,
        simulation: SimulationCounts,
        ingestion: Option<IngestionCounts>,
    ) -> SessionReport {
        self.publish();
        let state = self.engine.metrics();
        self.aggregator.observe_state(&state);

        info!(
            samples = self.processed,
            resyncs = state.resync_count,
            quality = format!("{:.3}", state.sync_quality),
            "Session complete"
        );

        SessionReport {
            session_id: blueprint.session_id.clone(),
            mode: mode.as_str(),
            wall_time,
            samples_processed: self.processed,
            simulation,
            ingestion,
            validation: self.aggregator.summary(),
            state,
            status: self.engine.sync_status(),
            timings: self.engine.sensor_timings(),
        }
    }
}

/// Wall clock running `speed` times faster than real time
///
/// Keeps host and device time in step when the device replay is
/// accelerated.
#[derive(Debug)]
struct ScaledClock {
    origin: Instant,
    start_ms: f64,
    speed: f64,
}

impl ScaledClock {
    fn new(speed: f64) -> Self {
        Self {
            origin: Instant::now(),
            start_ms: SystemClock::new().now_ms(),
            speed,
        }
    }
}

impl HostClock for ScaledClock {
    fn now_ms(&self) -> f64 {
        self.start_ms + self.origin.elapsed().as_secs_f64() * 1000.0 * self.speed
    }
}
