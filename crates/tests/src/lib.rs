//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 契约快照（配置往返）
//! - 虚拟时间下的 模拟设备 -> 引擎 -> 遥测 全流程
//! - 实时采集流水线运行

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{IntervalTracking, SessionBlueprint};

    #[test]
    fn test_default_blueprint_round_trips() {
        let blueprint = SessionBlueprint::default();
        let toml = ConfigLoader::to_toml(&blueprint).unwrap();
        let parsed = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(parsed.device, blueprint.device);
        assert_eq!(parsed.sync, blueprint.sync);

        let json = ConfigLoader::to_json(&blueprint).unwrap();
        let parsed = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(parsed.ingestion, blueprint.ingestion);
    }

    #[test]
    fn test_partial_sync_section() {
        let blueprint = ConfigLoader::load_from_str(
            "[sync]\ninterval_tracking = \"shared\"\nresync_interval_ms = 2000.0\n",
            ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(blueprint.sync.interval_tracking, IntervalTracking::Shared);
        assert_eq!(blueprint.sync.resync_interval_ms, 2000.0);
        assert_eq!(blueprint.sync.max_acceptable_jitter_ms, 10.0);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;

    use contracts::{
        DeviceProfile, RecordingDiagnostics, ResyncReason, SensorKind, SyncEvent,
        TimestampValidationResult,
    };
    use ingestion::{Arrival, DeviceSimulator, IngestionPipeline, MockDeviceSource};
    use observability::{SyncMetricsAggregator, TelemetrySink};
    use sync_engine::{ManualClock, SyncEngine, TimeSyncConfig};

    struct Run {
        arrivals: Vec<Arrival>,
        results: Vec<TimestampValidationResult>,
        engine: SyncEngine,
        diagnostics: RecordingDiagnostics,
    }

    /// Simulate `profile` and replay it in virtual time
    fn run_virtual(profile: DeviceProfile, config: TimeSyncConfig) -> Run {
        let session = DeviceSimulator::new(profile).run();
        let clock = ManualClock::new(0.0);
        let diagnostics = RecordingDiagnostics::new();
        let mut engine = SyncEngine::with_clock(config, Arc::new(clock.clone()))
            .with_diagnostics(Arc::new(diagnostics.clone()));

        let results = session
            .arrivals
            .iter()
            .map(|arrival| {
                clock.set(arrival.host_time_ms);
                engine.normalize_timestamp(arrival.sample.device_timestamp, arrival.sample.sensor)
            })
            .collect();

        Run {
            arrivals: session.arrivals,
            results,
            engine,
            diagnostics,
        }
    }

    /// End-to-end: ideal device -> engine -> aggregator
    ///
    /// Every sample is valid, spacing matches the nominal rate, and the
    /// session stays healthy without any resync.
    #[test]
    fn test_e2e_ideal_device() {
        let run = run_virtual(
            DeviceProfile {
                duration_s: 4.0,
                ..Default::default()
            },
            TimeSyncConfig::default(),
        );

        let mut aggregator = SyncMetricsAggregator::new();
        for result in &run.results {
            aggregator.update(result);
        }
        aggregator.observe_state(&run.engine.metrics());
        let summary = aggregator.summary();

        assert_eq!(summary.total_samples, 1000 + 200 + 120);
        assert_eq!(summary.invalid_samples, 0);
        assert!(summary.issue_counts.is_empty());
        for sensor in &summary.sensors {
            let expected = sensor.sensor.expected_interval_ms();
            assert!((sensor.spacing_ms.mean - expected).abs() < 1e-6);
            assert!(sensor.spacing_ms.std_dev < 1e-6);
        }
        assert!(run.engine.sync_status().is_healthy);
        assert_eq!(run.diagnostics.resync_count(), 0);
    }

    /// Accelerometer cracking is removed: corrected ACC timestamps sit on
    /// the 30 Hz grid even though raw stamps alternate short/long spacing.
    #[test]
    fn test_e2e_acc_cracking_corrected() {
        let run = run_virtual(
            DeviceProfile {
                duration_s: 3.0,
                acc_cracking: true,
                ..Default::default()
            },
            TimeSyncConfig::default(),
        );

        let expected = SensorKind::Acc.expected_interval_ms();
        let acc: Vec<f64> = run
            .results
            .iter()
            .filter(|r| r.sensor == SensorKind::Acc)
            .map(|r| r.corrected_timestamp)
            .collect();
        assert_eq!(acc.len(), 90);
        for pair in acc.windows(2) {
            assert!((pair[1] - pair[0] - expected).abs() < 1e-6);
        }

        let snapped = run
            .results
            .iter()
            .filter(|r| r.has_issue("cracking corrected"))
            .count();
        assert!(snapped >= 80);
        assert!(run.results.iter().all(|r| r.is_valid));
        assert_eq!(run.diagnostics.resync_count(), 0);
    }

    /// A drifting device clock keeps triggering drift resyncs, which keeps
    /// normalized timestamps locked to host arrival time.
    #[test]
    fn test_e2e_drift_stays_bounded() {
        let run = run_virtual(
            DeviceProfile {
                duration_s: 12.0,
                clock_drift_ms_per_s: 8.0,
                ..Default::default()
            },
            TimeSyncConfig::default(),
        );

        let events = run.diagnostics.events();
        let resyncs: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SyncEvent::Resynced {
                    reason,
                    anchor_jump_ms,
                    ..
                } => Some((*reason, *anchor_jump_ms)),
                _ => None,
            })
            .collect();
        // One drift epoch is ten 100ms drift samples
        assert!(resyncs.len() >= 8);
        assert!(resyncs.iter().all(|(reason, _)| *reason == ResyncReason::Drift));
        assert!(resyncs.iter().all(|(_, jump)| *jump > 0.0 && *jump < 12.0));

        // Without re-anchoring the lag would reach ~96ms by the end
        for (arrival, result) in run.arrivals.iter().zip(&run.results) {
            let lag = arrival.host_time_ms - result.normalized_timestamp;
            assert!(
                lag.abs() < 12.0,
                "lag {lag} at host {}",
                arrival.host_time_ms
            );
        }
        assert_eq!(run.engine.metrics().resync_count as usize, resyncs.len());
    }

    fn count_resyncs(run: &Run, wanted: ResyncReason) -> usize {
        run.diagnostics
            .events()
            .iter()
            .filter(|e| matches!(e, SyncEvent::Resynced { reason, .. } if *reason == wanted))
            .count()
    }

    /// Transport jitter on a steady clock never reads as drift
    #[test]
    fn test_e2e_transport_jitter_is_not_drift() {
        let profile = DeviceProfile {
            duration_s: 10.0,
            transport_jitter_ms: 3.0,
            seed: 11,
            ..Default::default()
        };
        let run = run_virtual(profile.clone(), TimeSyncConfig::default());

        assert_eq!(count_resyncs(&run, ResyncReason::Drift), 0);
        assert!(count_resyncs(&run, ResyncReason::Interval) >= 1);
        assert!(!run.results.iter().any(|r| r.has_issue("drift exceeded")));
        assert!(run.results.iter().all(|r| r.is_valid));
        assert!(run.engine.metrics().drift_rate.abs() < 2.0);

        // Per-packet drift samples take the same jitter for drift
        let per_packet = run_virtual(
            profile,
            TimeSyncConfig {
                drift_sample_period_ms: 0.0,
                ..Default::default()
            },
        );
        assert!(count_resyncs(&per_packet, ResyncReason::Drift) > 0);
    }

    /// A fast device clock makes every periodic resync pull normalized time
    /// back; each stream's output still never decreases.
    #[test]
    fn test_e2e_fast_clock_output_never_steps_back() {
        let run = run_virtual(
            DeviceProfile {
                duration_s: 12.0,
                clock_drift_ms_per_s: -4.0,
                ..Default::default()
            },
            TimeSyncConfig::default(),
        );

        assert_eq!(count_resyncs(&run, ResyncReason::Drift), 0);
        assert_eq!(count_resyncs(&run, ResyncReason::Interval), 2);
        assert!(run.diagnostics.events().iter().all(|e| match e {
            SyncEvent::Resynced { anchor_jump_ms, .. } => *anchor_jump_ms < -15.0,
            _ => true,
        }));

        for sensor in SensorKind::ALL {
            let corrected: Vec<f64> = run
                .results
                .iter()
                .filter(|r| r.sensor == sensor)
                .map(|r| r.corrected_timestamp)
                .collect();
            for pair in corrected.windows(2) {
                assert!(pair[1] >= pair[0], "{sensor} stepped back {} -> {}", pair[0], pair[1]);
            }
        }

        let held = run.results.iter().filter(|r| r.has_issue("resync hold")).count();
        assert!(held > 0);
        assert!(run.results.iter().all(|r| r.is_valid));
    }

    /// Late deliveries are flagged as past timestamps and never feed the
    /// drift estimate.
    #[test]
    fn test_e2e_late_delivery_flagged() {
        let profile = DeviceProfile {
            sensors: vec![SensorKind::Ppg, SensorKind::Acc],
            duration_s: 20.0,
            reorder_probability: 0.03,
            seed: 7,
            ..Default::default()
        };
        let delayed = DeviceSimulator::new(profile.clone()).run().total_delayed();
        let run = run_virtual(profile, TimeSyncConfig::default());

        let state = run.engine.metrics();
        assert!(delayed > 0);
        assert!(state.out_of_order_packets > 0);
        assert!(state.out_of_order_packets <= delayed);
        // Back-to-back delays and the stream tail can hide a few
        assert!(state.out_of_order_packets * 4 >= delayed * 3);

        let past: Vec<_> = run
            .results
            .iter()
            .filter(|r| r.has_issue("past timestamp"))
            .collect();
        assert_eq!(past.len() as u64, state.out_of_order_packets);
        assert!(past.iter().all(|r| !r.is_valid));

        // Only periodic resyncs: late samples never look like drift
        let drift_resyncs = run
            .diagnostics
            .events()
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    SyncEvent::Resynced {
                        reason: ResyncReason::Drift,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(drift_resyncs, 0);
    }

    /// Reset then replay gives the same results as a fresh engine
    #[test]
    fn test_e2e_reset_replays_identically() {
        let profile = DeviceProfile {
            duration_s: 2.0,
            clock_drift_ms_per_s: 3.0,
            acc_cracking: true,
            ..Default::default()
        };
        let session = DeviceSimulator::new(profile).run();
        let clock = ManualClock::new(0.0);
        let mut engine = SyncEngine::with_clock(TimeSyncConfig::default(), Arc::new(clock.clone()))
            .with_diagnostics(Arc::new(TelemetrySink::with_session("reset")));

        let replay = |engine: &mut SyncEngine| -> Vec<TimestampValidationResult> {
            session
                .arrivals
                .iter()
                .map(|a| {
                    clock.set(a.host_time_ms);
                    engine.normalize_timestamp(a.sample.device_timestamp, a.sample.sensor)
                })
                .collect()
        };

        let first = replay(&mut engine);
        let state = engine.metrics();
        engine.reset();
        assert!(!engine.is_initialized());
        let second = replay(&mut engine);

        assert_eq!(first, second);
        assert_eq!(state, engine.metrics());
    }

    /// End-to-end through the ingestion pipeline on the wall clock
    #[tokio::test]
    async fn test_e2e_realtime_pipeline() {
        let profile = DeviceProfile {
            sensors: vec![SensorKind::Eeg, SensorKind::Ppg],
            duration_s: 0.5,
            ..Default::default()
        };
        let source = MockDeviceSource::from_profile(&profile).unpaced();
        let expected = source.len();

        let mut pipeline = IngestionPipeline::new(1024);
        pipeline.register_source(Box::new(source), None).unwrap();
        let rx = pipeline.take_receiver().unwrap();
        pipeline.start_all();

        let mut engine = SyncEngine::new(TimeSyncConfig::default());
        let mut aggregator = SyncMetricsAggregator::new();
        for _ in 0..expected {
            let sample = rx.recv().await.unwrap();
            let result = engine.normalize_timestamp(sample.device_timestamp, sample.sensor);
            assert!(result.corrected_timestamp.is_finite());
            aggregator.update(&result);
        }
        pipeline.stop_all();

        assert_eq!(expected, 125 + 25);
        assert_eq!(aggregator.total_samples, expected as u64);
        assert_eq!(engine.metrics().total_packets, expected as u64);
        assert_eq!(pipeline.metrics().snapshot().samples_dropped, 0);
    }
}
