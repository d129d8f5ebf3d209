//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{IntervalTracking, SensorKind, SessionBlueprint, TimeSyncConfig};
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    session_id: String,
    device: DeviceInfo,
    streams: Vec<StreamInfo>,
    thresholds: TimeSyncConfig,
}

#[derive(Serialize)]
struct DeviceInfo {
    name: String,
    duration_s: f64,
    clock_drift_ms_per_s: f64,
    base_latency_ms: f64,
    transport_jitter_ms: f64,
    acc_cracking: bool,
}

#[derive(Serialize)]
struct StreamInfo {
    sensor: SensorKind,
    enabled: bool,
    rate_hz: f64,
    expected_interval_ms: f64,
    /// Gap beyond which samples count as lost
    loss_gap_ms: f64,
    /// Deviation beyond which accelerometer samples are snapped
    #[serde(skip_serializing_if = "Option::is_none")]
    snap_deviation_ms: Option<f64>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    if let Some(ref path) = args.config {
        info!(config = %path.display(), "Loading configuration info");
    }

    let blueprint = load_blueprint(args.config.as_deref())?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn build_config_info(blueprint: &SessionBlueprint) -> ConfigInfo {
    let device = &blueprint.device;
    let streams = SensorKind::ALL
        .iter()
        .map(|&sensor| {
            let expected = sensor.expected_interval_ms();
            StreamInfo {
                sensor,
                enabled: device.sensors.contains(&sensor),
                rate_hz: sensor.nominal_rate_hz(),
                expected_interval_ms: expected,
                loss_gap_ms: 2.0 * expected,
                snap_deviation_ms: (sensor == SensorKind::Acc)
                    .then(|| blueprint.sync.cracking_tolerance * expected),
            }
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        session_id: blueprint.session_id.clone(),
        device: DeviceInfo {
            name: device.name.clone(),
            duration_s: device.duration_s,
            clock_drift_ms_per_s: device.clock_drift_ms_per_s,
            base_latency_ms: device.base_latency_ms,
            transport_jitter_ms: device.transport_jitter_ms,
            acc_cracking: device.acc_cracking,
        },
        streams,
        thresholds: blueprint.sync.clone(),
    }
}

fn print_config_info(blueprint: &SessionBlueprint) {
    let info = build_config_info(blueprint);

    println!("=== biosync configuration ===\n");
    println!("Session: {} ({})", info.session_id, info.version);

    let device = &info.device;
    println!("\nDevice: {}", device.name);
    println!("  Duration: {:.1}s", device.duration_s);
    println!("  Clock drift: {:+.2}ms/s", device.clock_drift_ms_per_s);
    println!(
        "  Latency: {:.1}ms +/- {:.1}ms",
        device.base_latency_ms, device.transport_jitter_ms
    );
    println!("  ACC cracking: {}", if device.acc_cracking { "on" } else { "off" });

    println!("\nStreams");
    for stream in &info.streams {
        let state = if stream.enabled { "enabled" } else { "disabled" };
        print!(
            "  {}: {:.0} Hz, interval {:.3}ms, loss gap {:.3}ms",
            stream.sensor, stream.rate_hz, stream.expected_interval_ms, stream.loss_gap_ms
        );
        if let Some(snap) = stream.snap_deviation_ms {
            print!(", snap beyond {:.3}ms", snap);
        }
        println!(" [{state}]");
    }

    let sync = &info.thresholds;
    println!("\nThresholds");
    println!("  Max jitter: {:.1}ms", sync.max_acceptable_jitter_ms);
    println!("  Max drift: {:.1}ms/s", sync.max_acceptable_drift_ms_per_s);
    println!("  Resync interval: {:.0}ms", sync.resync_interval_ms);
    println!(
        "  Drift history: {} samples, slope over last {}",
        sync.drift_history_capacity, sync.drift_rate_window
    );
    println!("  Drift sample period: {:.0}ms", sync.drift_sample_period_ms);
    println!("  Smoothing factor: {}", sync.smoothing_factor);
    println!("  Healthy quality: > {:.2}", sync.healthy_quality_threshold);
    println!("  Min sensor reliability: {:.2}", sync.min_sensor_reliability);
    let tracking = match sync.interval_tracking {
        IntervalTracking::PerSensor => "per sensor",
        IntervalTracking::Shared => "shared",
    };
    println!("  Interval tracking: {tracking}");

    println!();
}
