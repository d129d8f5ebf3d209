//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{SensorKind, SessionBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    session_id: String,
    device: String,
    sensors: Vec<SensorKind>,
    duration_s: f64,
    expected_samples: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: Vec::new(),
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: collect_warnings(&blueprint),
            summary: Some(ConfigSummary {
                version: format!("{:?}", blueprint.version),
                session_id: blueprint.session_id.clone(),
                device: blueprint.device.name.clone(),
                sensors: blueprint.device.sensors.clone(),
                duration_s: blueprint.device.duration_s,
                expected_samples: blueprint
                    .device
                    .sensors
                    .iter()
                    .map(|s| (blueprint.device.duration_s * s.nominal_rate_hz()).floor() as u64)
                    .sum(),
            }),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &SessionBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let device = &blueprint.device;
    let sync = &blueprint.sync;

    if device.acc_cracking && !device.sensors.contains(&SensorKind::Acc) {
        warnings.push("device.acc_cracking has no effect without the acc sensor".to_string());
    }

    if device.clock_drift_ms_per_s.abs() > sync.max_acceptable_drift_ms_per_s {
        warnings.push(format!(
            "device clock drift ({:+.1}ms/s) exceeds sync.max_acceptable_drift_ms_per_s ({:.1}) - expect drift resyncs",
            device.clock_drift_ms_per_s, sync.max_acceptable_drift_ms_per_s
        ));
    }

    if device.transport_jitter_ms > sync.max_acceptable_jitter_ms {
        warnings.push(format!(
            "transport jitter ({:.1}ms) exceeds sync.max_acceptable_jitter_ms ({:.1}) - drift estimates will be noisy",
            device.transport_jitter_ms, sync.max_acceptable_jitter_ms
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("OK   Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Session: {}", summary.session_id);
            println!("  Device: {}", summary.device);
            println!("  Sensors: {:?}", summary.sensors);
            println!("  Duration: {:.1}s", summary.duration_s);
            println!("  Expected samples: {}", summary.expected_samples);
        }

        if !result.warnings.is_empty() {
            println!("\nWarnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("FAIL Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
