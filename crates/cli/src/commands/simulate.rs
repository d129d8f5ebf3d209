//! `simulate` command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use contracts::SessionBlueprint;
use tracing::{info, warn};

use super::load_blueprint;
use crate::cli::SimulateArgs;
use crate::pipeline::{RunMode, SessionConfig, SessionRunner};

/// Execute the `simulate` command
pub async fn run_simulate(args: &SimulateArgs) -> Result<()> {
    let mut blueprint = load_blueprint(args.config.as_deref())?;
    apply_overrides(&mut blueprint, args);

    config_loader::ConfigLoader::validate(&blueprint)
        .context("Invalid session after command-line overrides")?;

    let mode = if args.realtime {
        RunMode::Realtime { speed: args.speed }
    } else {
        RunMode::Virtual
    };

    let runner = SessionRunner::new(SessionConfig {
        blueprint,
        mode,
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    let shutdown_signal = setup_shutdown_signal();

    tokio::select! {
        result = runner.run() => {
            let report = result.context("Session failed")?;
            if args.json {
                let json = serde_json::to_string_pretty(&report)
                    .context("Failed to serialize session report")?;
                println!("{}", json);
            } else {
                report.print_summary();
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping session...");
        }
    }

    Ok(())
}

/// Apply command-line overrides to the loaded blueprint
fn apply_overrides(blueprint: &mut SessionBlueprint, args: &SimulateArgs) {
    let device = &mut blueprint.device;

    if let Some(duration) = args.duration {
        info!(duration, "Overriding session duration from CLI");
        device.duration_s = duration;
    }
    if let Some(drift) = args.drift {
        info!(drift, "Overriding clock drift from CLI");
        device.clock_drift_ms_per_s = drift;
    }
    if let Some(jitter) = args.jitter {
        info!(jitter, "Overriding transport jitter from CLI");
        device.transport_jitter_ms = jitter;
    }
    if let Some(loss) = args.loss {
        device.loss_probability = loss;
    }
    if let Some(reorder) = args.reorder {
        device.reorder_probability = reorder;
    }
    if let Some(seed) = args.seed {
        device.seed = seed;
    }
    if args.acc_cracking {
        device.acc_cracking = true;
    }
    if let Some(ref sensors) = args.sensors {
        device.sensors = sensors.clone();
    }
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves; the session then
/// simply runs to completion.
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use contracts::SensorKind;

    fn simulate_args(argv: &[&str]) -> SimulateArgs {
        let mut full = vec!["biosync", "simulate"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Simulate(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_overrides_applied() {
        let args = simulate_args(&[
            "--duration",
            "3",
            "--drift",
            "7.5",
            "--seed",
            "9",
            "--acc-cracking",
            "--sensors",
            "acc",
        ]);
        let mut blueprint = SessionBlueprint::default();
        apply_overrides(&mut blueprint, &args);

        assert_eq!(blueprint.device.duration_s, 3.0);
        assert_eq!(blueprint.device.clock_drift_ms_per_s, 7.5);
        assert_eq!(blueprint.device.seed, 9);
        assert!(blueprint.device.acc_cracking);
        assert_eq!(blueprint.device.sensors, vec![SensorKind::Acc]);
    }

    #[test]
    fn test_no_overrides_keeps_defaults() {
        let args = simulate_args(&[]);
        let mut blueprint = SessionBlueprint::default();
        apply_overrides(&mut blueprint, &args);
        assert_eq!(blueprint.device, SessionBlueprint::default().device);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = simulate_args(&["--loss", "2.0"]);
        let mut blueprint = SessionBlueprint::default();
        apply_overrides(&mut blueprint, &args);
        assert!(config_loader::ConfigLoader::validate(&blueprint).is_err());
    }
}
