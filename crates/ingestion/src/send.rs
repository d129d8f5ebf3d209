//! Channel send path with backpressure handling

use async_channel::{Receiver, Sender, TrySendError};
use contracts::{DropPolicy, SensorSample};
use metrics::counter;
use tracing::{trace, warn};

use crate::config::IngestionMetrics;
use crate::error::{IngestionError, Result};

/// Send a sample, applying the drop policy when the channel is full
///
/// `evictor` is a receiver handle on the same channel, used to discard the
/// oldest queued sample under [`DropPolicy::DropOldest`].
#[inline]
pub fn send_sample(
    tx: &Sender<SensorSample>,
    evictor: &Receiver<SensorSample>,
    sample: SensorSample,
    metrics: &IngestionMetrics,
    source_name: &str,
    drop_policy: DropPolicy,
) -> Result<()> {
    if !sample.device_timestamp.is_finite() {
        metrics.record_rejected();
        counter!(
            "biosync_ingestion_samples_rejected_total",
            "source" => source_name.to_string()
        )
        .increment(1);
        return Err(IngestionError::InvalidTimestamp {
            source_name: source_name.to_string(),
            sensor: sample.sensor,
            timestamp: sample.device_timestamp,
        });
    }

    let result = match tx.try_send(sample) {
        Ok(()) => {
            trace!(source = %source_name, sensor = %sample.sensor, "sample sent");
            Ok(())
        }
        Err(TrySendError::Full(sample)) => {
            record_drop(metrics, source_name, &sample);
            match drop_policy {
                DropPolicy::DropNewest => {
                    trace!(source = %source_name, "sample dropped (newest)");
                }
                DropPolicy::DropOldest => {
                    let _ = evictor.try_recv();
                    // Another producer may have taken the freed slot
                    if tx.try_send(sample).is_err() {
                        record_drop(metrics, source_name, &sample);
                    }
                    trace!(source = %source_name, "sample dropped (oldest)");
                }
            }
            Ok(())
        }
        Err(TrySendError::Closed(_)) => {
            warn!(source = %source_name, "channel closed");
            Err(IngestionError::ChannelClosed {
                source_name: source_name.to_string(),
            })
        }
    };

    metrics.update_queue_len(tx.len());
    result
}

fn record_drop(metrics: &IngestionMetrics, source_name: &str, sample: &SensorSample) {
    metrics.record_dropped();
    counter!(
        "biosync_ingestion_samples_dropped_total",
        "source" => source_name.to_string(),
        "sensor" => sample.sensor.as_str()
    )
    .increment(1);
}
