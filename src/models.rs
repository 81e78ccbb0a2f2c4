use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;

use crate::error::DecodeError;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// One GPU as reported by the producer.
#[derive(Clone, Debug, PartialEq)]
pub struct GpuSample {
    pub id: u32,
    pub name: String,
    pub total_memory: f64,
    pub memory_allocated: f64,
    pub utilization: f64,
}

impl GpuSample {
    /// Allocated over total memory. Zero when the device reports no capacity.
    pub fn memory_ratio(&self) -> f64 {
        if self.total_memory <= 0.0 {
            return 0.0;
        }
        self.memory_allocated / self.total_memory
    }
}

/// One decoded metrics record. Never mutated after decoding.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub gpu_info: Vec<GpuSample>,
    pub active_sessions: u64,
}

#[derive(Deserialize)]
struct WireGpu {
    id: u32,
    name: String,
    total_memory: f64,
    memory_allocated: f64,
    utilization: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireTimestamp {
    UnixSeconds(f64),
    Rfc3339(String),
}

#[derive(Deserialize)]
struct WireSnapshot {
    cpu_percent: f64,
    memory_percent: f64,
    gpu_info: Vec<WireGpu>,
    active_sessions: u64,
    #[serde(default)]
    timestamp: Option<WireTimestamp>,
}

impl MetricsSnapshot {
    /// Decodes one feed payload, checking it against the snapshot schema.
    ///
    /// Snapshots without a `timestamp` are stamped with `received_at`.
    pub fn decode(payload: &str, received_at: DateTime<Utc>) -> Result<Self, DecodeError> {
        let wire: WireSnapshot = serde_json::from_str(payload)?;

        finite("cpu_percent", wire.cpu_percent)?;
        finite("memory_percent", wire.memory_percent)?;

        let mut seen = HashSet::with_capacity(wire.gpu_info.len());
        let mut gpu_info = Vec::with_capacity(wire.gpu_info.len());
        for gpu in wire.gpu_info {
            if !seen.insert(gpu.id) {
                return Err(DecodeError::DuplicateGpu(gpu.id));
            }
            non_negative(&format!("gpu_info[{}].total_memory", gpu.id), gpu.total_memory)?;
            non_negative(
                &format!("gpu_info[{}].memory_allocated", gpu.id),
                gpu.memory_allocated,
            )?;
            finite(&format!("gpu_info[{}].utilization", gpu.id), gpu.utilization)?;
            gpu_info.push(GpuSample {
                id: gpu.id,
                name: gpu.name,
                total_memory: gpu.total_memory,
                memory_allocated: gpu.memory_allocated,
                utilization: gpu.utilization,
            });
        }

        let timestamp = match wire.timestamp {
            None => received_at,
            Some(ts) => parse_timestamp(ts)?,
        };

        Ok(MetricsSnapshot {
            timestamp,
            cpu_percent: wire.cpu_percent,
            memory_percent: wire.memory_percent,
            gpu_info,
            active_sessions: wire.active_sessions,
        })
    }

    pub fn gpu(&self, id: u32) -> Option<&GpuSample> {
        self.gpu_info.iter().find(|g| g.id == id)
    }
}

/// Formats a byte count as gigabytes with two decimals, e.g. `1.50GB`.
pub fn format_gb(bytes: f64) -> String {
    format!("{:.2}GB", bytes / BYTES_PER_GB)
}

fn finite(field: &str, value: f64) -> Result<(), DecodeError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DecodeError::NonFinite {
            field: field.to_string(),
        })
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), DecodeError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(DecodeError::Negative {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

fn parse_timestamp(ts: WireTimestamp) -> Result<DateTime<Utc>, DecodeError> {
    match ts {
        WireTimestamp::UnixSeconds(secs) => {
            if !secs.is_finite() {
                return Err(DecodeError::Timestamp(secs.to_string()));
            }
            let whole = secs.floor();
            let nanos = (((secs - whole) * 1e9).round() as u32).min(999_999_999);
            DateTime::from_timestamp(whole as i64, nanos)
                .ok_or_else(|| DecodeError::Timestamp(secs.to_string()))
        }
        WireTimestamp::Rfc3339(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| DecodeError::Timestamp(text)),
    }
}
