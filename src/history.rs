use std::collections::VecDeque;
use std::sync::Arc;

use crate::models::MetricsSnapshot;

/// Existing samples kept when a new one arrives.
pub const HISTORY_RETAINED: usize = 30;
/// Upper bound on the buffer length (retained + newly arrived).
pub const HISTORY_CAPACITY: usize = HISTORY_RETAINED + 1;

/// Oldest-first window of the most recent snapshots, used for the trend chart.
#[derive(Clone, Debug, Default)]
pub struct History {
    samples: VecDeque<Arc<MetricsSnapshot>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new buffer holding the last 30 existing samples followed by `snapshot`.
    ///
    /// `self` is left untouched; snapshots are shared, not copied.
    pub fn append(&self, snapshot: Arc<MetricsSnapshot>) -> History {
        let skip = self.samples.len().saturating_sub(HISTORY_RETAINED);
        let mut samples = VecDeque::with_capacity(HISTORY_CAPACITY);
        samples.extend(self.samples.iter().skip(skip).cloned());
        samples.push_back(snapshot);
        History { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<MetricsSnapshot>> {
        self.samples.iter()
    }

    pub fn oldest(&self) -> Option<&Arc<MetricsSnapshot>> {
        self.samples.front()
    }

    pub fn latest(&self) -> Option<&Arc<MetricsSnapshot>> {
        self.samples.back()
    }

    /// Seconds between the oldest and newest sample.
    pub fn span_secs(&self) -> f64 {
        match (self.oldest(), self.latest()) {
            (Some(first), Some(last)) => offset_secs(first, last),
            _ => 0.0,
        }
    }

    /// Chart points `(seconds since oldest, value)`.
    ///
    /// Samples for which `value` yields `None` or a non-finite number are skipped.
    pub fn series<F>(&self, value: F) -> Vec<(f64, f64)>
    where
        F: Fn(&MetricsSnapshot) -> Option<f64>,
    {
        let Some(first) = self.oldest() else {
            return Vec::new();
        };
        self.iter()
            .filter_map(|snap| {
                let v = value(snap)?;
                v.is_finite().then(|| (offset_secs(first, snap), v))
            })
            .collect()
    }
}

fn offset_secs(first: &MetricsSnapshot, snap: &MetricsSnapshot) -> f64 {
    (snap.timestamp - first.timestamp).num_milliseconds() as f64 / 1000.0
}
