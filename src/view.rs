//! Pure mapping from view state to a render description.
//!
//! Nothing here touches the terminal; `ui` paints whatever [`build`] returns.

use crate::history::History;
use crate::models::{format_gb, GpuSample, MetricsSnapshot};

/// A progress bar: the raw reading and the fill it is drawn with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    /// Reading as reported, in percent. Not clamped.
    pub value: f64,
    /// Fill ratio in `[0, 1]`.
    pub fill: f64,
}

impl Bar {
    pub fn from_percent(percent: f64) -> Self {
        Bar {
            value: percent,
            fill: clamp_ratio(percent / 100.0),
        }
    }

    pub fn from_ratio(ratio: f64) -> Self {
        let ratio = if ratio.is_finite() { ratio } else { 0.0 };
        Bar {
            value: ratio * 100.0,
            fill: clamp_ratio(ratio),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GpuPanel {
    pub id: u32,
    pub name: String,
    pub utilization: Bar,
    pub memory: Bar,
    /// `allocated / total` in gigabytes.
    pub memory_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendKind {
    Cpu,
    Memory,
    Gpu(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendLine {
    pub kind: TrendKind,
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendChart {
    pub lines: Vec<TrendLine>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_labels: [String; 2],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub cpu: Bar,
    pub memory: Bar,
    pub active_sessions: u64,
    pub gpus: Vec<GpuPanel>,
    pub chart: TrendChart,
}

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Loading,
    Dashboard(Dashboard),
}

/// Builds the render description for the given state. Idempotent.
pub fn build(current: Option<&MetricsSnapshot>, history: &History) -> View {
    let Some(snapshot) = current else {
        return View::Loading;
    };

    View::Dashboard(Dashboard {
        cpu: Bar::from_percent(snapshot.cpu_percent),
        memory: Bar::from_percent(snapshot.memory_percent),
        active_sessions: snapshot.active_sessions,
        gpus: snapshot.gpu_info.iter().map(gpu_panel).collect(),
        chart: trend_chart(snapshot, history),
    })
}

fn gpu_panel(gpu: &GpuSample) -> GpuPanel {
    GpuPanel {
        id: gpu.id,
        name: gpu.name.clone(),
        utilization: Bar::from_percent(gpu.utilization),
        memory: Bar::from_ratio(gpu.memory_ratio()),
        memory_text: format!(
            "{} / {}",
            format_gb(gpu.memory_allocated),
            format_gb(gpu.total_memory)
        ),
    }
}

fn trend_chart(snapshot: &MetricsSnapshot, history: &History) -> TrendChart {
    let mut lines = vec![
        TrendLine {
            kind: TrendKind::Cpu,
            label: "CPU".to_string(),
            points: history.series(|s| Some(s.cpu_percent)),
        },
        TrendLine {
            kind: TrendKind::Memory,
            label: "Memory".to_string(),
            points: history.series(|s| Some(s.memory_percent)),
        },
    ];
    // GPU lines follow the current composition. Samples without the id add no point,
    // so the line starts where the GPU first appears and bridges any sample it skipped.
    lines.extend(snapshot.gpu_info.iter().map(|gpu| {
        let id = gpu.id;
        TrendLine {
            kind: TrendKind::Gpu(id),
            label: format!("GPU {id}"),
            points: history.series(|s| s.gpu(id).map(|g| g.utilization)),
        }
    }));

    let (low, high) = lines
        .iter()
        .flat_map(|line| line.points.iter().map(|&(_, y)| y))
        .fold((0.0_f64, 100.0_f64), |(lo, hi), y| (lo.min(y), hi.max(y)));

    let x_labels = match (history.oldest(), history.latest()) {
        (Some(first), Some(last)) => [
            first.timestamp.format("%H:%M:%S").to_string(),
            last.timestamp.format("%H:%M:%S").to_string(),
        ],
        _ => [String::new(), String::new()],
    };

    TrendChart {
        lines,
        x_bounds: [0.0, history.span_secs().max(1.0)],
        y_bounds: [low, high],
        x_labels,
    }
}

fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use std::sync::Arc;

    fn gpu(id: u32, total: f64, allocated: f64, utilization: f64) -> GpuSample {
        GpuSample {
            id,
            name: format!("dev{id}"),
            total_memory: total,
            memory_allocated: allocated,
            utilization,
        }
    }

    fn snapshot(secs: i64, cpu: f64, gpus: Vec<GpuSample>) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap(),
            cpu_percent: cpu,
            memory_percent: 20.0,
            gpu_info: gpus,
            active_sessions: 1,
        }
    }

    fn dashboard(view: View) -> Dashboard {
        match view {
            View::Dashboard(d) => d,
            View::Loading => panic!("expected dashboard"),
        }
    }

    #[test]
    fn loading_without_current_snapshot_even_with_history() {
        let history = History::new().append(Arc::new(snapshot(0, 5.0, Vec::new())));
        assert_eq!(build(None, &history), View::Loading);
        assert_eq!(build(None, &History::new()), View::Loading);
    }

    #[test]
    fn example_snapshot_maps_to_expected_bars() {
        let payload = r#"{"cpu_percent": 42.5, "memory_percent": 10.0, "active_sessions": 2,
            "gpu_info": [{"id": 0, "name": "A", "total_memory": 1000, "memory_allocated": 500, "utilization": 50}]}"#;
        let snap = Arc::new(MetricsSnapshot::decode(payload, chrono::Utc::now()).unwrap());
        let history = History::new().append(Arc::clone(&snap));

        let d = dashboard(build(Some(&*snap), &history));
        assert_eq!(d.cpu.value, 42.5);
        assert_eq!(d.cpu.fill, 0.425);
        assert_eq!(d.memory.value, 10.0);
        assert_eq!(d.active_sessions, 2);
        assert_eq!(d.gpus.len(), 1);
        assert_eq!(d.gpus[0].memory.value, 50.0);
        assert_eq!(d.gpus[0].memory.fill, 0.5);
        assert_eq!(d.gpus[0].utilization.value, 50.0);
    }

    #[test]
    fn zero_capacity_gpu_renders_empty_memory_bar() {
        let snap = snapshot(0, 0.0, vec![gpu(0, 0.0, 0.0, 0.0)]);
        let d = dashboard(build(Some(&snap), &History::new()));
        assert_eq!(d.gpus[0].memory, Bar { value: 0.0, fill: 0.0 });
        assert_eq!(d.gpus[0].memory_text, "0.00GB / 0.00GB");
    }

    #[test]
    fn out_of_range_percent_is_shown_raw_but_filled_clamped() {
        assert_eq!(Bar::from_percent(130.0), Bar { value: 130.0, fill: 1.0 });
        assert_eq!(Bar::from_percent(-5.0), Bar { value: -5.0, fill: 0.0 });
        assert_eq!(Bar::from_ratio(f64::INFINITY).fill, 0.0);
    }

    #[test]
    fn chart_has_cpu_memory_and_one_line_per_current_gpu() {
        let old = Arc::new(snapshot(0, 10.0, vec![gpu(0, 1.0, 0.0, 30.0)]));
        let mid = Arc::new(snapshot(2, 20.0, vec![gpu(0, 1.0, 0.0, 40.0), gpu(1, 1.0, 0.0, 70.0)]));
        let now = Arc::new(snapshot(4, 30.0, vec![gpu(1, 1.0, 0.0, 80.0)]));
        let history = History::new()
            .append(Arc::clone(&old))
            .append(Arc::clone(&mid))
            .append(Arc::clone(&now));

        let chart = dashboard(build(Some(&*now), &history)).chart;
        let kinds: Vec<TrendKind> = chart.lines.iter().map(|l| l.kind).collect();
        assert_eq!(kinds, vec![TrendKind::Cpu, TrendKind::Memory, TrendKind::Gpu(1)]);
        assert_eq!(chart.lines[0].points, vec![(0.0, 10.0), (2.0, 20.0), (4.0, 30.0)]);
        assert_eq!(chart.lines[2].label, "GPU 1");
        assert_eq!(chart.lines[2].points, vec![(2.0, 70.0), (4.0, 80.0)]);
        assert_eq!(chart.x_bounds, [0.0, 4.0]);
        assert_eq!(chart.y_bounds, [0.0, 100.0]);
        assert_eq!(chart.x_labels[0], old.timestamp.format("%H:%M:%S").to_string());
    }

    #[test]
    fn gpu_line_skips_samples_where_the_gpu_was_missing() {
        let first = Arc::new(snapshot(0, 10.0, vec![gpu(0, 1.0, 0.0, 30.0)]));
        let gap = Arc::new(snapshot(2, 10.0, Vec::new()));
        let back = Arc::new(snapshot(4, 10.0, vec![gpu(0, 1.0, 0.0, 50.0)]));
        let history = History::new()
            .append(first)
            .append(gap)
            .append(Arc::clone(&back));

        let chart = dashboard(build(Some(&*back), &history)).chart;
        assert_eq!(chart.lines[2].kind, TrendKind::Gpu(0));
        assert_eq!(chart.lines[2].points, vec![(0.0, 30.0), (4.0, 50.0)]);
    }

    #[test]
    fn chart_bounds_stretch_for_out_of_range_values() {
        let snap = Arc::new(snapshot(0, 140.0, Vec::new()));
        let history = History::new().append(Arc::clone(&snap));
        let chart = dashboard(build(Some(&*snap), &history)).chart;
        assert_eq!(chart.y_bounds, [0.0, 140.0]);
        assert_eq!(chart.x_bounds, [0.0, 1.0]);
    }

    #[test]
    fn build_is_idempotent() {
        let snap = Arc::new(snapshot(0, 33.0, vec![gpu(2, 2048.0, 1024.0, 12.0)]));
        let history = History::new().append(Arc::clone(&snap));
        assert_eq!(build(Some(&*snap), &history), build(Some(&*snap), &history));
    }
}
