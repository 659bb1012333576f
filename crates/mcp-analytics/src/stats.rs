// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::event::ToolCallEvent;

/// Running totals for one tool (or one session's view of one tool).
/// Lifetime count/errorCount/totalMs are exact; `recent_durations` is a
/// bounded sliding window used only for percentile estimation.
#[derive(Debug, Clone, Default)]
pub struct ToolAccumulator {
    pub count: u64,
    pub error_count: u64,
    pub total_ms: u64,
    pub last_called_at_ms: Option<u64>,
    recent_durations: VecDeque<u64>,
    window_size: usize,
}

impl ToolAccumulator {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
            ..Default::default()
        }
    }

    pub fn record(&mut self, event: &ToolCallEvent) {
        self.count += 1;
        if !event.success {
            self.error_count += 1;
        }
        self.total_ms += event.duration_ms;
        self.last_called_at_ms = Some(event.timestamp_ms);
        if self.recent_durations.len() >= self.window_size {
            self.recent_durations.pop_front();
        }
        self.recent_durations.push_back(event.duration_ms);
    }

    pub fn recent_len(&self) -> usize {
        self.recent_durations.len()
    }

    pub fn to_stats(&self) -> ToolStats {
        let mut sorted: Vec<u64> = self.recent_durations.iter().copied().collect();
        sorted.sort_unstable();
        ToolStats {
            count: self.count,
            error_count: self.error_count,
            error_rate: if self.count == 0 {
                0.0
            } else {
                self.error_count as f64 / self.count as f64
            },
            avg_ms: if self.count == 0 {
                0.0
            } else {
                self.total_ms as f64 / self.count as f64
            },
            p50_ms: percentile(&sorted, 50.0),
            p95_ms: percentile(&sorted, 95.0),
            p99_ms: percentile(&sorted, 99.0),
            last_called_at_ms: self.last_called_at_ms,
        }
    }
}

/// Linear-interpolated percentile over an already-sorted slice.
pub fn percentile(sorted: &[u64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0] as f64;
    }
    let index = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;
    if lower == upper {
        return sorted[lower] as f64;
    }
    let weight = index - lower as f64;
    sorted[lower] as f64 * (1.0 - weight) + sorted[upper] as f64 * weight
}

/// Derived read model for one tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolStats {
    pub count: u64,
    pub error_count: u64,
    pub error_rate: f64,
    pub avg_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub last_called_at_ms: Option<u64>,
}

/// Derived read model for one session: its own totals plus a per-tool
/// breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    #[serde(flatten)]
    pub totals: ToolStats,
    pub tools: HashMap<String, ToolStats>,
}

/// Whole-collector snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub total_calls: u64,
    pub total_errors: u64,
    pub error_rate: f64,
    pub uptime_ms: u64,
    pub tools: HashMap<String, ToolStats>,
    pub sessions: HashMap<String, SessionStats>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_window_bound_example() {
        let mut acc = ToolAccumulator::new(3);
        for d in [10, 20, 30, 40, 50] {
            acc.record(&ToolCallEvent::success("t", None, 0, d, 0, 0));
        }
        assert_eq!(acc.count, 5);
        let stats = acc.to_stats();
        assert_eq!(stats.avg_ms, 30.0);
        assert_eq!(acc.recent_len(), 3);
        assert_eq!(stats.p50_ms, 40.0);
    }

    #[test]
    fn empty_window_percentile_is_zero() {
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn single_value_window() {
        assert_eq!(percentile(&[42], 99.0), 42.0);
    }
}
