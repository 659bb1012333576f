// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::event::ToolCallEvent;
use crate::exporter::{ExportError, Exporter};
use crate::stats::{percentile, AnalyticsSnapshot, SessionStats, ToolAccumulator, ToolStats};

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub max_buffer_size: usize,
    pub tool_window_size: usize,
    pub flush_interval_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: 10_000,
            tool_window_size: 2048,
            flush_interval_ms: 5_000,
        }
    }
}

struct SessionAccumulator {
    totals: ToolAccumulator,
    tools: HashMap<String, ToolAccumulator>,
}

impl SessionAccumulator {
    fn new(window_size: usize) -> Self {
        Self {
            totals: ToolAccumulator::new(window_size),
            tools: HashMap::new(),
        }
    }
}

struct Inner {
    total_calls: u64,
    total_errors: u64,
    ring_buffer: VecDeque<ToolCallEvent>,
    pending: Vec<ToolCallEvent>,
    tools: HashMap<String, ToolAccumulator>,
    sessions: HashMap<String, SessionAccumulator>,
}

/// Records tool-call events, aggregates them into per-tool/per-session
/// accumulators with bounded percentile windows, and periodically hands
/// batches to an `Exporter`.
pub struct Collector {
    config: CollectorConfig,
    start: Instant,
    inner: Mutex<Inner>,
    flush_lock: Mutex<()>,
    exporter: Arc<dyn Exporter>,
    timer: Mutex<Option<JoinHandle<()>>>,
    destroyed: AtomicBool,
}

impl Collector {
    pub fn new(config: CollectorConfig, exporter: Arc<dyn Exporter>) -> Arc<Self> {
        let collector = Arc::new(Self {
            config,
            start: Instant::now(),
            inner: Mutex::new(Inner {
                total_calls: 0,
                total_errors: 0,
                ring_buffer: VecDeque::new(),
                pending: Vec::new(),
                tools: HashMap::new(),
                sessions: HashMap::new(),
            }),
            flush_lock: Mutex::new(()),
            exporter,
            timer: Mutex::new(None),
            destroyed: AtomicBool::new(false),
        });
        collector.clone().spawn_timer();
        collector
    }

    fn spawn_timer(self: Arc<Self>) {
        if self.config.flush_interval_ms == 0 {
            return;
        }
        let interval = Duration::from_millis(self.config.flush_interval_ms);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if self.destroyed.load(Ordering::SeqCst) {
                    break;
                }
                if let Err(e) = self.flush().await {
                    tracing::warn!(error = %e, "periodic analytics flush failed");
                }
            }
        });
        // `Collector::new` has not yet handed out the `Arc`, so nothing
        // else can be contending for this lock yet.
        if let Ok(mut guard) = self.timer.try_lock() {
            *guard = Some(handle);
        }
    }

    pub async fn record(&self, event: ToolCallEvent) {
        let window_size = self.config.tool_window_size;
        let mut inner = self.inner.lock().await;
        inner.total_calls += 1;
        if !event.success {
            inner.total_errors += 1;
        }

        inner
            .tools
            .entry(event.tool_name.clone())
            .or_insert_with(|| ToolAccumulator::new(window_size))
            .record(&event);

        if let Some(session_id) = event.session_id.clone() {
            let session = inner
                .sessions
                .entry(session_id)
                .or_insert_with(|| SessionAccumulator::new(window_size));
            session.totals.record(&event);
            session
                .tools
                .entry(event.tool_name.clone())
                .or_insert_with(|| ToolAccumulator::new(window_size))
                .record(&event);
        }

        if inner.ring_buffer.len() >= self.config.max_buffer_size {
            inner.ring_buffer.pop_front();
        }
        inner.ring_buffer.push_back(event.clone());
        inner.pending.push(event);
    }

    /// Single-flight flush: concurrent callers serialize on `flush_lock`,
    /// so only one exporter invocation is ever in flight. A caller that
    /// arrives after a flush already drained `pending` simply finds
    /// nothing to send.
    pub async fn flush(&self) -> Result<(), ExportError> {
        let _flushing = self.flush_lock.lock().await;
        loop {
            let batch = {
                let mut inner = self.inner.lock().await;
                if inner.pending.is_empty() {
                    break;
                }
                std::mem::take(&mut inner.pending)
            };
            if let Err(e) = self.exporter.export(&batch).await {
                let mut inner = self.inner.lock().await;
                let mut requeued = batch;
                requeued.append(&mut inner.pending);
                inner.pending = requeued;
                return Err(e);
            }
        }
        Ok(())
    }

    pub async fn tool_stats(&self, tool_name: &str) -> Option<ToolStats> {
        self.inner
            .lock()
            .await
            .tools
            .get(tool_name)
            .map(|acc| acc.to_stats())
    }

    pub async fn session_stats(&self, session_id: &str) -> Option<SessionStats> {
        let inner = self.inner.lock().await;
        inner.sessions.get(session_id).map(|session| SessionStats {
            totals: session.totals.to_stats(),
            tools: session
                .tools
                .iter()
                .map(|(name, acc)| (name.clone(), acc.to_stats()))
                .collect(),
        })
    }

    /// Sessions ordered by call count descending, ties broken by most
    /// recent activity.
    pub async fn top_sessions(&self, k: usize) -> Vec<(String, SessionStats)> {
        let inner = self.inner.lock().await;
        let mut sessions: Vec<(String, SessionStats)> = inner
            .sessions
            .iter()
            .map(|(id, session)| {
                (
                    id.clone(),
                    SessionStats {
                        totals: session.totals.to_stats(),
                        tools: session
                            .tools
                            .iter()
                            .map(|(name, acc)| (name.clone(), acc.to_stats()))
                            .collect(),
                    },
                )
            })
            .collect();
        sessions.sort_by(|a, b| {
            b.1.totals
                .count
                .cmp(&a.1.totals.count)
                .then_with(|| b.1.totals.last_called_at_ms.cmp(&a.1.totals.last_called_at_ms))
        });
        sessions.truncate(k);
        sessions
    }

    pub async fn snapshot(&self) -> AnalyticsSnapshot {
        let inner = self.inner.lock().await;
        AnalyticsSnapshot {
            total_calls: inner.total_calls,
            total_errors: inner.total_errors,
            error_rate: if inner.total_calls == 0 {
                0.0
            } else {
                inner.total_errors as f64 / inner.total_calls as f64
            },
            uptime_ms: self.start.elapsed().as_millis() as u64,
            tools: inner
                .tools
                .iter()
                .map(|(name, acc)| (name.clone(), acc.to_stats()))
                .collect(),
            sessions: inner
                .sessions
                .iter()
                .map(|(id, session)| {
                    (
                        id.clone(),
                        SessionStats {
                            totals: session.totals.to_stats(),
                            tools: session
                                .tools
                                .iter()
                                .map(|(name, acc)| (name.clone(), acc.to_stats()))
                                .collect(),
                        },
                    )
                })
                .collect(),
        }
    }

    /// Discard all recorded state. Counters, buffers and accumulators are
    /// all cleared; uptime is not reset.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.total_calls = 0;
        inner.total_errors = 0;
        inner.ring_buffer.clear();
        inner.pending.clear();
        inner.tools.clear();
        inner.sessions.clear();
    }

    /// Stop the periodic flush timer and flush once more.
    pub async fn destroy(&self) -> Result<(), ExportError> {
        self.destroyed.store(true, Ordering::SeqCst);
        if let Some(handle) = self.timer.lock().await.take() {
            handle.abort();
        }
        self.flush().await
    }
}

/// Exposed so a transport interceptor or handler wrapper can compute a
/// percentile without re-sorting on its own; kept free of `Collector`'s
/// internal lock types.
pub fn interpolate_percentile(sorted_durations: &[u64], p: f64) -> f64 {
    percentile(sorted_durations, p)
}
