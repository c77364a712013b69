//! Screening statistics.
//!
//! Lightweight counters over routing decisions, aggregated by a worker task
//! fed through an unbounded channel and periodically flushed to disk as
//! JSON. This is local observability for the `--stats` flag, not the durable
//! call history (that belongs to the record store collaborator).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

use crate::types::RouteAction;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_calls: u64,
    pub passed_through: u64,
    pub screened: u64,
    pub blocked: u64,
    pub by_reason: HashMap<String, u64>,
    pub scam_types: HashMap<String, u64>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl StatsSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading stats file {}", path.display()))?;
        serde_json::from_str(&content).context("parsing stats file")
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Total calls screened: {}", self.total_calls),
            format!("  passed through: {}", self.passed_through),
            format!("  kept screening: {}", self.screened),
            format!("  blocked:        {}", self.blocked),
        ];
        if !self.by_reason.is_empty() {
            lines.push("By reason:".to_string());
            let mut reasons: Vec<_> = self.by_reason.iter().collect();
            reasons.sort_by(|a, b| b.1.cmp(a.1));
            for (reason, count) in reasons {
                lines.push(format!("  {reason}: {count}"));
            }
        }
        if !self.scam_types.is_empty() {
            lines.push("Blocked scam types:".to_string());
            let mut types: Vec<_> = self.scam_types.iter().collect();
            types.sort_by(|a, b| b.1.cmp(a.1));
            for (scam_type, count) in types {
                lines.push(format!("  {scam_type}: {count}"));
            }
        }
        lines.join("\n")
    }

    fn apply(&mut self, event: &StatEvent) {
        let StatEvent::Decision {
            action,
            reason,
            scam_type,
        } = event;

        self.total_calls += 1;
        match action {
            RouteAction::PassThrough => self.passed_through += 1,
            RouteAction::ScreenContinue => self.screened += 1,
            RouteAction::Block => self.blocked += 1,
        }
        *self.by_reason.entry(reason.clone()).or_insert(0) += 1;
        if let Some(scam_type) = scam_type {
            if *action == RouteAction::Block {
                *self.scam_types.entry(scam_type.clone()).or_insert(0) += 1;
            }
        }
        self.last_updated = Some(Utc::now());
    }
}

#[derive(Debug, Clone)]
pub enum StatEvent {
    Decision {
        action: RouteAction,
        reason: String,
        scam_type: Option<String>,
    },
}

pub struct StatsCollector {
    sender: mpsc::UnboundedSender<StatEvent>,
    handle: tokio::task::JoinHandle<()>,
}

impl StatsCollector {
    /// Spawn the aggregation worker. With no path, counters live only in
    /// memory for the process lifetime.
    pub fn new(path: Option<PathBuf>, flush_interval_seconds: u64) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            if let Err(e) = Self::worker(path, receiver, flush_interval_seconds).await {
                log::error!("stats worker error: {e}");
            }
        });
        StatsCollector { sender, handle }
    }

    pub fn record(&self, event: StatEvent) {
        if let Err(e) = self.sender.send(event) {
            log::warn!("failed to queue stats event: {e}");
        }
    }

    /// Flush and stop. Dropping the collector also stops the worker, but
    /// without waiting for the final flush.
    pub async fn shutdown(self) {
        drop(self.sender);
        let _ = self.handle.await;
    }

    async fn worker(
        path: Option<PathBuf>,
        mut receiver: mpsc::UnboundedReceiver<StatEvent>,
        flush_interval_seconds: u64,
    ) -> Result<()> {
        let mut snapshot = match &path {
            Some(p) if p.exists() => StatsSnapshot::load(p).unwrap_or_else(|e| {
                log::warn!("could not load existing stats, starting fresh: {e}");
                StatsSnapshot::default()
            }),
            _ => StatsSnapshot::default(),
        };

        let mut dirty = false;
        let mut flush_timer = interval(Duration::from_secs(flush_interval_seconds.max(1)));
        // The first tick completes immediately.
        flush_timer.tick().await;

        loop {
            tokio::select! {
                event = receiver.recv() => {
                    match event {
                        Some(event) => {
                            snapshot.apply(&event);
                            dirty = true;
                        }
                        None => {
                            if dirty {
                                Self::flush(&path, &snapshot)?;
                            }
                            break;
                        }
                    }
                }
                _ = flush_timer.tick() => {
                    if dirty {
                        Self::flush(&path, &snapshot)?;
                        dirty = false;
                    }
                }
            }
        }
        Ok(())
    }

    fn flush(path: &Option<PathBuf>, snapshot: &StatsSnapshot) -> Result<()> {
        let Some(path) = path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating stats directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(path, content)
            .with_context(|| format!("writing stats file {}", path.display()))?;
        log::debug!("stats flushed ({} calls)", snapshot.total_calls);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_stats_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("callwarden-stats-{}-{tag}.json", std::process::id()))
    }

    #[tokio::test]
    async fn counters_aggregate_and_persist() {
        let path = temp_stats_path("aggregate");
        let _ = std::fs::remove_file(&path);

        let collector = StatsCollector::new(Some(path.clone()), 3600);
        collector.record(StatEvent::Decision {
            action: RouteAction::Block,
            reason: "scam_detected".to_string(),
            scam_type: Some("irs".to_string()),
        });
        collector.record(StatEvent::Decision {
            action: RouteAction::PassThrough,
            reason: "friend_or_family".to_string(),
            scam_type: None,
        });
        collector.record(StatEvent::Decision {
            action: RouteAction::Block,
            reason: "scam_detected".to_string(),
            scam_type: Some("irs".to_string()),
        });
        collector.shutdown().await;

        let snapshot = StatsSnapshot::load(&path).unwrap();
        assert_eq!(snapshot.total_calls, 3);
        assert_eq!(snapshot.blocked, 2);
        assert_eq!(snapshot.passed_through, 1);
        assert_eq!(snapshot.by_reason["scam_detected"], 2);
        assert_eq!(snapshot.scam_types["irs"], 2);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn summary_lists_reasons_by_count() {
        let mut snapshot = StatsSnapshot::default();
        snapshot.apply(&StatEvent::Decision {
            action: RouteAction::ScreenContinue,
            reason: "unknown_intent".to_string(),
            scam_type: None,
        });
        let summary = snapshot.summary();
        assert!(summary.contains("Total calls screened: 1"));
        assert!(summary.contains("unknown_intent: 1"));
    }
}
