//! Top-level screening flow and ongoing-call monitoring.
//!
//! `CallScreener` is the one-shot pipeline for a new call: whitelist fast
//! path, fused analysis, routing decision. `CallMonitor` owns re-analysis of
//! in-progress calls as cancellable units of work keyed by call id, so a
//! result can never be applied to a call that already ended or whose
//! transcript has since grown again.

use crate::decision::{clarifying_question, DecisionEngine};
use crate::orchestrator::{AnalysisOrchestrator, OngoingAnalysis};
use crate::types::{CallContext, Decision, Intent, RouteAction};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Safest decision when anything internal fails: keep screening with the
/// generic prompt. The caller never hears a raw error.
pub fn fallback_decision() -> Decision {
    Decision {
        action: RouteAction::ScreenContinue,
        reason: "screening_error".to_string(),
        message: clarifying_question(Intent::Unknown).to_string(),
        confidence: 0.0,
    }
}

pub struct CallScreener {
    orchestrator: Arc<AnalysisOrchestrator>,
    decisions: DecisionEngine,
}

impl CallScreener {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>) -> Self {
        CallScreener {
            orchestrator,
            decisions: DecisionEngine::new(),
        }
    }

    pub fn orchestrator(&self) -> &Arc<AnalysisOrchestrator> {
        &self.orchestrator
    }

    /// Screen a new call end to end.
    ///
    /// Whitelisted callers get a personal greeting and skip analysis
    /// entirely; everyone else goes through fused analysis and the decision
    /// table.
    pub async fn screen_call(&self, ctx: &CallContext) -> Decision {
        if let Some(contact) = self
            .orchestrator
            .check_whitelist(&ctx.user_id, &ctx.caller_number)
            .await
        {
            log::info!(
                "call {} from whitelisted contact {}",
                ctx.call_id,
                contact.display_name
            );
            return Decision {
                action: RouteAction::PassThrough,
                reason: "whitelisted_contact".to_string(),
                message: format!("Hi! I'll connect you to {} right away.", ctx.user_name),
                confidence: 1.0,
            };
        }

        let assessment = self.orchestrator.analyze(ctx).await;
        self.decisions.decide(&assessment, &ctx.user_name)
    }
}

/// Re-analysis result for a live call, tagged with its call id.
#[derive(Debug, Clone)]
pub struct OngoingUpdate {
    pub call_id: String,
    pub analysis: OngoingAnalysis,
}

struct AnalysisTask {
    generation: u64,
    handle: JoinHandle<()>,
}

struct MonitorInner {
    orchestrator: Arc<AnalysisOrchestrator>,
    tasks: Mutex<HashMap<String, AnalysisTask>>,
    generation: AtomicU64,
    updates: mpsc::UnboundedSender<OngoingUpdate>,
}

impl MonitorInner {
    fn deliver(&self, call_id: &str, generation: u64, analysis: OngoingAnalysis) {
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.get(call_id) {
            Some(task) if task.generation == generation => {
                tasks.remove(call_id);
            }
            _ => {
                // Ended or superseded while we were analyzing. Drop it.
                log::debug!("discarding stale analysis for call {call_id} (gen {generation})");
                return;
            }
        }
        drop(tasks);

        if self
            .updates
            .send(OngoingUpdate {
                call_id: call_id.to_string(),
                analysis,
            })
            .is_err()
        {
            log::warn!("ongoing-update receiver dropped, result for {call_id} lost");
        }
    }
}

/// Tracks in-flight ongoing analysis per call.
///
/// Each transcript update replaces (aborts) the previous in-flight analysis
/// for that call; `call_ended` aborts and unregisters. A generation check at
/// delivery time guarantees a stale task that slipped past the abort can
/// still not publish its result.
pub struct CallMonitor {
    inner: Arc<MonitorInner>,
}

impl CallMonitor {
    pub fn new(
        orchestrator: Arc<AnalysisOrchestrator>,
    ) -> (Self, mpsc::UnboundedReceiver<OngoingUpdate>) {
        let (updates, receiver) = mpsc::unbounded_channel();
        let monitor = CallMonitor {
            inner: Arc::new(MonitorInner {
                orchestrator,
                tasks: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                updates,
            }),
        };
        (monitor, receiver)
    }

    pub fn active_calls(&self) -> usize {
        self.inner.tasks.lock().unwrap().len()
    }

    /// The call's transcript grew: re-run analysis on a fresh task,
    /// replacing any in-flight pass for the same call.
    pub fn transcript_updated(&self, ctx: CallContext) {
        let call_id = ctx.call_id.clone();
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // The map lock is held across the spawn so the new task cannot run
        // its delivery check before its own entry is registered.
        let mut tasks = self.inner.tasks.lock().unwrap();

        if let Some(previous) = tasks.remove(&call_id) {
            log::debug!(
                "superseding in-flight analysis for call {call_id} (gen {})",
                previous.generation
            );
            previous.handle.abort();
        }

        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            let analysis = inner.orchestrator.analyze_ongoing(&ctx).await;
            inner.deliver(&ctx.call_id, generation, analysis);
        });

        tasks.insert(call_id, AnalysisTask { generation, handle });
    }

    /// The call ended: abort any in-flight analysis and forget the call.
    /// Nothing may be applied to a terminated call.
    pub fn call_ended(&self, call_id: &str) {
        if let Some(task) = self.inner.tasks.lock().unwrap().remove(call_id) {
            log::debug!(
                "call {call_id} ended, aborting in-flight analysis (gen {})",
                task.generation
            );
            task.handle.abort();
        }
    }
}
