//! Rule-driven workflow engine.
//!
//! Workflows are loaded once at startup and immutable afterwards. Per call,
//! matching is a deterministic, side-effect-free additive score over the
//! configured triggers; execution runs the matched workflow's actions
//! strictly in declared order against the pluggable executor registry.

pub mod condition;
pub mod executors;
pub mod template;

use crate::types::{CallContext, Intent};
use chrono::{Local, Timelike};
use condition::{Condition, ConditionScope};
use executors::ExecutorRegistry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;
use template::PlaceholderContext;
use thiserror::Error;

/// Intent-match contribution when the confidence floor is met.
const INTENT_MATCH_SCORE: f64 = 10.0;
/// Per distinct matched keyword.
const KEYWORD_MATCH_SCORE: f64 = 2.0;
/// Caller name present in the workflow's contact list. Contact triggers
/// outrank plain intent triggers.
const CONTACT_MATCH_SCORE: f64 = 15.0;
/// Emergency override: guarantees emergency workflows win outright.
const EMERGENCY_OVERRIDE_SCORE: f64 = 100.0;

#[derive(Debug, Error)]
pub enum WorkflowConfigError {
    #[error("workflow entry failed to parse: {0}")]
    Parse(String),
    #[error("workflow '{workflow}' is invalid: {reason}")]
    Invalid { workflow: String, reason: String },
    #[error("workflow '{workflow}' has a bad condition: {source}")]
    Condition {
        workflow: String,
        source: condition::ConditionError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowCategory {
    PersonalFriend,
    PersonalFamily,
    PersonalDoctor,
    BusinessSales,
    BusinessSupport,
    Appointment,
    Emergency,
    Scam,
    Unknown,
}

/// Closed set of action kinds. Anything unrecognized in configuration lands
/// on the explicit `Unknown` funnel variant instead of failing the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    RingUser,
    RingUserImmediately,
    TransferToVoicemail,
    Hangup,
    SendSms,
    SendSmsAlert,
    SendEmail,
    CheckCalendar,
    CreateCalendarEvent,
    LogCall,
    BlockScam,
    GenericWebhook,
    #[serde(other)]
    Unknown,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::RingUser => "ring_user",
            ActionKind::RingUserImmediately => "ring_user_immediately",
            ActionKind::TransferToVoicemail => "transfer_to_voicemail",
            ActionKind::Hangup => "hangup",
            ActionKind::SendSms => "send_sms",
            ActionKind::SendSmsAlert => "send_sms_alert",
            ActionKind::SendEmail => "send_email",
            ActionKind::CheckCalendar => "check_calendar",
            ActionKind::CreateCalendarEvent => "create_calendar_event",
            ActionKind::LogCall => "log_call",
            ActionKind::BlockScam => "block_scam",
            ActionKind::GenericWebhook => "generic_webhook",
            ActionKind::Unknown => "unknown",
        }
    }

    fn is_ring(&self) -> bool {
        matches!(self, ActionKind::RingUser | ActionKind::RingUserImmediately)
    }

    fn is_terminal(&self) -> bool {
        matches!(self, ActionKind::Hangup | ActionKind::BlockScam)
    }
}

/// Coarse time-of-day buckets for the optional trigger gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    pub fn of_hour(hour: u32) -> Self {
        match hour {
            0..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }
}

/// Conditions under which a workflow is eligible and scored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowTrigger {
    #[serde(default)]
    pub intent: Option<Intent>,
    /// Minimum intent confidence for the intent trigger to count.
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    /// Caller display names that strongly select this workflow.
    #[serde(default)]
    pub contacts: Option<Vec<String>>,
    /// Hard gate: outside this bucket the workflow is ineligible.
    #[serde(default)]
    pub time_of_day: Option<TimeOfDay>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default)]
    pub params: HashMap<String, Value>,
    /// Optional guard, evaluated by the safe condition grammar.
    #[serde(default)]
    pub condition: Option<String>,
}

fn default_priority() -> i32 {
    5
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub category: WorkflowCategory,
    #[serde(default)]
    pub triggers: WorkflowTrigger,
    pub actions: Vec<WorkflowAction>,
    /// Tie breaker between equal match scores; higher wins.
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// A workflow with its action conditions parsed and validated at load time.
struct LoadedWorkflow {
    workflow: Workflow,
    /// One entry per action, parallel to `workflow.actions`.
    conditions: Vec<Option<Condition>>,
}

/// Per-action record in an execution result.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub action: &'static str,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Post-hoc routing derived from what actually executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalAction {
    PassedThrough,
    Blocked,
    ScreenContinue,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub workflow_id: Option<String>,
    pub workflow_name: Option<String>,
    pub actions_completed: Vec<&'static str>,
    pub actions_failed: Vec<&'static str>,
    pub final_action: FinalAction,
    pub execution_time_ms: u64,
    pub results: Vec<ActionOutcome>,
}

impl ExecutionResult {
    /// Result when no workflow matched: the caller keeps screening.
    fn unmatched() -> Self {
        ExecutionResult {
            workflow_id: None,
            workflow_name: None,
            actions_completed: Vec::new(),
            actions_failed: Vec::new(),
            final_action: FinalAction::ScreenContinue,
            execution_time_ms: 0,
            results: Vec::new(),
        }
    }
}

pub struct WorkflowEngine {
    workflows: Vec<LoadedWorkflow>,
    executors: ExecutorRegistry,
}

impl WorkflowEngine {
    pub fn new(executors: ExecutorRegistry) -> Self {
        WorkflowEngine {
            workflows: Vec::new(),
            executors,
        }
    }

    /// Validate and register a workflow. Called once per configured entry at
    /// startup; a failure here skips this workflow only.
    pub fn register(&mut self, workflow: Workflow) -> Result<(), WorkflowConfigError> {
        if workflow.id.trim().is_empty() {
            return Err(WorkflowConfigError::Invalid {
                workflow: workflow.name.clone(),
                reason: "empty id".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&workflow.triggers.confidence) {
            return Err(WorkflowConfigError::Invalid {
                workflow: workflow.id.clone(),
                reason: format!(
                    "confidence floor {} outside [0, 1]",
                    workflow.triggers.confidence
                ),
            });
        }
        if self.workflows.iter().any(|w| w.workflow.id == workflow.id) {
            return Err(WorkflowConfigError::Invalid {
                workflow: workflow.id.clone(),
                reason: "duplicate id".to_string(),
            });
        }

        let mut conditions = Vec::with_capacity(workflow.actions.len());
        for action in &workflow.actions {
            match &action.condition {
                Some(source) => {
                    let parsed = Condition::parse(source).map_err(|e| {
                        WorkflowConfigError::Condition {
                            workflow: workflow.id.clone(),
                            source: e,
                        }
                    })?;
                    conditions.push(Some(parsed));
                }
                None => conditions.push(None),
            }
        }

        log::info!(
            "registered workflow '{}' ({} actions, priority {})",
            workflow.id,
            workflow.actions.len(),
            workflow.priority
        );
        self.workflows.push(LoadedWorkflow {
            workflow,
            conditions,
        });
        Ok(())
    }

    pub fn workflow_count(&self) -> usize {
        self.workflows.len()
    }

    /// Find the best-matching enabled workflow for this context, if any.
    pub fn match_workflow(&self, ctx: &CallContext) -> Option<&Workflow> {
        self.match_workflow_at(ctx, Local::now().hour())
    }

    /// Deterministic matching against an explicit hour of day.
    pub fn match_workflow_at(&self, ctx: &CallContext, hour: u32) -> Option<&Workflow> {
        self.match_loaded(ctx, hour).map(|lw| &lw.workflow)
    }

    fn match_loaded(&self, ctx: &CallContext, hour: u32) -> Option<&LoadedWorkflow> {
        let mut best: Option<(f64, &LoadedWorkflow)> = None;

        for loaded in &self.workflows {
            if !loaded.workflow.enabled {
                continue;
            }
            let score = Self::match_score(&loaded.workflow, ctx, hour);
            if score <= 0.0 {
                continue;
            }
            log::debug!(
                "workflow '{}' scored {score:.1} for call {}",
                loaded.workflow.id,
                ctx.call_id
            );

            best = match best {
                None => Some((score, loaded)),
                Some((best_score, best_loaded)) => {
                    let wins = score > best_score
                        || (score == best_score
                            && loaded.workflow.priority > best_loaded.workflow.priority);
                    if wins {
                        Some((score, loaded))
                    } else {
                        Some((best_score, best_loaded))
                    }
                }
            };
        }

        best.map(|(_, loaded)| loaded)
    }

    fn match_score(workflow: &Workflow, ctx: &CallContext, hour: u32) -> f64 {
        let triggers = &workflow.triggers;

        // Time-of-day is a gate, not a score: outside the bucket the
        // workflow is simply ineligible.
        if let Some(bucket) = triggers.time_of_day {
            if bucket != TimeOfDay::of_hour(hour) {
                return 0.0;
            }
        }

        let mut score = 0.0;

        if let Some(intent) = triggers.intent {
            if intent == ctx.intent && ctx.intent_confidence >= triggers.confidence {
                score += INTENT_MATCH_SCORE;
            }
        }

        if let Some(keywords) = &triggers.keywords {
            let transcript = ctx.transcript.to_lowercase();
            let matched = keywords
                .iter()
                .filter(|kw| transcript.contains(&kw.to_lowercase()))
                .count();
            score += matched as f64 * KEYWORD_MATCH_SCORE;
        }

        if let (Some(contacts), Some(caller_name)) = (&triggers.contacts, &ctx.caller_name) {
            if contacts.iter().any(|c| c == caller_name) {
                score += CONTACT_MATCH_SCORE;
            }
        }

        if ctx.is_emergency && workflow.category == WorkflowCategory::Emergency {
            score += EMERGENCY_OVERRIDE_SCORE;
        }

        score
    }

    /// Match and execute in one step. No match falls back to screening.
    pub async fn execute_for_call(&self, ctx: &CallContext) -> ExecutionResult {
        match self.match_loaded(ctx, Local::now().hour()) {
            Some(loaded) => self.execute(loaded, ctx).await,
            None => {
                log::warn!(
                    "no workflow matched for call {} (intent {})",
                    ctx.call_id,
                    ctx.intent
                );
                ExecutionResult::unmatched()
            }
        }
    }

    async fn execute(&self, loaded: &LoadedWorkflow, ctx: &CallContext) -> ExecutionResult {
        let workflow = &loaded.workflow;
        let started = Instant::now();
        log::info!(
            "executing workflow '{}' for call {} (intent {} at {:.2})",
            workflow.id,
            ctx.call_id,
            ctx.intent,
            ctx.intent_confidence
        );

        let scope = ConditionScope {
            intent: ctx.intent.as_str(),
            confidence: ctx.intent_confidence,
            scam_score: ctx.fraud_score,
            is_emergency: ctx.is_emergency,
            caller_name: ctx.caller_name.as_deref(),
        };
        let time = template::clock_time();

        let mut results: Vec<ActionOutcome> = Vec::new();
        let mut executed_kinds: Vec<(ActionKind, bool)> = Vec::new();

        // Strictly sequential: later actions may depend on earlier side
        // effects (ring, then notify).
        for (action, condition) in workflow.actions.iter().zip(&loaded.conditions) {
            if let Some(condition) = condition {
                match condition.evaluate(&scope) {
                    Ok(true) => {}
                    Ok(false) => {
                        log::debug!(
                            "skipping {} in '{}' (condition '{}' not met)",
                            action.kind.as_str(),
                            workflow.id,
                            condition.source()
                        );
                        continue;
                    }
                    Err(e) => {
                        // An unevaluable condition skips the action, it
                        // never aborts the workflow.
                        log::warn!(
                            "skipping {} in '{}': {e}",
                            action.kind.as_str(),
                            workflow.id
                        );
                        continue;
                    }
                }
            }

            let placeholders = PlaceholderContext::new(ctx, &time).with_params(&action.params);
            let params = placeholders.resolve_params(&action.params);

            let executor = self.executors.get(action.kind);
            match executor.execute(ctx, &params).await {
                Ok(output) => {
                    log::info!("  {} ok: {}", action.kind.as_str(), output.message);
                    executed_kinds.push((action.kind, true));
                    results.push(ActionOutcome {
                        action: action.kind.as_str(),
                        success: true,
                        message: output.message,
                        data: output.data,
                    });
                }
                Err(e) => {
                    // Recorded and carried on: a failed notification must
                    // not stop the call from being routed.
                    log::error!("  {} failed: {e}", action.kind.as_str());
                    executed_kinds.push((action.kind, false));
                    results.push(ActionOutcome {
                        action: action.kind.as_str(),
                        success: false,
                        message: e.to_string(),
                        data: None,
                    });
                }
            }
        }

        ExecutionResult {
            workflow_id: Some(workflow.id.clone()),
            workflow_name: Some(workflow.name.clone()),
            actions_completed: results
                .iter()
                .filter(|r| r.success)
                .map(|r| r.action)
                .collect(),
            actions_failed: results
                .iter()
                .filter(|r| !r.success)
                .map(|r| r.action)
                .collect(),
            final_action: Self::final_action(&executed_kinds),
            execution_time_ms: started.elapsed().as_millis() as u64,
            results,
        }
    }

    /// Derive the routing outcome from what actually ran.
    fn final_action(executed: &[(ActionKind, bool)]) -> FinalAction {
        for (kind, success) in executed {
            if !success {
                continue;
            }
            if kind.is_ring() {
                return FinalAction::PassedThrough;
            }
            if kind.is_terminal() {
                return FinalAction::Blocked;
            }
        }
        FinalAction::ScreenContinue
    }
}
