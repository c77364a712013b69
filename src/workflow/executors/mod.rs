//! Pluggable action executors.
//!
//! One thin adapter per action kind, each wired to its collaborator at
//! startup and registered in an `ExecutorRegistry`. Kinds without a
//! registered executor (including the `unknown` funnel variant) dispatch to
//! a no-op that reports success, so new action types can appear in
//! configuration before an executor ships without breaking workflows.

pub mod business_actions;
pub mod calendar_actions;
pub mod call_actions;
pub mod notification_actions;

use crate::gateway::{
    CalendarService, EmailSender, GatewayError, RecordStore, TelephonyGateway, UserDirectory,
};
use crate::types::CallContext;
use crate::workflow::ActionKind;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub use business_actions::{LogCallExecutor, WebhookExecutor};
pub use calendar_actions::{CheckCalendarExecutor, CreateEventExecutor};
pub use call_actions::{BlockScamExecutor, HangupExecutor, RingUserExecutor};
pub use notification_actions::{SendEmailExecutor, SendSmsExecutor};

/// An individual action failed. Recorded against the workflow run; never
/// aborts the remaining actions.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{0}")]
    Failed(String),
    #[error("missing required parameter '{0}'")]
    MissingParam(&'static str),
}

impl From<GatewayError> for ActionError {
    fn from(e: GatewayError) -> Self {
        ActionError::Failed(e.to_string())
    }
}

/// Successful action output.
#[derive(Debug, Clone)]
pub struct ActionOutput {
    pub message: String,
    pub data: Option<Value>,
}

impl ActionOutput {
    pub fn new(message: impl Into<String>) -> Self {
        ActionOutput {
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(message: impl Into<String>, data: Value) -> Self {
        ActionOutput {
            message: message.into(),
            data: Some(data),
        }
    }
}

/// Placeholder-resolved parameters, as passed by the engine.
pub type ActionParams = HashMap<String, Value>;

#[async_trait]
pub trait ActionExecutor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(
        &self,
        ctx: &CallContext,
        params: &ActionParams,
    ) -> Result<ActionOutput, ActionError>;
}

/// Fetch a string parameter.
pub(crate) fn str_param<'a>(params: &'a ActionParams, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

/// Fetch an integer parameter, tolerating YAML/JSON number widening.
pub(crate) fn int_param(params: &ActionParams, key: &str) -> Option<i64> {
    params.get(key).and_then(Value::as_i64)
}

/// Stand-in for action kinds with no wired executor.
pub struct NoOpExecutor;

#[async_trait]
impl ActionExecutor for NoOpExecutor {
    fn name(&self) -> &'static str {
        "no_op"
    }

    async fn execute(
        &self,
        _ctx: &CallContext,
        params: &ActionParams,
    ) -> Result<ActionOutput, ActionError> {
        log::warn!("no executor wired for this action kind, treating as no-op");
        Ok(ActionOutput::with_data(
            "not implemented",
            Value::Object(params.clone().into_iter().collect()),
        ))
    }
}

/// Executor lookup table, built once at startup. Lookups never fail: an
/// unregistered kind falls back to the no-op executor.
pub struct ExecutorRegistry {
    executors: HashMap<ActionKind, Arc<dyn ActionExecutor>>,
    fallback: Arc<dyn ActionExecutor>,
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        ExecutorRegistry {
            executors: HashMap::new(),
            fallback: Arc::new(NoOpExecutor),
        }
    }

    pub fn register(&mut self, kind: ActionKind, executor: Arc<dyn ActionExecutor>) {
        log::debug!("registered executor {} for {}", executor.name(), kind.as_str());
        self.executors.insert(kind, executor);
    }

    pub fn get(&self, kind: ActionKind) -> Arc<dyn ActionExecutor> {
        self.executors
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

/// Collaborator handles needed to wire the standard executor set.
pub struct ExecutorDeps {
    pub telephony: Arc<dyn TelephonyGateway>,
    pub users: Arc<dyn UserDirectory>,
    pub email: Arc<dyn EmailSender>,
    pub calendar: Arc<dyn CalendarService>,
    pub records: Arc<dyn RecordStore>,
}

/// Build the full registry: every supported kind mapped to its adapter.
/// `transfer_to_voicemail` stays a deliberate no-op until a voicemail
/// collaborator exists.
pub fn standard_registry(deps: ExecutorDeps) -> ExecutorRegistry {
    let mut registry = ExecutorRegistry::new();

    let ring = Arc::new(RingUserExecutor::new(
        deps.telephony.clone(),
        deps.users.clone(),
    ));
    registry.register(ActionKind::RingUser, ring.clone());
    registry.register(ActionKind::RingUserImmediately, ring);

    registry.register(
        ActionKind::Hangup,
        Arc::new(HangupExecutor::new(deps.telephony.clone())),
    );
    registry.register(
        ActionKind::BlockScam,
        Arc::new(BlockScamExecutor::new(
            deps.telephony.clone(),
            deps.records.clone(),
        )),
    );

    let sms = Arc::new(SendSmsExecutor::new(deps.telephony.clone()));
    registry.register(ActionKind::SendSms, sms.clone());
    registry.register(ActionKind::SendSmsAlert, sms);
    registry.register(
        ActionKind::SendEmail,
        Arc::new(SendEmailExecutor::new(deps.email.clone())),
    );

    registry.register(
        ActionKind::CheckCalendar,
        Arc::new(CheckCalendarExecutor::new(deps.calendar.clone())),
    );
    registry.register(
        ActionKind::CreateCalendarEvent,
        Arc::new(CreateEventExecutor::new(deps.calendar.clone())),
    );

    registry.register(
        ActionKind::LogCall,
        Arc::new(LogCallExecutor::new(deps.records.clone())),
    );
    registry.register(ActionKind::GenericWebhook, Arc::new(WebhookExecutor::new()));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unregistered_kind_is_a_successful_no_op() {
        let registry = ExecutorRegistry::new();
        let executor = registry.get(ActionKind::Unknown);
        let result = executor
            .execute(&CallContext::default(), &ActionParams::new())
            .await
            .unwrap();
        assert_eq!(result.message, "not implemented");
    }
}
