//! Call routing executors: ring the user, hang up, block a scam.

use super::{str_param, ActionError, ActionExecutor, ActionOutput, ActionParams};
use crate::gateway::{CallRecord, RecordStore, TelephonyGateway, UserDirectory};
use crate::types::CallContext;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

/// Bridge the call to the user's own phone.
///
/// Params: `priority` ("normal" or "high", logged and reported only).
pub struct RingUserExecutor {
    telephony: Arc<dyn TelephonyGateway>,
    users: Arc<dyn UserDirectory>,
}

impl RingUserExecutor {
    pub fn new(telephony: Arc<dyn TelephonyGateway>, users: Arc<dyn UserDirectory>) -> Self {
        RingUserExecutor { telephony, users }
    }
}

#[async_trait]
impl ActionExecutor for RingUserExecutor {
    fn name(&self) -> &'static str {
        "ring_user"
    }

    async fn execute(
        &self,
        ctx: &CallContext,
        params: &ActionParams,
    ) -> Result<ActionOutput, ActionError> {
        let user_phone = self
            .users
            .phone_number_for(&ctx.user_id)
            .await
            .ok_or_else(|| ActionError::Failed("user phone number not found".to_string()))?;

        let priority = str_param(params, "priority").unwrap_or("normal");
        log::info!("ringing user at {user_phone} (priority: {priority})");

        self.telephony.dial_user(&user_phone, &ctx.call_id).await?;

        Ok(ActionOutput::with_data(
            format!("Ringing user at {user_phone}"),
            json!({
                "user_phone": user_phone,
                "priority": priority,
                "call_id": ctx.call_id,
            }),
        ))
    }
}

/// Terminate the call.
///
/// Params: `reason` (logged, defaults to "workflow_action").
pub struct HangupExecutor {
    telephony: Arc<dyn TelephonyGateway>,
}

impl HangupExecutor {
    pub fn new(telephony: Arc<dyn TelephonyGateway>) -> Self {
        HangupExecutor { telephony }
    }
}

#[async_trait]
impl ActionExecutor for HangupExecutor {
    fn name(&self) -> &'static str {
        "hangup"
    }

    async fn execute(
        &self,
        ctx: &CallContext,
        params: &ActionParams,
    ) -> Result<ActionOutput, ActionError> {
        let reason = str_param(params, "reason").unwrap_or("workflow_action");
        log::info!("hanging up call {} (reason: {reason})", ctx.call_id);

        self.telephony.hangup(&ctx.call_id).await?;

        Ok(ActionOutput::with_data(
            format!("Call terminated: {reason}"),
            json!({ "reason": reason, "call_id": ctx.call_id }),
        ))
    }
}

/// Terminate a fraudulent call and persist a blocked-scam record so the
/// number shows up in the user's call history with the right outcome.
pub struct BlockScamExecutor {
    telephony: Arc<dyn TelephonyGateway>,
    records: Arc<dyn RecordStore>,
}

impl BlockScamExecutor {
    pub fn new(telephony: Arc<dyn TelephonyGateway>, records: Arc<dyn RecordStore>) -> Self {
        BlockScamExecutor { telephony, records }
    }
}

#[async_trait]
impl ActionExecutor for BlockScamExecutor {
    fn name(&self) -> &'static str {
        "block_scam"
    }

    async fn execute(
        &self,
        ctx: &CallContext,
        _params: &ActionParams,
    ) -> Result<ActionOutput, ActionError> {
        log::warn!(
            "blocking scam call {} from {} (score {:.2})",
            ctx.call_id,
            ctx.caller_number,
            ctx.fraud_score
        );

        self.telephony.hangup(&ctx.call_id).await?;

        self.records
            .record_call(&CallRecord {
                call_id: ctx.call_id.clone(),
                user_id: ctx.user_id.clone(),
                caller_number: ctx.caller_number.clone(),
                caller_name: ctx.caller_name.clone(),
                intent: ctx.intent.to_string(),
                outcome: "blocked_scam".to_string(),
                recorded_at: Utc::now(),
            })
            .await?;

        Ok(ActionOutput::with_data(
            format!("Blocked scam call from {}", ctx.caller_number),
            json!({ "caller_number": ctx.caller_number, "call_id": ctx.call_id }),
        ))
    }
}
