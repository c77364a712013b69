//! Business automation executors: screening record logging and the generic
//! outbound webhook.

use super::{str_param, ActionError, ActionExecutor, ActionOutput, ActionParams};
use crate::gateway::{CallRecord, RecordStore};
use crate::types::CallContext;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Persist a screening record for the call.
///
/// Params: `outcome` (defaults to "screened").
pub struct LogCallExecutor {
    records: Arc<dyn RecordStore>,
}

impl LogCallExecutor {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        LogCallExecutor { records }
    }
}

#[async_trait]
impl ActionExecutor for LogCallExecutor {
    fn name(&self) -> &'static str {
        "log_call"
    }

    async fn execute(
        &self,
        ctx: &CallContext,
        params: &ActionParams,
    ) -> Result<ActionOutput, ActionError> {
        let outcome = str_param(params, "outcome").unwrap_or("screened");

        self.records
            .record_call(&CallRecord {
                call_id: ctx.call_id.clone(),
                user_id: ctx.user_id.clone(),
                caller_number: ctx.caller_number.clone(),
                caller_name: ctx.caller_name.clone(),
                intent: ctx.intent.to_string(),
                outcome: outcome.to_string(),
                recorded_at: Utc::now(),
            })
            .await?;

        Ok(ActionOutput::with_data(
            format!("Call logged with outcome {outcome}"),
            json!({ "outcome": outcome }),
        ))
    }
}

/// POST a JSON payload to a configured endpoint (CRM hooks, task runners,
/// anything webhook-shaped).
///
/// Params: `url` (required, http/https only), `payload` (JSON object,
/// placeholders already resolved by the engine).
pub struct WebhookExecutor {
    client: reqwest::Client,
}

impl Default for WebhookExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookExecutor {
    pub fn new() -> Self {
        WebhookExecutor {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .user_agent("callwarden/0.1")
                .build()
                .expect("default reqwest client"),
        }
    }
}

#[async_trait]
impl ActionExecutor for WebhookExecutor {
    fn name(&self) -> &'static str {
        "generic_webhook"
    }

    async fn execute(
        &self,
        ctx: &CallContext,
        params: &ActionParams,
    ) -> Result<ActionOutput, ActionError> {
        let raw_url = str_param(params, "url").ok_or(ActionError::MissingParam("url"))?;

        let url = Url::parse(raw_url)
            .map_err(|e| ActionError::Failed(format!("invalid webhook url '{raw_url}': {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ActionError::Failed(format!(
                "unsupported webhook scheme '{}'",
                url.scheme()
            )));
        }

        let payload = params
            .get("payload")
            .cloned()
            .unwrap_or_else(|| json!({ "call_id": ctx.call_id }));

        let response = self
            .client
            .post(url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| ActionError::Failed(format!("webhook request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ActionError::Failed(format!(
                "webhook returned {status} for {url}"
            )));
        }

        log::info!("webhook delivered to {url} ({status})");
        Ok(ActionOutput::with_data(
            format!("Webhook delivered ({status})"),
            json!({ "url": url.to_string(), "status": status.as_u16() }),
        ))
    }
}
