//! Notification executors: SMS and email.

use super::{str_param, ActionError, ActionExecutor, ActionOutput, ActionParams};
use crate::gateway::{EmailSender, TelephonyGateway};
use crate::types::CallContext;
use crate::workflow::template::{clock_time, PlaceholderContext};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// Send an SMS to a configured recipient.
///
/// Params: `to` (required), and either `message` (free text, placeholders
/// supported) or `template` (a named canned message below).
pub struct SendSmsExecutor {
    telephony: Arc<dyn TelephonyGateway>,
}

impl SendSmsExecutor {
    pub fn new(telephony: Arc<dyn TelephonyGateway>) -> Self {
        SendSmsExecutor { telephony }
    }

    fn template_body(name: &str) -> &'static str {
        match name {
            "missed_call" => "Missed call from {{caller_name}} at {{time}}",
            "emergency" => "EMERGENCY CALL from {{caller_name}} - {{caller_number}}",
            "appointment_confirmed" => "Appointment scheduled with {{caller_name}}",
            "scam_blocked" => "Blocked scam call from {{caller_number}}",
            _ => "Call from {{caller_name}}",
        }
    }
}

#[async_trait]
impl ActionExecutor for SendSmsExecutor {
    fn name(&self) -> &'static str {
        "send_sms"
    }

    async fn execute(
        &self,
        ctx: &CallContext,
        params: &ActionParams,
    ) -> Result<ActionOutput, ActionError> {
        let to = str_param(params, "to").ok_or(ActionError::MissingParam("to"))?;

        // Named templates are internal text, so they get their own
        // placeholder pass; a `message` param was already resolved by the
        // engine but re-resolving is harmless (substitution is idempotent).
        let body = match str_param(params, "template") {
            Some(template) => {
                let placeholders = PlaceholderContext::new(ctx, &clock_time());
                placeholders.resolve(Self::template_body(template))
            }
            None => str_param(params, "message").unwrap_or_default().to_string(),
        };

        self.telephony.send_sms(to, &body).await?;
        log::info!("sms sent to {to}");

        Ok(ActionOutput::with_data(
            "SMS sent successfully",
            json!({ "to": to, "message": body }),
        ))
    }
}

/// Send an email summary.
///
/// Params: `to` (required), `subject` (defaults to a caller line), `body`.
pub struct SendEmailExecutor {
    email: Arc<dyn EmailSender>,
}

impl SendEmailExecutor {
    pub fn new(email: Arc<dyn EmailSender>) -> Self {
        SendEmailExecutor { email }
    }
}

#[async_trait]
impl ActionExecutor for SendEmailExecutor {
    fn name(&self) -> &'static str {
        "send_email"
    }

    async fn execute(
        &self,
        ctx: &CallContext,
        params: &ActionParams,
    ) -> Result<ActionOutput, ActionError> {
        let to = str_param(params, "to").ok_or(ActionError::MissingParam("to"))?;

        let placeholders = PlaceholderContext::new(ctx, &clock_time());
        let subject = match str_param(params, "subject") {
            Some(subject) => subject.to_string(),
            None => placeholders.resolve("Call from {{caller_name}}"),
        };
        let body = str_param(params, "body").unwrap_or_default().to_string();

        self.email.send(to, &subject, &body).await?;
        log::info!("email sent to {to}");

        Ok(ActionOutput::with_data(
            "Email sent successfully",
            json!({ "to": to, "subject": subject }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::log_only::{LogEmail, LogTelephony};
    use serde_json::Value;
    use std::collections::HashMap;

    fn ctx() -> CallContext {
        CallContext::new("CA123", "user_1", "+15550001111").with_caller_name("John Smith")
    }

    fn params(pairs: &[(&str, &str)]) -> ActionParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect::<HashMap<_, _>>()
    }

    #[tokio::test]
    async fn sms_requires_a_recipient() {
        let executor = SendSmsExecutor::new(Arc::new(LogTelephony));
        let result = executor
            .execute(&ctx(), &params(&[("message", "hello")]))
            .await;
        assert!(matches!(result, Err(ActionError::MissingParam("to"))));
    }

    #[tokio::test]
    async fn sms_template_renders_caller_fields() {
        let executor = SendSmsExecutor::new(Arc::new(LogTelephony));
        let output = executor
            .execute(
                &ctx(),
                &params(&[("to", "+15559990000"), ("template", "scam_blocked")]),
            )
            .await
            .unwrap();

        let data = output.data.unwrap();
        assert_eq!(
            data["message"].as_str().unwrap(),
            "Blocked scam call from +15550001111"
        );
    }

    #[tokio::test]
    async fn email_defaults_subject_to_caller_line() {
        let executor = SendEmailExecutor::new(Arc::new(LogEmail));
        let output = executor
            .execute(
                &ctx(),
                &params(&[("to", "sarah@example.com"), ("body", "summary text")]),
            )
            .await
            .unwrap();

        let data = output.data.unwrap();
        assert_eq!(data["subject"].as_str().unwrap(), "Call from John Smith");
    }
}
