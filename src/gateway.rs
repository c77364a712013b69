//! Collaborator capabilities the core delegates side effects to.
//!
//! Everything here is an abstract seam: the real implementations (telephony
//! provider, mail relay, calendar API, durable store) live outside this
//! crate. The `log_only` implementations back demo mode and keep the binary
//! runnable without any provider credentials.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A collaborator call failed. Executors convert this into a recorded
/// per-action failure; it never aborts a workflow.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct GatewayError(pub String);

/// Telephony signaling: bridge, terminate, and notify over SMS.
#[async_trait]
pub trait TelephonyGateway: Send + Sync {
    async fn dial_user(&self, user_phone: &str, call_id: &str) -> Result<(), GatewayError>;
    async fn hangup(&self, call_id: &str) -> Result<(), GatewayError>;
    async fn send_sms(&self, to: &str, body: &str) -> Result<(), GatewayError>;
}

/// Minimal user profile lookup (the screened user's own phone number).
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn phone_number_for(&self, user_id: &str) -> Option<String>;
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), GatewayError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub duration_minutes: i64,
    pub attendees: Vec<String>,
}

#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Whether the user is free for `duration_minutes` starting at `start`.
    async fn is_free(&self, start: DateTime<Utc>, duration_minutes: i64)
        -> Result<bool, GatewayError>;

    /// Create an event and return its identifier.
    async fn create_event(&self, event: &CalendarEvent) -> Result<String, GatewayError>;
}

/// Durable screening record handed to the external record store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub call_id: String,
    pub user_id: String,
    pub caller_number: String,
    pub caller_name: Option<String>,
    pub intent: String,
    pub outcome: String,
    pub recorded_at: DateTime<Utc>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn record_call(&self, record: &CallRecord) -> Result<(), GatewayError>;
}

/// Log-only collaborator implementations for demo mode and local testing.
pub mod log_only {
    use super::*;
    use std::sync::Mutex;

    pub struct LogTelephony;

    #[async_trait]
    impl TelephonyGateway for LogTelephony {
        async fn dial_user(&self, user_phone: &str, call_id: &str) -> Result<(), GatewayError> {
            log::info!("[telephony] dialing {user_phone} for call {call_id}");
            Ok(())
        }

        async fn hangup(&self, call_id: &str) -> Result<(), GatewayError> {
            log::info!("[telephony] hanging up call {call_id}");
            Ok(())
        }

        async fn send_sms(&self, to: &str, body: &str) -> Result<(), GatewayError> {
            log::info!("[telephony] sms to {to}: {body}");
            Ok(())
        }
    }

    /// Single-user directory seeded from configuration.
    pub struct StaticUserDirectory {
        pub user_id: String,
        pub phone_number: String,
    }

    #[async_trait]
    impl UserDirectory for StaticUserDirectory {
        async fn phone_number_for(&self, user_id: &str) -> Option<String> {
            (user_id == self.user_id).then(|| self.phone_number.clone())
        }
    }

    pub struct LogEmail;

    #[async_trait]
    impl EmailSender for LogEmail {
        async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), GatewayError> {
            log::info!("[email] to {to}: {subject} ({} bytes)", body.len());
            Ok(())
        }
    }

    pub struct LogCalendar;

    #[async_trait]
    impl CalendarService for LogCalendar {
        async fn is_free(
            &self,
            start: DateTime<Utc>,
            duration_minutes: i64,
        ) -> Result<bool, GatewayError> {
            log::info!("[calendar] availability check at {start} for {duration_minutes}m");
            Ok(true)
        }

        async fn create_event(&self, event: &CalendarEvent) -> Result<String, GatewayError> {
            log::info!("[calendar] creating event '{}' at {}", event.title, event.start);
            Ok(format!("evt-{}", event.start.timestamp()))
        }
    }

    /// In-memory record store. Also the test double for persistence checks.
    #[derive(Default)]
    pub struct MemoryRecordStore {
        records: Mutex<Vec<CallRecord>>,
    }

    impl MemoryRecordStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn records(&self) -> Vec<CallRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecordStore for MemoryRecordStore {
        async fn record_call(&self, record: &CallRecord) -> Result<(), GatewayError> {
            log::info!(
                "[records] call {} recorded with outcome {}",
                record.call_id,
                record.outcome
            );
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }
}
