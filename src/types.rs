use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Caller intent, as classified from the transcript so far.
/// Reclassification replaces the previous value, it never accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Friend,
    Family,
    Appointment,
    Sales,
    Scam,
    #[default]
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Friend => "friend",
            Intent::Family => "family",
            Intent::Appointment => "appointment",
            Intent::Sales => "sales",
            Intent::Scam => "scam",
            Intent::Unknown => "unknown",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "friend" => Intent::Friend,
            "family" => Intent::Family,
            "appointment" => Intent::Appointment,
            "sales" => Intent::Sales,
            "scam" => Intent::Scam,
            _ => Intent::Unknown,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived routing recommendation attached to a `CallAssessment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Block,
    Flag,
    #[default]
    Allow,
}

impl Recommendation {
    /// Map a fused fraud score onto a recommendation label.
    /// 0.9 and up blocks, the 0.7..0.9 band flags, everything else allows.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            Recommendation::Block
        } else if score >= 0.7 {
            Recommendation::Flag
        } else {
            Recommendation::Allow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Block => "block",
            Recommendation::Flag => "flag",
            Recommendation::Allow => "allow",
        }
    }
}

/// Per-call mutable state. Owned exclusively by the task screening the call;
/// created on call start, discarded when the call ends. Never persisted here:
/// durable records go through the `RecordStore` collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallContext {
    pub call_id: String,
    pub user_id: String,
    /// Display name of the screened user, used in caller-facing messages.
    pub user_name: String,
    /// E.164 caller number.
    pub caller_number: String,
    /// Caller-supplied name. Untrusted.
    pub caller_name: Option<String>,
    /// Append-only transcript text, grows as speech arrives.
    pub transcript: String,
    pub intent: Intent,
    pub intent_confidence: f64,
    pub fraud_score: f64,
    pub is_emergency: bool,
    /// Open map for workflow-specific data.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CallContext {
    pub fn new(call_id: &str, user_id: &str, caller_number: &str) -> Self {
        CallContext {
            call_id: call_id.to_string(),
            user_id: user_id.to_string(),
            caller_number: caller_number.to_string(),
            ..Default::default()
        }
    }

    pub fn with_transcript(mut self, transcript: &str) -> Self {
        self.transcript = transcript.to_string();
        self
    }

    pub fn with_caller_name(mut self, name: &str) -> Self {
        self.caller_name = Some(name.to_string());
        self
    }

    pub fn with_user_name(mut self, name: &str) -> Self {
        self.user_name = name.to_string();
        self
    }
}

/// Whitelist entry, owned by the external contact store. Read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub phone_number: String,
    pub display_name: String,
    pub relationship: String,
    pub auto_pass: bool,
}

impl Contact {
    /// Intent implied by the stored relationship, used when a whitelisted
    /// caller skips classification entirely.
    pub fn relationship_intent(&self) -> Intent {
        match self.relationship.to_lowercase().as_str() {
            "family" | "spouse" | "parent" | "child" => Intent::Family,
            _ => Intent::Friend,
        }
    }
}

/// Imperative routing instruction handed back to the telephony gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAction {
    PassThrough,
    ScreenContinue,
    Block,
}

impl RouteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteAction::PassThrough => "pass_through",
            RouteAction::ScreenContinue => "screen_continue",
            RouteAction::Block => "block",
        }
    }
}

/// Final routing decision for a call, including the line the screening agent
/// speaks to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub action: RouteAction,
    pub reason: String,
    pub message: String,
    pub confidence: f64,
}

/// Inbound event from the telephony collaborator: a new call was accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct CallStarted {
    pub call_id: String,
    pub user_id: String,
    pub caller_number: String,
}

/// Inbound event from the conversational agent: the transcript grew.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptUpdated {
    pub call_id: String,
    pub transcript: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommendation_bands() {
        assert_eq!(Recommendation::from_score(0.95), Recommendation::Block);
        assert_eq!(Recommendation::from_score(0.9), Recommendation::Block);
        assert_eq!(Recommendation::from_score(0.89), Recommendation::Flag);
        assert_eq!(Recommendation::from_score(0.7), Recommendation::Flag);
        assert_eq!(Recommendation::from_score(0.69), Recommendation::Allow);
        assert_eq!(Recommendation::from_score(0.0), Recommendation::Allow);
    }

    #[test]
    fn intent_round_trip() {
        for intent in [
            Intent::Friend,
            Intent::Family,
            Intent::Appointment,
            Intent::Sales,
            Intent::Scam,
            Intent::Unknown,
        ] {
            assert_eq!(Intent::from_str_lossy(intent.as_str()), intent);
        }
        assert_eq!(Intent::from_str_lossy("telemarketer"), Intent::Unknown);
    }

    #[test]
    fn relationship_maps_to_intent() {
        let family = Contact {
            phone_number: "+15551230001".to_string(),
            display_name: "Mom".to_string(),
            relationship: "Family".to_string(),
            auto_pass: true,
        };
        assert_eq!(family.relationship_intent(), Intent::Family);

        let friend = Contact {
            phone_number: "+15551230002".to_string(),
            display_name: "John Smith".to_string(),
            relationship: "friend".to_string(),
            auto_pass: true,
        };
        assert_eq!(friend.relationship_intent(), Intent::Friend);
    }
}
