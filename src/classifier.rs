//! Remote classifier abstraction.
//!
//! The orchestrator only ever talks to the `RemoteClassifier` trait; which
//! LLM or service sits behind it is a deployment concern. Two adapters ship
//! here: a provider-agnostic HTTP adapter and a keyword-backed local
//! classifier used by demo mode and tests.

use crate::types::{Intent, Recommendation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// A remote classification call failed. Always recoverable: the orchestrator
/// degrades to heuristic-only signals instead of blocking the pipeline.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
}

/// Intent classification result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentClassification {
    pub intent: Intent,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    /// Suggested follow-up when the classifier is unsure.
    #[serde(default)]
    pub next_question: Option<String>,
}

impl IntentClassification {
    /// Safe default substituted when the remote call fails.
    pub fn unavailable() -> Self {
        IntentClassification {
            intent: Intent::Unknown,
            confidence: 0.0,
            reasoning: "classifier unavailable".to_string(),
            next_question: None,
        }
    }
}

/// Fraud analysis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudAnalysis {
    pub is_scam: bool,
    #[serde(default)]
    pub scam_type: Option<String>,
    pub confidence: f64,
    #[serde(default)]
    pub red_flags: Vec<String>,
    #[serde(default)]
    pub recommendation: Recommendation,
}

impl FraudAnalysis {
    /// Safe default substituted when the remote call fails.
    pub fn unavailable() -> Self {
        FraudAnalysis {
            is_scam: false,
            scam_type: None,
            confidence: 0.0,
            red_flags: Vec::new(),
            recommendation: Recommendation::Allow,
        }
    }
}

/// External intent/fraud classification capability. The only component in
/// this crate allowed to perform network I/O with non-trivial latency.
#[async_trait]
pub trait RemoteClassifier: Send + Sync {
    async fn classify_intent(
        &self,
        transcript: &str,
        caller_name: Option<&str>,
    ) -> Result<IntentClassification, ClassifierError>;

    async fn analyze_fraud(
        &self,
        transcript: &str,
        caller_number: &str,
    ) -> Result<FraudAnalysis, ClassifierError>;
}

/// Generic JSON-over-HTTP classifier adapter. Posts the transcript to
/// `<endpoint>/intent` and `<endpoint>/fraud` and expects the result shapes
/// above. Timeout policy lives here, not in the orchestrator.
pub struct HttpClassifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(endpoint: &str, timeout_seconds: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent("callwarden/0.1")
            .build()?;
        Ok(HttpClassifier {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Serialize)]
struct IntentRequest<'a> {
    transcript: &'a str,
    caller_name: Option<&'a str>,
}

#[derive(Serialize)]
struct FraudRequest<'a> {
    transcript: &'a str,
    caller_number: &'a str,
}

#[async_trait]
impl RemoteClassifier for HttpClassifier {
    async fn classify_intent(
        &self,
        transcript: &str,
        caller_name: Option<&str>,
    ) -> Result<IntentClassification, ClassifierError> {
        let url = format!("{}/intent", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&IntentRequest {
                transcript,
                caller_name,
            })
            .send()
            .await
            .map_err(|e| ClassifierError::Unavailable(format!("intent request: {e}")))?;

        if !response.status().is_success() {
            return Err(ClassifierError::Unavailable(format!(
                "intent endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<IntentClassification>()
            .await
            .map_err(|e| ClassifierError::Unavailable(format!("intent response parse: {e}")))
    }

    async fn analyze_fraud(
        &self,
        transcript: &str,
        caller_number: &str,
    ) -> Result<FraudAnalysis, ClassifierError> {
        let url = format!("{}/fraud", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&FraudRequest {
                transcript,
                caller_number,
            })
            .send()
            .await
            .map_err(|e| ClassifierError::Unavailable(format!("fraud request: {e}")))?;

        if !response.status().is_success() {
            return Err(ClassifierError::Unavailable(format!(
                "fraud endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<FraudAnalysis>()
            .await
            .map_err(|e| ClassifierError::Unavailable(format!("fraud response parse: {e}")))
    }
}

/// Local keyword-backed classifier. No network, deterministic. Used by demo
/// mode and as a drop-in stand-in where no remote endpoint is configured.
#[derive(Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        KeywordClassifier
    }
}

#[async_trait]
impl RemoteClassifier for KeywordClassifier {
    async fn classify_intent(
        &self,
        transcript: &str,
        caller_name: Option<&str>,
    ) -> Result<IntentClassification, ClassifierError> {
        let lower = transcript.to_lowercase();

        let (intent, confidence, reasoning) = if lower.contains("irs")
            || lower.contains("warrant")
            || lower.contains("social security")
        {
            (Intent::Scam, 0.9, "scam phrasing in transcript")
        } else if lower.contains("warranty")
            || lower.contains("special offer")
            || lower.contains("limited time")
            || lower.contains("promotion")
        {
            (Intent::Sales, 0.85, "solicitation phrasing in transcript")
        } else if lower.contains("appointment")
            || lower.contains("reschedule")
            || lower.contains("confirm your visit")
        {
            (Intent::Appointment, 0.8, "scheduling phrasing in transcript")
        } else if lower.contains("mom") || lower.contains("dad") || lower.contains("your sister") {
            (Intent::Family, 0.75, "family reference in transcript")
        } else if caller_name.is_some()
            && (lower.contains("it's me") || lower.contains("coffee") || lower.contains("dinner"))
        {
            (Intent::Friend, 0.75, "personal phrasing with a named caller")
        } else {
            (Intent::Unknown, 0.3, "no strong signal")
        };

        Ok(IntentClassification {
            intent,
            confidence,
            reasoning: reasoning.to_string(),
            next_question: None,
        })
    }

    async fn analyze_fraud(
        &self,
        transcript: &str,
        _caller_number: &str,
    ) -> Result<FraudAnalysis, ClassifierError> {
        let lower = transcript.to_lowercase();
        let mut red_flags = Vec::new();
        let mut confidence: f64 = 0.0;

        for (phrase, weight) in [
            ("irs", 0.5),
            ("warrant", 0.4),
            ("gift card", 0.4),
            ("wire transfer", 0.3),
            ("social security", 0.3),
            ("act now", 0.2),
        ] {
            if lower.contains(phrase) {
                red_flags.push(phrase.to_string());
                confidence += weight;
            }
        }

        let confidence = confidence.min(1.0);
        Ok(FraudAnalysis {
            is_scam: confidence > 0.85,
            scam_type: None,
            confidence,
            red_flags,
            recommendation: Recommendation::from_score(confidence),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keyword_classifier_flags_scam_phrasing() {
        let classifier = KeywordClassifier::new();
        let intent = classifier
            .classify_intent("this is the irs calling about a warrant", None)
            .await
            .unwrap();
        assert_eq!(intent.intent, Intent::Scam);

        let fraud = classifier
            .analyze_fraud("irs warrant gift card", "+15550001111")
            .await
            .unwrap();
        assert!(fraud.is_scam);
        assert!(fraud.confidence > 0.85);
    }

    #[tokio::test]
    async fn keyword_classifier_spots_sales() {
        let classifier = KeywordClassifier::new();
        let intent = classifier
            .classify_intent("calling about your extended warranty options", None)
            .await
            .unwrap();
        assert_eq!(intent.intent, Intent::Sales);
        assert!(intent.confidence >= 0.8);
    }

    #[test]
    fn unavailable_defaults_are_safe() {
        let intent = IntentClassification::unavailable();
        assert_eq!(intent.intent, Intent::Unknown);
        assert_eq!(intent.confidence, 0.0);

        let fraud = FraudAnalysis::unavailable();
        assert!(!fraud.is_scam);
        assert_eq!(fraud.recommendation, Recommendation::Allow);
    }
}
