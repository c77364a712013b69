//! Multi-source analysis orchestrator.
//!
//! Fast-paths whitelisted callers, otherwise runs intent classification and
//! fraud analysis concurrently, always runs the local heuristic scorer, and
//! fuses everything into a single `CallAssessment`.

use crate::classifier::{FraudAnalysis, IntentClassification, RemoteClassifier};
use crate::contacts::ContactLookup;
use crate::heuristic::HeuristicScorer;
use crate::types::{CallContext, Contact, Intent, Recommendation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Display/logging cap on fused red flags.
const MAX_RED_FLAGS: usize = 5;

/// Live-block gate for ongoing calls. Hanging up mid-conversation is
/// irreversible, so this sits below the 0.9 `Recommendation::Block` boundary
/// rather than sharing it. Both constants are load-bearing; see DESIGN.md.
const LIVE_BLOCK_THRESHOLD: f64 = 0.85;

/// Fused output of one analysis pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallAssessment {
    /// Max of the heuristic score and the remote fraud confidence. Either
    /// signal alone is enough to raise alarm; they are never averaged.
    pub fraud_score: f64,
    pub scam_type: Option<String>,
    /// Ordered, deduplicated, capped at 5.
    pub red_flags: Vec<String>,
    pub intent: Intent,
    pub intent_confidence: f64,
    pub recommendation: Recommendation,
}

impl CallAssessment {
    fn new(
        fraud_score: f64,
        scam_type: Option<String>,
        red_flags: Vec<String>,
        intent: Intent,
        intent_confidence: f64,
    ) -> Self {
        CallAssessment {
            fraud_score,
            scam_type,
            red_flags,
            intent,
            intent_confidence,
            recommendation: Recommendation::from_score(fraud_score),
        }
    }

    /// Assessment for a whitelisted caller: no fraud signal, relationship
    /// intent at full confidence.
    fn auto_pass(contact: &Contact) -> Self {
        CallAssessment::new(0.0, None, Vec::new(), contact.relationship_intent(), 1.0)
    }
}

/// Lightweight re-entrant result for an ongoing call whose transcript grew.
#[derive(Debug, Clone, Serialize)]
pub struct OngoingAnalysis {
    pub should_block: bool,
    pub fraud_score: f64,
    pub intent: Intent,
    pub recommendation: Recommendation,
}

pub struct AnalysisOrchestrator {
    classifier: Arc<dyn RemoteClassifier>,
    contacts: Arc<dyn ContactLookup>,
    scorer: HeuristicScorer,
}

impl AnalysisOrchestrator {
    pub fn new(classifier: Arc<dyn RemoteClassifier>, contacts: Arc<dyn ContactLookup>) -> Self {
        AnalysisOrchestrator {
            classifier,
            contacts,
            scorer: HeuristicScorer::default(),
        }
    }

    /// Whitelist fast path. Synchronous-short; never touches the classifier.
    pub async fn check_whitelist(&self, user_id: &str, caller_number: &str) -> Option<Contact> {
        let contact = self.contacts.find_by_phone(user_id, caller_number).await?;
        if contact.auto_pass {
            log::info!(
                "whitelist hit for {caller_number}: {} (auto pass)",
                contact.display_name
            );
            Some(contact)
        } else {
            log::debug!(
                "contact {} found for {caller_number} but not set to auto pass",
                contact.display_name
            );
            None
        }
    }

    /// Full analysis pass. Whitelisted callers return immediately without a
    /// single remote call; everyone else gets concurrent intent + fraud
    /// classification fused with the local heuristic score.
    pub async fn analyze(&self, ctx: &CallContext) -> CallAssessment {
        if let Some(contact) = self.check_whitelist(&ctx.user_id, &ctx.caller_number).await {
            return CallAssessment::auto_pass(&contact);
        }
        self.analyze_unlisted(ctx).await
    }

    /// Re-analyze an ongoing call on its updated transcript. Skips the
    /// whitelist (the call is already being screened) and adds the
    /// live-block gate at its own threshold.
    pub async fn analyze_ongoing(&self, ctx: &CallContext) -> OngoingAnalysis {
        let assessment = self.analyze_unlisted(ctx).await;
        let should_block = assessment.fraud_score > LIVE_BLOCK_THRESHOLD;

        if should_block {
            log::warn!(
                "live block signal for call {}: fused score {:.2}",
                ctx.call_id,
                assessment.fraud_score
            );
        }

        OngoingAnalysis {
            should_block,
            fraud_score: assessment.fraud_score,
            intent: assessment.intent,
            recommendation: assessment.recommendation,
        }
    }

    async fn analyze_unlisted(&self, ctx: &CallContext) -> CallAssessment {
        // Local scorer always runs; it is cheap and covers classifier outages.
        let heuristic = self.scorer.score(&ctx.transcript);

        // Both remote calls in flight together, joined before fusion. No
        // racing one against the other; a failure on either side degrades to
        // the safe default instead of blocking the pipeline.
        let (intent_result, fraud_result) = tokio::join!(
            self.classifier
                .classify_intent(&ctx.transcript, ctx.caller_name.as_deref()),
            self.classifier
                .analyze_fraud(&ctx.transcript, &ctx.caller_number),
        );

        let intent = intent_result.unwrap_or_else(|e| {
            log::warn!("intent classification failed for call {}: {e}", ctx.call_id);
            IntentClassification::unavailable()
        });
        let fraud = fraud_result.unwrap_or_else(|e| {
            log::warn!("fraud analysis failed for call {}: {e}", ctx.call_id);
            FraudAnalysis::unavailable()
        });

        let fused_score = heuristic.fraud_score.max(fraud.confidence);

        let mut red_flags = heuristic.red_flags.clone();
        for flag in &fraud.red_flags {
            if !red_flags.contains(flag) {
                red_flags.push(flag.clone());
            }
        }
        red_flags.truncate(MAX_RED_FLAGS);

        let scam_type = fraud.scam_type.clone().or(heuristic.scam_type.clone());

        let assessment = CallAssessment::new(
            fused_score,
            scam_type,
            red_flags,
            intent.intent,
            intent.confidence,
        );

        log::info!(
            "analysis for call {}: fraud={:.2} intent={} ({:.2}) rec={}",
            ctx.call_id,
            assessment.fraud_score,
            assessment.intent,
            assessment.intent_confidence,
            assessment.recommendation.as_str()
        );

        assessment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierError;
    use crate::contacts::StaticContacts;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Classifier fake returning fixed results and counting invocations.
    struct StubClassifier {
        intent: Intent,
        intent_confidence: f64,
        fraud_confidence: f64,
        calls: AtomicUsize,
    }

    impl StubClassifier {
        fn new(intent: Intent, intent_confidence: f64, fraud_confidence: f64) -> Self {
            StubClassifier {
                intent,
                intent_confidence,
                fraud_confidence,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteClassifier for StubClassifier {
        async fn classify_intent(
            &self,
            _transcript: &str,
            _caller_name: Option<&str>,
        ) -> Result<IntentClassification, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(IntentClassification {
                intent: self.intent,
                confidence: self.intent_confidence,
                reasoning: String::new(),
                next_question: None,
            })
        }

        async fn analyze_fraud(
            &self,
            _transcript: &str,
            _caller_number: &str,
        ) -> Result<FraudAnalysis, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FraudAnalysis {
                is_scam: self.fraud_confidence > 0.85,
                scam_type: None,
                confidence: self.fraud_confidence,
                red_flags: vec!["remote_flag".to_string()],
                recommendation: Recommendation::from_score(self.fraud_confidence),
            })
        }
    }

    /// Classifier fake that always fails.
    struct DownClassifier;

    #[async_trait]
    impl RemoteClassifier for DownClassifier {
        async fn classify_intent(
            &self,
            _transcript: &str,
            _caller_name: Option<&str>,
        ) -> Result<IntentClassification, ClassifierError> {
            Err(ClassifierError::Unavailable("connection refused".to_string()))
        }

        async fn analyze_fraud(
            &self,
            _transcript: &str,
            _caller_number: &str,
        ) -> Result<FraudAnalysis, ClassifierError> {
            Err(ClassifierError::Unavailable("connection refused".to_string()))
        }
    }

    fn whitelisted_contacts() -> Arc<StaticContacts> {
        let mut contacts = StaticContacts::new();
        contacts.insert(
            "user_1",
            Contact {
                phone_number: "+15551234567".to_string(),
                display_name: "John Smith".to_string(),
                relationship: "friend".to_string(),
                auto_pass: true,
            },
        );
        Arc::new(contacts)
    }

    fn ctx(caller_number: &str, transcript: &str) -> CallContext {
        CallContext::new("CA123", "user_1", caller_number).with_transcript(transcript)
    }

    #[tokio::test]
    async fn whitelist_short_circuits_remote_classifier() {
        let classifier = Arc::new(StubClassifier::new(Intent::Sales, 0.9, 0.9));
        let orchestrator =
            AnalysisOrchestrator::new(classifier.clone(), whitelisted_contacts());

        let assessment = orchestrator
            .analyze(&ctx("+15551234567", "hey it's john"))
            .await;

        assert_eq!(classifier.call_count(), 0);
        assert_eq!(assessment.intent, Intent::Friend);
        assert_eq!(assessment.intent_confidence, 1.0);
        assert_eq!(assessment.fraud_score, 0.0);
        assert_eq!(assessment.recommendation, Recommendation::Allow);
    }

    #[tokio::test]
    async fn non_whitelisted_caller_gets_both_remote_calls() {
        let classifier = Arc::new(StubClassifier::new(Intent::Friend, 0.9, 0.1));
        let orchestrator =
            AnalysisOrchestrator::new(classifier.clone(), whitelisted_contacts());

        let _ = orchestrator
            .analyze(&ctx("+15550000000", "hi, it's dave about saturday"))
            .await;

        assert_eq!(classifier.call_count(), 2);
    }

    #[tokio::test]
    async fn fusion_takes_max_of_heuristic_and_remote() {
        // Remote sees nothing; the heuristic tier catches the IRS script.
        let classifier = Arc::new(StubClassifier::new(Intent::Unknown, 0.2, 0.1));
        let orchestrator = AnalysisOrchestrator::new(classifier, whitelisted_contacts());

        let scam = orchestrator
            .analyze(&ctx(
                "+15550000000",
                "this is the irs, there is a warrant for your arrest, act now and \
                 confirm your social security number or face legal action, pay by wire transfer",
            ))
            .await;
        assert!(scam.fraud_score >= 0.85);

        // Clean transcript, high remote signal: remote side wins the max.
        let classifier = Arc::new(StubClassifier::new(Intent::Scam, 0.9, 0.92));
        let orchestrator = AnalysisOrchestrator::new(classifier, whitelisted_contacts());

        let remote = orchestrator
            .analyze(&ctx("+15550000000", "hello, quick question about a delivery"))
            .await;
        assert!((remote.fraud_score - 0.92).abs() < 1e-9);
        assert_eq!(remote.recommendation, Recommendation::Block);
    }

    #[tokio::test]
    async fn classifier_outage_degrades_to_heuristic_only() {
        let orchestrator =
            AnalysisOrchestrator::new(Arc::new(DownClassifier), whitelisted_contacts());

        let assessment = orchestrator
            .analyze(&ctx(
                "+15550000000",
                "this is the irs, act now or there will be a warrant and legal action, \
                 confirm your social security number and pay by wire transfer",
            ))
            .await;

        // Intent degrades to unknown at zero confidence; fraud score still
        // reflects the local heuristic pass.
        assert_eq!(assessment.intent, Intent::Unknown);
        assert_eq!(assessment.intent_confidence, 0.0);
        assert!(assessment.fraud_score >= 0.85);
    }

    #[tokio::test]
    async fn live_block_and_recommendation_thresholds_stay_distinct() {
        for (score, expect_block_rec, expect_live_block) in [
            (0.84, false, false),
            (0.86, false, true),
            (0.89, false, true),
            (0.91, true, true),
        ] {
            let classifier = Arc::new(StubClassifier::new(Intent::Unknown, 0.1, score));
            let orchestrator =
                AnalysisOrchestrator::new(classifier, Arc::new(StaticContacts::new()));
            let context = ctx("+15550000000", "hello there, quick question");

            let assessment = orchestrator.analyze(&context).await;
            assert_eq!(
                assessment.recommendation == Recommendation::Block,
                expect_block_rec,
                "recommendation at {score}"
            );

            let ongoing = orchestrator.analyze_ongoing(&context).await;
            assert_eq!(
                ongoing.should_block, expect_live_block,
                "live block at {score}"
            );
        }
    }

    #[tokio::test]
    async fn red_flags_merge_without_duplicates() {
        let classifier = Arc::new(StubClassifier::new(Intent::Unknown, 0.1, 0.5));
        let orchestrator = AnalysisOrchestrator::new(classifier, Arc::new(StaticContacts::new()));

        let assessment = orchestrator
            .analyze(&ctx("+15550000000", "we need payment immediately"))
            .await;

        assert!(assessment.red_flags.contains(&"remote_flag".to_string()));
        assert!(assessment.red_flags.len() <= 5);
        let mut deduped = assessment.red_flags.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), assessment.red_flags.len());
    }
}
