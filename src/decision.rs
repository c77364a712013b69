//! Final routing decision table.
//!
//! A strict, ordered table over the fused assessment: the first matching rule
//! wins. Scam blocking dominates everything, sales rejection comes next, and
//! only then do positive signals earn a pass-through. An ambiguous call never
//! defaults to pass-through.

use crate::orchestrator::CallAssessment;
use crate::types::{Decision, Intent, RouteAction};

/// Fused fraud score at which a call is blocked outright.
const SCAM_BLOCK_THRESHOLD: f64 = 0.85;
/// Sales calls are declined once the classifier is at least this confident.
const SALES_BLOCK_CONFIDENCE: f64 = 0.8;
/// Friends, family, and appointments need this much confidence to act on.
const POSITIVE_INTENT_CONFIDENCE: f64 = 0.7;

#[derive(Default)]
pub struct DecisionEngine;

impl DecisionEngine {
    pub fn new() -> Self {
        DecisionEngine
    }

    /// Map an assessment to a routing decision. `user_name` is the screened
    /// user's display name, spoken in caller-facing messages.
    pub fn decide(&self, assessment: &CallAssessment, user_name: &str) -> Decision {
        // Rule 1: scams are blocked before any other signal is considered.
        if assessment.fraud_score >= SCAM_BLOCK_THRESHOLD {
            log::warn!(
                "blocking scam call: score {:.2}, type {:?}",
                assessment.fraud_score,
                assessment.scam_type
            );
            return Decision {
                action: RouteAction::Block,
                reason: "scam_detected".to_string(),
                message: "I'm not able to help with that. Goodbye.".to_string(),
                confidence: assessment.fraud_score,
            };
        }

        // Rule 2: confident sales calls are politely declined.
        if assessment.intent == Intent::Sales
            && assessment.intent_confidence >= SALES_BLOCK_CONFIDENCE
        {
            log::info!("declining sales call ({:.2})", assessment.intent_confidence);
            return Decision {
                action: RouteAction::Block,
                reason: "sales_call".to_string(),
                message: format!(
                    "Thank you for calling, but {user_name} is not interested in any \
                     offers at this time. Have a great day!"
                ),
                confidence: assessment.intent_confidence,
            };
        }

        // Rule 3: confident friends and family pass through.
        if matches!(assessment.intent, Intent::Friend | Intent::Family)
            && assessment.intent_confidence >= POSITIVE_INTENT_CONFIDENCE
        {
            log::info!(
                "passing {} call through ({:.2})",
                assessment.intent,
                assessment.intent_confidence
            );
            return Decision {
                action: RouteAction::PassThrough,
                reason: "friend_or_family".to_string(),
                message: format!("Let me connect you to {user_name}. One moment please."),
                confidence: assessment.intent_confidence,
            };
        }

        // Rule 4: appointments are handled conversationally, never bridged.
        if assessment.intent == Intent::Appointment
            && assessment.intent_confidence >= POSITIVE_INTENT_CONFIDENCE
        {
            return Decision {
                action: RouteAction::ScreenContinue,
                reason: "appointment_handling".to_string(),
                message: "I can help you with that. Are you looking to schedule, \
                          reschedule, or cancel an appointment?"
                    .to_string(),
                confidence: assessment.intent_confidence,
            };
        }

        // Fallback: keep screening with a clarifying question.
        Decision {
            action: RouteAction::ScreenContinue,
            reason: "unknown_intent".to_string(),
            message: clarifying_question(assessment.intent).to_string(),
            confidence: assessment.intent_confidence,
        }
    }
}

/// Follow-up question chosen by suspected intent when confidence is too low
/// to act. Anything without an entry gets the generic prompt.
pub fn clarifying_question(suspected: Intent) -> &'static str {
    match suspected {
        Intent::Friend => "May I ask your name and how you know them?",
        Intent::Sales => "Are you calling to offer a product or service?",
        Intent::Appointment => "Are you calling to schedule, reschedule, or confirm an appointment?",
        Intent::Scam => "Can you provide a callback number and reference number for this matter?",
        _ => "May I ask what you're calling about?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Recommendation;

    fn assessment(fraud: f64, intent: Intent, confidence: f64) -> CallAssessment {
        CallAssessment {
            fraud_score: fraud,
            scam_type: None,
            red_flags: Vec::new(),
            intent,
            intent_confidence: confidence,
            recommendation: Recommendation::from_score(fraud),
        }
    }

    #[test]
    fn scam_rule_dominates_friend_signal() {
        let engine = DecisionEngine::new();
        let decision = engine.decide(&assessment(0.9, Intent::Friend, 0.95), "Sarah");

        assert_eq!(decision.action, RouteAction::Block);
        assert_eq!(decision.reason, "scam_detected");
    }

    #[test]
    fn confident_sales_call_is_declined_by_name() {
        let engine = DecisionEngine::new();
        let decision = engine.decide(&assessment(0.2, Intent::Sales, 0.85), "Sarah");

        assert_eq!(decision.action, RouteAction::Block);
        assert_eq!(decision.reason, "sales_call");
        assert!(decision.message.contains("Sarah"));
    }

    #[test]
    fn unconfident_sales_call_keeps_screening() {
        let engine = DecisionEngine::new();
        let decision = engine.decide(&assessment(0.2, Intent::Sales, 0.6), "Sarah");

        assert_eq!(decision.action, RouteAction::ScreenContinue);
        assert_eq!(decision.reason, "unknown_intent");
        assert_eq!(
            decision.message,
            "Are you calling to offer a product or service?"
        );
    }

    #[test]
    fn friend_and_family_pass_through() {
        let engine = DecisionEngine::new();

        let friend = engine.decide(&assessment(0.1, Intent::Friend, 0.9), "Sarah");
        assert_eq!(friend.action, RouteAction::PassThrough);
        assert_eq!(friend.reason, "friend_or_family");
        assert!(friend.message.contains("Sarah"));

        let family = engine.decide(&assessment(0.1, Intent::Family, 0.75), "Sarah");
        assert_eq!(family.action, RouteAction::PassThrough);
    }

    #[test]
    fn appointments_are_screened_never_bridged() {
        let engine = DecisionEngine::new();
        let decision = engine.decide(&assessment(0.1, Intent::Appointment, 0.75), "Sarah");

        assert_eq!(decision.action, RouteAction::ScreenContinue);
        assert_eq!(decision.reason, "appointment_handling");
    }

    #[test]
    fn unknown_intent_gets_generic_question() {
        let engine = DecisionEngine::new();
        let decision = engine.decide(&assessment(0.1, Intent::Unknown, 0.3), "Sarah");

        assert_eq!(decision.action, RouteAction::ScreenContinue);
        assert_eq!(decision.message, "May I ask what you're calling about?");
    }

    #[test]
    fn suspected_scam_below_threshold_gets_probing_question() {
        let engine = DecisionEngine::new();
        let decision = engine.decide(&assessment(0.5, Intent::Scam, 0.6), "Sarah");

        assert_eq!(decision.action, RouteAction::ScreenContinue);
        assert_eq!(
            decision.message,
            "Can you provide a callback number and reference number for this matter?"
        );
    }
}
