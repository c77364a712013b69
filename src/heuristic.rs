//! Local heuristic fraud scorer.
//!
//! Pure keyword/pattern analysis over the call transcript, no network or disk
//! access. Runs on every analysis pass in addition to the remote classifier,
//! so it has to stay in the microsecond-to-low-millisecond range for
//! transcripts up to a few KB.

use regex::Regex;
use std::time::{Duration, Instant};

/// How many red flag labels survive truncation for display/logging.
const MAX_RED_FLAGS: usize = 5;

/// Score contributed once per keyword category with at least one hit.
const CATEGORY_WEIGHT: f64 = 0.4;

/// Pattern tier weights.
const URGENCY_WEIGHT: f64 = 0.2;
const MONEY_WEIGHT: f64 = 0.25;
const PII_WEIGHT: f64 = 0.15;
const THREAT_WEIGHT: f64 = 0.3;

/// Adjustment tier weights.
const CO_OCCURRENCE_BONUS: f64 = 0.15;
const ROBOCALL_BONUS: f64 = 0.1;
const PHONE_NUMBER_BONUS: f64 = 0.05;
const URL_BONUS: f64 = 0.05;

/// A score above this labels the transcript as a scam outright.
const SCAM_THRESHOLD: f64 = 0.85;

/// Scam keyword categories, in `scam_type` precedence order. `Financial` has
/// no type label of its own and falls through to "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScamCategory {
    Irs,
    TechSupport,
    SocialSecurity,
    LegalThreats,
    Financial,
    Warranty,
    Grandparent,
}

impl ScamCategory {
    fn name(&self) -> &'static str {
        match self {
            ScamCategory::Irs => "irs",
            ScamCategory::TechSupport => "tech_support",
            ScamCategory::SocialSecurity => "social_security",
            ScamCategory::LegalThreats => "legal_threats",
            ScamCategory::Financial => "financial",
            ScamCategory::Warranty => "warranty",
            ScamCategory::Grandparent => "grandparent",
        }
    }

    /// Label reported as `scam_type` when this category wins precedence.
    fn scam_type(&self) -> Option<&'static str> {
        match self {
            ScamCategory::Irs => Some("irs"),
            ScamCategory::TechSupport => Some("tech_support"),
            ScamCategory::SocialSecurity => Some("social_security"),
            ScamCategory::LegalThreats => Some("warrant"),
            ScamCategory::Warranty => Some("warranty"),
            ScamCategory::Grandparent => Some("grandparent"),
            ScamCategory::Financial => None,
        }
    }
}

/// Result of one scoring pass.
#[derive(Debug, Clone)]
pub struct HeuristicResult {
    /// Additive score, clamped to [0, 1].
    pub fraud_score: f64,
    /// Best-precedence scam type among matched categories, "unknown" when
    /// only unlabeled categories matched, `None` when no keywords hit.
    pub scam_type: Option<String>,
    /// Matched indicators in discovery order, deduplicated, capped at 5.
    pub red_flags: Vec<String>,
    /// Wall-clock cost of the pass, for latency logging.
    pub elapsed: Duration,
}

impl HeuristicResult {
    /// Outright scam label. Not stored, always derived from the score.
    pub fn is_scam(&self) -> bool {
        self.fraud_score > SCAM_THRESHOLD
    }
}

/// Tier toggles. All tiers on in production; tests switch individual tiers
/// off to pin down each contribution.
#[derive(Debug, Clone)]
pub struct HeuristicConfig {
    pub keyword_tier: bool,
    pub pattern_tier: bool,
    pub adjustment_tier: bool,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        HeuristicConfig {
            keyword_tier: true,
            pattern_tier: true,
            adjustment_tier: true,
        }
    }
}

pub struct HeuristicScorer {
    config: HeuristicConfig,
    keywords: Vec<(ScamCategory, Vec<&'static str>)>,
    urgency_phrases: Vec<&'static str>,
    money_phrases: Vec<&'static str>,
    pii_phrases: Vec<&'static str>,
    threat_phrases: Vec<&'static str>,
    phone_pattern: Regex,
    url_pattern: Regex,
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self::new(HeuristicConfig::default())
    }
}

impl HeuristicScorer {
    pub fn new(config: HeuristicConfig) -> Self {
        HeuristicScorer {
            config,
            keywords: Self::keyword_table(),
            urgency_phrases: vec![
                "immediately",
                "right now",
                "urgent",
                "emergency",
                "within 24 hours",
                "limited time",
                "act now",
                "expires today",
                "final notice",
                "last chance",
                "don't wait",
                "time sensitive",
            ],
            money_phrases: vec![
                "send money",
                "wire transfer",
                "payment",
                "pay now",
                "gift card",
                "bitcoin",
                "cash",
                "credit card",
                "bank account",
                "routing number",
                "$",
            ],
            pii_phrases: vec![
                "social security number",
                "ssn",
                "credit card",
                "bank account",
                "password",
                "verify your",
                "confirm your",
                "provide your",
            ],
            threat_phrases: vec![
                "arrest",
                "warrant",
                "police",
                "lawsuit",
                "legal action",
                "suspended",
                "frozen account",
                "investigation",
            ],
            phone_pattern: Regex::new(r"\d{3}[-.\s]?\d{3}[-.\s]?\d{4}").unwrap(),
            url_pattern: Regex::new(r"https?://|www\.").unwrap(),
        }
    }

    fn keyword_table() -> Vec<(ScamCategory, Vec<&'static str>)> {
        vec![
            (
                ScamCategory::Irs,
                vec![
                    "irs",
                    "internal revenue",
                    "tax refund",
                    "owe taxes",
                    "tax fraud",
                    "tax debt",
                ],
            ),
            (
                ScamCategory::TechSupport,
                vec![
                    "microsoft support",
                    "apple support",
                    "windows support",
                    "computer virus",
                    "malware",
                    "hacked",
                    "remote access",
                    "tech support",
                ],
            ),
            (
                ScamCategory::SocialSecurity,
                vec![
                    "social security",
                    "ssn suspended",
                    "social security number",
                    "benefits suspended",
                    "social security administration",
                ],
            ),
            (
                ScamCategory::LegalThreats,
                vec![
                    "warrant",
                    "arrest warrant",
                    "legal action",
                    "lawsuit",
                    "court case",
                    "subpoena",
                    "sheriff",
                    "police",
                ],
            ),
            (
                ScamCategory::Financial,
                vec![
                    "wire transfer",
                    "gift cards",
                    "bitcoin",
                    "cryptocurrency",
                    "bank account suspended",
                    "frozen account",
                    "unauthorized charges",
                ],
            ),
            (
                ScamCategory::Warranty,
                vec![
                    "car warranty",
                    "extended warranty",
                    "vehicle warranty",
                    "warranty expires",
                    "final notice",
                ],
            ),
            (
                ScamCategory::Grandparent,
                vec![
                    "grandson in trouble",
                    "granddaughter arrested",
                    "need bail money",
                    "emergency money",
                ],
            ),
        ]
    }

    /// Score a transcript. Deterministic for a fixed input.
    pub fn score(&self, transcript: &str) -> HeuristicResult {
        let start = Instant::now();
        let lower = transcript.to_lowercase();

        let mut score = 0.0;
        let mut red_flags: Vec<String> = Vec::new();
        let mut matched_categories: Vec<ScamCategory> = Vec::new();

        // Tier 1: keyword categories. Presence per category, never a count.
        if self.config.keyword_tier {
            for (category, keywords) in &self.keywords {
                let mut hit = false;
                for keyword in keywords {
                    if lower.contains(keyword) {
                        hit = true;
                        push_flag(&mut red_flags, format!("{}:{}", category.name(), keyword));
                    }
                }
                if hit {
                    matched_categories.push(*category);
                    score += CATEGORY_WEIGHT;
                }
            }
        }

        // Tier 2: four independent pattern booleans with fixed weights.
        let has_urgency = contains_any(&lower, &self.urgency_phrases);
        let requests_money = contains_any(&lower, &self.money_phrases);
        let requests_pii = contains_any(&lower, &self.pii_phrases);
        let uses_threats = contains_any(&lower, &self.threat_phrases);

        if self.config.pattern_tier {
            if has_urgency {
                push_flag(&mut red_flags, "urgency_language".to_string());
                score += URGENCY_WEIGHT;
            }
            if requests_money {
                push_flag(&mut red_flags, "money_request".to_string());
                score += MONEY_WEIGHT;
            }
            if requests_pii {
                push_flag(&mut red_flags, "requests_pii".to_string());
                score += PII_WEIGHT;
            }
            if uses_threats {
                push_flag(&mut red_flags, "threats".to_string());
                score += THREAT_WEIGHT;
            }
        }

        // Tier 3: co-occurrence and shape heuristics.
        if self.config.adjustment_tier {
            let categories_hit = [has_urgency, requests_money, requests_pii, uses_threats]
                .iter()
                .filter(|b| **b)
                .count();
            if categories_hit >= 3 {
                score += CO_OCCURRENCE_BONUS;
            }

            // Short scripted pitch with trigger words reads like a robocall.
            if transcript.len() < 200 && !matched_categories.is_empty() {
                score += ROBOCALL_BONUS;
            }

            if self.phone_pattern.is_match(transcript) {
                score += PHONE_NUMBER_BONUS;
            }
            if self.url_pattern.is_match(transcript) {
                score += URL_BONUS;
            }
        }

        let fraud_score = score.clamp(0.0, 1.0);
        red_flags.truncate(MAX_RED_FLAGS);

        let result = HeuristicResult {
            fraud_score,
            scam_type: Self::identify_scam_type(&matched_categories),
            red_flags,
            elapsed: start.elapsed(),
        };

        log::debug!(
            "heuristic pass: score={:.2} type={:?} flags={} in {:?}",
            result.fraud_score,
            result.scam_type,
            result.red_flags.len(),
            result.elapsed
        );

        result
    }

    /// Fixed precedence over the matched categories. A match on only the
    /// unlabeled `financial` category still reports "unknown" rather than
    /// nothing, so downstream sees that keywords fired.
    fn identify_scam_type(matched: &[ScamCategory]) -> Option<String> {
        if matched.is_empty() {
            return None;
        }
        for category in [
            ScamCategory::Irs,
            ScamCategory::TechSupport,
            ScamCategory::SocialSecurity,
            ScamCategory::LegalThreats,
            ScamCategory::Warranty,
            ScamCategory::Grandparent,
        ] {
            if matched.contains(&category) {
                return category.scam_type().map(str::to_string);
            }
        }
        Some("unknown".to_string())
    }
}

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| text.contains(p))
}

fn push_flag(flags: &mut Vec<String>, flag: String) {
    if !flags.contains(&flag) {
        flags.push(flag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IRS_SCRIPT: &str = "This is the IRS. There is a warrant out for your arrest. \
        You must act now and confirm your social security number immediately, or legal \
        action will be taken. Pay now by wire transfer to settle your tax debt.";

    #[test]
    fn irs_scam_scores_high() {
        let scorer = HeuristicScorer::default();
        let result = scorer.score(IRS_SCRIPT);

        assert!(
            result.fraud_score >= 0.85,
            "expected >= 0.85, got {}",
            result.fraud_score
        );
        assert_eq!(result.scam_type.as_deref(), Some("irs"));
        assert!(result.is_scam());
    }

    #[test]
    fn deterministic_for_fixed_transcript() {
        let scorer = HeuristicScorer::default();
        let first = scorer.score(IRS_SCRIPT);
        let second = scorer.score(IRS_SCRIPT);

        assert_eq!(first.fraud_score, second.fraud_score);
        assert_eq!(first.scam_type, second.scam_type);
        assert_eq!(first.red_flags, second.red_flags);
    }

    #[test]
    fn score_stays_clamped_with_every_signal_firing() {
        let scorer = HeuristicScorer::default();
        // Trip every category, every pattern, and every adjustment at once.
        let transcript = "irs tech support social security warrant wire transfer \
            car warranty grandson in trouble act now send money password arrest \
            call 555-123-4567 or visit https://example.com immediately";
        let result = scorer.score(transcript);

        assert!(result.fraud_score <= 1.0);
        assert!(result.fraud_score >= 0.0);
        assert_eq!(result.fraud_score, 1.0);
    }

    #[test]
    fn red_flags_deduplicated_and_capped() {
        let scorer = HeuristicScorer::default();
        let transcript = "irs irs irs warrant police lawsuit wire transfer gift cards \
            act now immediately send money password social security number";
        let result = scorer.score(transcript);

        assert!(result.red_flags.len() <= 5);
        let mut seen = result.red_flags.clone();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), result.red_flags.len());
    }

    #[test]
    fn warranty_pitch_stays_below_block_range() {
        let scorer = HeuristicScorer::default();
        let transcript = "Hello, I'm calling about renewing the coverage plan on your \
            vehicle before the enrollment window closes. Can I tell you about our options? \
            This offer covers parts and labor on major repairs for another three years.";
        let result = scorer.score(transcript);

        assert!(
            result.fraud_score < 0.5,
            "expected < 0.5, got {}",
            result.fraud_score
        );
    }

    #[test]
    fn clean_transcript_scores_zero() {
        let scorer = HeuristicScorer::default();
        let result = scorer.score("Hey, it's Dave. Are we still on for coffee tomorrow?");

        assert_eq!(result.fraud_score, 0.0);
        assert_eq!(result.scam_type, None);
        assert!(result.red_flags.is_empty());
        assert!(!result.is_scam());
    }

    #[test]
    fn keyword_tier_counts_categories_not_keywords() {
        let scorer = HeuristicScorer::new(HeuristicConfig {
            keyword_tier: true,
            pattern_tier: false,
            adjustment_tier: false,
        });

        // Three IRS keywords, one category: one 0.4 contribution.
        let one_category = scorer.score("irs internal revenue tax refund paperwork question");
        assert!((one_category.fraud_score - 0.4).abs() < 1e-9);

        // Two categories: 0.8.
        let two_categories = scorer.score("irs says your computer virus needs removing");
        assert!((two_categories.fraud_score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn pattern_tier_weights_are_fixed() {
        let scorer = HeuristicScorer::new(HeuristicConfig {
            keyword_tier: false,
            pattern_tier: true,
            adjustment_tier: false,
        });

        let urgency = scorer.score("please respond immediately to this");
        assert!((urgency.fraud_score - 0.2).abs() < 1e-9);

        let threats = scorer.score("an investigation has been opened on you");
        assert!((threats.fraud_score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn robocall_signature_needs_keyword_and_short_transcript() {
        let scorer = HeuristicScorer::new(HeuristicConfig {
            keyword_tier: false,
            pattern_tier: false,
            adjustment_tier: true,
        });
        // Keyword tier off: no keyword matched, so no robocall bonus even
        // though the transcript is short.
        let result = scorer.score("your car warranty expires");
        assert_eq!(result.fraud_score, 0.0);

        let scorer = HeuristicScorer::new(HeuristicConfig {
            keyword_tier: true,
            pattern_tier: false,
            adjustment_tier: true,
        });
        let result = scorer.score("your car warranty expires");
        // 0.4 keyword category + 0.1 robocall bonus.
        assert!((result.fraud_score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn phone_and_url_shapes_add_small_bonuses() {
        let scorer = HeuristicScorer::new(HeuristicConfig {
            keyword_tier: false,
            pattern_tier: false,
            adjustment_tier: true,
        });

        let phone = scorer.score("call us back at 800-555-0199 when you can");
        assert!((phone.fraud_score - 0.05).abs() < 1e-9);

        let url = scorer.score("go to www.example-support.net to fix this");
        assert!((url.fraud_score - 0.05).abs() < 1e-9);
    }

    #[test]
    fn legal_threats_report_warrant_type() {
        let scorer = HeuristicScorer::default();
        let result = scorer.score("there is a subpoena with your name on it");
        assert_eq!(result.scam_type.as_deref(), Some("warrant"));
    }

    #[test]
    fn financial_only_match_reports_unknown_type() {
        let scorer = HeuristicScorer::default();
        let result = scorer.score("we flagged unauthorized charges on your profile");
        assert_eq!(result.scam_type.as_deref(), Some("unknown"));
    }
}
