//! Sensitive-data detection over transcribed callee speech.
//!
//! Two independent passes whose results are concatenated, not deduplicated:
//! a regex pattern pass scored by context keywords, and a keyword pass at a
//! fixed confidence. Overlapping matches from both passes are intentional;
//! they are separate evidence signals. This is a training heuristic, not a
//! DLP system: false positives are acceptable.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Kind of sensitive data a match was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    AccountNumber,
    Ssn,
    Otp,
    CreditCard,
    PhoneNumber,
    Email,
    RoutingNumber,
    Password,
    PersonalInfo,
    Verification,
}

/// One detected disclosure in an utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitiveDataMatch {
    pub kind: MatchKind,
    /// The matched substring (pattern pass) or keyword (keyword pass).
    pub value: String,
    pub confidence: f32,
    /// Byte offset of the match in the source utterance.
    pub position: usize,
}

const BASE_CONFIDENCE: f32 = 0.70;
const CONTEXT_BONUS: f32 = 0.15;
const MAX_CONFIDENCE: f32 = 0.95;
const KEYWORD_CONFIDENCE: f32 = 0.90;

struct PatternSpec {
    kind: MatchKind,
    regex: Regex,
    /// Context keywords that raise confidence when present anywhere in the
    /// lower-cased utterance. Empty slice keeps the base confidence.
    context: &'static [&'static str],
}

static PATTERNS: Lazy<Vec<PatternSpec>> = Lazy::new(|| {
    vec![
        PatternSpec {
            kind: MatchKind::AccountNumber,
            regex: Regex::new(r"\b\d{8,16}\b").unwrap(),
            context: &["account", "number", "account number"],
        },
        PatternSpec {
            kind: MatchKind::Ssn,
            regex: Regex::new(r"\b\d{3}[-\s]?\d{2}[-\s]?\d{4}\b").unwrap(),
            context: &["social", "security", "ssn"],
        },
        PatternSpec {
            kind: MatchKind::Otp,
            regex: Regex::new(r"\b\d{4,8}\b").unwrap(),
            context: &["code", "verification", "confirm", "sent you"],
        },
        PatternSpec {
            kind: MatchKind::CreditCard,
            regex: Regex::new(r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b").unwrap(),
            context: &["card", "credit", "debit"],
        },
        PatternSpec {
            kind: MatchKind::PhoneNumber,
            regex: Regex::new(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b").unwrap(),
            context: &[],
        },
        PatternSpec {
            kind: MatchKind::Email,
            regex: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap(),
            context: &[],
        },
        PatternSpec {
            kind: MatchKind::RoutingNumber,
            regex: Regex::new(r"\b\d{9}\b").unwrap(),
            context: &["routing", "transit"],
        },
    ]
});

static KEYWORDS: &[(MatchKind, &[&str])] = &[
    (MatchKind::Password, &["password", "passcode", "pin", "secret"]),
    (
        MatchKind::PersonalInfo,
        &["social security", "date of birth", "birthday", "mother's maiden"],
    ),
    (
        MatchKind::Verification,
        &["verification code", "confirm", "authenticate"],
    ),
];

/// Stateless detector over free-form speech-to-text output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detector;

impl Detector {
    /// Analyze an utterance for sensitive information. Pure and infallible;
    /// an utterance that matches nothing returns an empty vec.
    pub fn detect(&self, text: &str) -> Vec<SensitiveDataMatch> {
        let mut matches = Vec::new();
        let text_lower = text.to_lowercase();

        for spec in PATTERNS.iter() {
            let confidence = pattern_confidence(&text_lower, spec.context);
            for m in spec.regex.find_iter(text) {
                matches.push(SensitiveDataMatch {
                    kind: spec.kind,
                    value: m.as_str().to_string(),
                    confidence,
                    position: m.start(),
                });
            }
        }

        for (kind, keywords) in KEYWORDS {
            for keyword in *keywords {
                if let Some(position) = text_lower.find(keyword) {
                    matches.push(SensitiveDataMatch {
                        kind: *kind,
                        value: keyword.to_string(),
                        confidence: KEYWORD_CONFIDENCE,
                        position,
                    });
                }
            }
        }

        matches
    }

    /// Quick check whether the utterance discloses anything.
    pub fn has_sensitive_data(&self, text: &str) -> bool {
        !self.detect(text).is_empty()
    }
}

fn pattern_confidence(text_lower: &str, context: &[&str]) -> f32 {
    let mut confidence = BASE_CONFIDENCE;
    for clue in context {
        if text_lower.contains(clue) {
            confidence = (confidence + CONTEXT_BONUS).min(MAX_CONFIDENCE);
        }
    }
    confidence
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches_of(text: &str, kind: MatchKind) -> Vec<SensitiveDataMatch> {
        Detector
            .detect(text)
            .into_iter()
            .filter(|m| m.kind == kind)
            .collect()
    }

    #[test]
    fn empty_text_yields_no_matches() {
        assert!(Detector.detect("").is_empty());
        assert!(!Detector.has_sensitive_data(""));
    }

    #[test]
    fn ssn_with_its_own_context_keyword_scores_above_base() {
        // "ssn" is itself a context clue for the ssn pattern
        let ssn = matches_of("my ssn is 123-45-6789", MatchKind::Ssn);
        assert_eq!(ssn.len(), 1);
        assert_eq!(ssn[0].value, "123-45-6789");
        assert!(ssn[0].confidence >= 0.85 - f32::EPSILON);
    }

    #[test]
    fn ssn_spelled_out_scores_at_least_085() {
        let ssn = matches_of("my social security number 123-45-6789", MatchKind::Ssn);
        assert_eq!(ssn.len(), 1);
        assert!(ssn[0].confidence >= 0.85 - f32::EPSILON);
    }

    #[test]
    fn bare_digits_keep_base_confidence() {
        // no context keywords anywhere, so the 9-digit routing pattern stays at base
        let routing = matches_of("it was 123456789 I think", MatchKind::RoutingNumber);
        assert_eq!(routing.len(), 1);
        assert!((routing[0].confidence - 0.70).abs() < 1e-6);
    }

    #[test]
    fn context_bonus_is_capped() {
        let otp = matches_of(
            "the verification code you sent you is 123456, let me confirm",
            MatchKind::Otp,
        );
        assert_eq!(otp.len(), 1);
        assert!((otp[0].confidence - 0.95).abs() < 1e-6);
    }

    #[test]
    fn password_keyword_scores_exactly_090() {
        let hits = matches_of("here's my password", MatchKind::Password);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, "password");
        assert!((hits[0].confidence - 0.90).abs() < 1e-6);
        assert_eq!(hits[0].position, "here's my ".len());
    }

    #[test]
    fn overlapping_passes_both_report() {
        // "social security" trips the personal_info keyword while the digits
        // trip the ssn pattern; both are kept, no dedup
        let all = Detector.detect("social security 123-45-6789");
        assert!(all.iter().any(|m| m.kind == MatchKind::Ssn));
        assert!(all.iter().any(|m| m.kind == MatchKind::PersonalInfo));
    }

    #[test]
    fn credit_card_groups_detected_with_position() {
        let cards = matches_of("my card is 4111 1111 1111 1111", MatchKind::CreditCard);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].position, "my card is ".len());
        assert!((cards[0].confidence - 0.85).abs() < 1e-6);
    }

    #[test]
    fn email_detected() {
        let emails = matches_of("reach me at test@example.com", MatchKind::Email);
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].value, "test@example.com");
        assert!((emails[0].confidence - 0.70).abs() < 1e-6);
    }

    #[test]
    fn keyword_position_is_first_occurrence_in_lowercased_text() {
        let hits = matches_of("PIN? I never share my PIN", MatchKind::Password);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, "pin");
        assert_eq!(hits[0].position, 0);
    }
}
