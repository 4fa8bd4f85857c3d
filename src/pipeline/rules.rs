//! Rule engine — heuristic risk scoring over a normalized record.
//!
//! Four rules, applied in a fixed order, each independently additive:
//! 1. Suspicious keywords: +10 per distinct matched term, marks suspicious
//! 2. URL count: +5 per URL, informational only
//! 3. Shortened URL: +15 per matching URL, marks suspicious
//! 4. Length anomaly with URLs: +10 flat, marks suspicious
//!
//! Firing of one rule never suppresses evaluation of the others, and no
//! rule ever decreases the score.

use chrono::Utc;
use tracing::debug;

use crate::pipeline::types::{MessageRecord, RiskAssessment, RiskLabel};

/// Score contribution per distinct matched keyword.
const KEYWORD_WEIGHT: u32 = 10;

/// Score contribution per extracted URL.
const URL_WEIGHT: u32 = 5;

/// Flat contribution per URL pointing at a known shortener.
const SHORTENED_URL_WEIGHT: u32 = 15;

/// Flat contribution for anomalous text length combined with URLs.
const LENGTH_ANOMALY_WEIGHT: u32 = 10;

/// Text shorter than this (in characters) is anomalous when URLs are present.
const SHORT_TEXT_THRESHOLD: usize = 50;

/// Text longer than this (in characters) is anomalous when URLs are present.
const LONG_TEXT_THRESHOLD: usize = 1000;

/// What a single rule contributed when it fired.
struct Signal {
    suspicious: bool,
    points: u32,
    reasons: Vec<String>,
}

/// Rule-based risk scorer.
///
/// Stateless and deterministic: the assessment is a pure function of the
/// record's `text` and `urls` (case-insensitive on text). Holds only its
/// fixed vocabularies.
pub struct RuleEngine {
    keywords: Vec<String>,
    shortener_domains: Vec<String>,
}

impl RuleEngine {
    /// Create a rule engine with the default keyword vocabulary and
    /// shortener domain list.
    pub fn default_rules() -> Self {
        let keywords = [
            "prize",
            "winner",
            "congratulations",
            "click here",
            "urgent",
            "bitcoin",
            "crypto",
            "investment",
            "easy money",
            "free download",
            "verify your account",
            "suspended",
            "account blocked",
            "confirm your identity",
        ]
        .map(String::from)
        .to_vec();

        let shortener_domains = ["bit.ly", "tinyurl.com", "t.co", "goo.gl"]
            .map(String::from)
            .to_vec();

        Self {
            keywords,
            shortener_domains,
        }
    }

    /// Create an engine with no vocabularies (for testing).
    pub fn empty() -> Self {
        Self {
            keywords: Vec::new(),
            shortener_domains: Vec::new(),
        }
    }

    /// Evaluate a record against all rules and produce a risk assessment.
    ///
    /// Never fails: empty text and an empty URL list are valid input and
    /// produce a zero-signal assessment.
    pub fn evaluate(&self, record: &MessageRecord) -> RiskAssessment {
        let text_lower = record.text.to_lowercase();

        // Ordered, independent signals — summed by the final fold, with no
        // shared accumulator between rules.
        let signals = [
            self.keyword_signal(&text_lower),
            self.url_count_signal(record),
            self.shortened_url_signal(record),
            self.length_anomaly_signal(record),
        ];

        let (is_suspicious, risk_score, reasons) = signals.into_iter().flatten().fold(
            (false, 0u32, Vec::new()),
            |(suspicious, score, mut reasons), signal| {
                reasons.extend(signal.reasons);
                (
                    suspicious || signal.suspicious,
                    score.saturating_add(signal.points),
                    reasons,
                )
            },
        );

        let label = if is_suspicious {
            RiskLabel::Spam
        } else {
            RiskLabel::NoSpam
        };

        debug!(
            message_id = record.message_id,
            label = label.as_str(),
            risk_score,
            "Rule evaluation complete"
        );

        RiskAssessment {
            label,
            is_suspicious,
            risk_score,
            reasons,
            probabilities: None,
            analysis_timestamp: Utc::now(),
        }
    }

    /// Rule 1: suspicious keyword containment over the lower-cased text.
    fn keyword_signal(&self, text_lower: &str) -> Option<Signal> {
        let found: Vec<&str> = self
            .keywords
            .iter()
            .filter(|kw| text_lower.contains(kw.as_str()))
            .map(String::as_str)
            .collect();

        if found.is_empty() {
            return None;
        }

        Some(Signal {
            suspicious: true,
            points: KEYWORD_WEIGHT * found.len() as u32,
            reasons: vec![format!("suspicious keywords: {}", found.join(", "))],
        })
    }

    /// Rule 2: URL presence. Informational — does not mark suspicious.
    fn url_count_signal(&self, record: &MessageRecord) -> Option<Signal> {
        if record.urls.is_empty() {
            return None;
        }

        Some(Signal {
            suspicious: false,
            points: URL_WEIGHT * record.urls.len() as u32,
            reasons: vec![format!("contains {} URL(s)", record.urls.len())],
        })
    }

    /// Rule 3: known link-shortener domains, evaluated per URL.
    fn shortened_url_signal(&self, record: &MessageRecord) -> Option<Signal> {
        let matching = record
            .urls
            .iter()
            .filter(|url| self.shortener_domains.iter().any(|d| url.contains(d.as_str())))
            .count() as u32;

        if matching == 0 {
            return None;
        }

        Some(Signal {
            suspicious: true,
            points: SHORTENED_URL_WEIGHT * matching,
            reasons: (0..matching).map(|_| "shortened URL detected".to_string()).collect(),
        })
    }

    /// Rule 4: very short or very long text combined with URLs.
    fn length_anomaly_signal(&self, record: &MessageRecord) -> Option<Signal> {
        let anomalous = record.message_length < SHORT_TEXT_THRESHOLD
            || record.message_length > LONG_TEXT_THRESHOLD;

        if record.urls.is_empty() || !anomalous {
            return None;
        }

        Some(Signal {
            suspicious: true,
            points: LENGTH_ANOMALY_WEIGHT,
            reasons: vec!["suspicious length with URLs".to_string()],
        })
    }
}
