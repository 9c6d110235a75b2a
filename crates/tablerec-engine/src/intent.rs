//! User intent classification.
//!
//! Decides whether a message confirms pending preferences, rejects them,
//! asks for restaurant recommendations, or is ordinary conversation.

use regex::Regex;
use std::sync::LazyLock;

// =============================================================================
// Compiled regex sets (compiled once, reused across calls)
// =============================================================================

struct IntentPatterns {
    yes: Vec<Regex>,
    no: Vec<Regex>,
    modify: Vec<Regex>,
    query: Vec<Regex>,
}

static INTENT_PATTERNS: LazyLock<IntentPatterns> = LazyLock::new(|| {
    let mk = |pats: &[&str]| -> Vec<Regex> {
        pats.iter()
            .map(|p| Regex::new(p).expect("Invalid intent regex"))
            .collect()
    };

    IntentPatterns {
        yes: mk(&[
            r"(?i)\b(yes|yeah|yep|yup|correct|right|sounds good|perfect|ok|okay|sure|exactly|precisely)\b",
            r"(?i)\bthat'?s (right|correct)\b",
        ]),
        no: mk(&[
            r"(?i)\b(no|nope|incorrect|wrong|not quite|close but|not exactly)\b",
            r"(?i)\bnot (right|correct|what i want)\b",
            r"(?i)\bthat'?s (not right|wrong)\b",
        ]),
        modify: mk(&[
            r"(?i)\b(change|modify|update|different|instead|rather|actually|but|however|although|though)\b",
        ]),
        query: mk(&[
            r"(?i)\b(restaurant|food|dining|eat|meal|dinner|lunch|breakfast|cuisine|taste|flavor|hungry)\b",
            r"(?i)\b(spicy|sweet|sour|savory)\b",
            r"(?i)\b(recommend|looking for)\b",
        ]),
    }
});

/// What the user's message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// A request for restaurant recommendations.
    Query,
    /// General conversation.
    Chat,
    /// Confirms the pending preference summary.
    ConfirmationYes,
    /// Rejects or wants to change the pending preference summary.
    ConfirmationNo,
}

/// Classification result with a confidence estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntentAnalysis {
    pub intent: Intent,
    pub confidence: f64,
}

/// Keyword-based intent classifier.
#[derive(Debug, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a user message.
    ///
    /// Confirmation wins only when no rejection keyword matched; rejection
    /// and modification keywords both count as a "no". Restaurant-related
    /// keywords mark a query; anything else is chat.
    pub fn classify(&self, query: &str) -> IntentAnalysis {
        let query = query.trim();
        let p = &*INTENT_PATTERNS;

        let is_yes = p.yes.iter().any(|re| re.is_match(query));
        let is_no = p.no.iter().any(|re| re.is_match(query));
        let is_modify = p.modify.iter().any(|re| re.is_match(query));
        let is_query = p.query.iter().any(|re| re.is_match(query));

        if is_yes && !is_no {
            IntentAnalysis {
                intent: Intent::ConfirmationYes,
                confidence: 0.9,
            }
        } else if is_no || is_modify {
            IntentAnalysis {
                intent: Intent::ConfirmationNo,
                confidence: 0.8,
            }
        } else if is_query {
            IntentAnalysis {
                intent: Intent::Query,
                confidence: 0.85,
            }
        } else {
            IntentAnalysis {
                intent: Intent::Chat,
                confidence: 0.6,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(q: &str) -> Intent {
        IntentClassifier::new().classify(q).intent
    }

    #[test]
    fn test_confirmation_yes() {
        assert_eq!(classify("yes"), Intent::ConfirmationYes);
        assert_eq!(classify("Yeah, sounds good"), Intent::ConfirmationYes);
        assert_eq!(classify("that's correct"), Intent::ConfirmationYes);
        assert_eq!(classify("Perfect!"), Intent::ConfirmationYes);
    }

    #[test]
    fn test_confirmation_no() {
        assert_eq!(classify("no"), Intent::ConfirmationNo);
        assert_eq!(classify("that's not right"), Intent::ConfirmationNo);
        assert_eq!(classify("nope, wrong"), Intent::ConfirmationNo);
    }

    #[test]
    fn test_modify_counts_as_no() {
        assert_eq!(classify("actually, change the location"), Intent::ConfirmationNo);
        assert_eq!(classify("can you update my budget"), Intent::ConfirmationNo);
    }

    #[test]
    fn test_no_beats_yes() {
        // Contains both a yes and a no keyword; the rejection must win.
        assert_eq!(classify("ok, not quite"), Intent::ConfirmationNo);
        assert_eq!(classify("sure... nope, wrong"), Intent::ConfirmationNo);
    }

    #[test]
    fn test_query() {
        assert_eq!(classify("find me a spicy restaurant"), Intent::Query);
        assert_eq!(classify("where should I go for dinner"), Intent::Query);
        assert_eq!(classify("I'm hungry"), Intent::Query);
        assert_eq!(classify("recommend something savory"), Intent::Query);
    }

    #[test]
    fn test_chat_fallback() {
        assert_eq!(classify("hello there"), Intent::Chat);
        assert_eq!(classify("how is the weather"), Intent::Chat);
    }

    #[test]
    fn test_confidence_values() {
        let c = IntentClassifier::new();
        assert_eq!(c.classify("yes").confidence, 0.9);
        assert_eq!(c.classify("no").confidence, 0.8);
        assert_eq!(c.classify("find food").confidence, 0.85);
        assert_eq!(c.classify("hello").confidence, 0.6);
    }
}
