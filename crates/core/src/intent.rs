use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{EntitySet, Intent, IntentName};

pub fn normalize_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

struct IntentRule {
    intent: IntentName,
    pattern: Regex,
}

// Declaration order is the tie-break order.
static INTENT_RULES: Lazy<Vec<IntentRule>> = Lazy::new(|| {
    [
        (
            IntentName::CheckBalance,
            r"(?i)\b(?:check|what(?:'s|\s+is)|how\s+much|show(?:\s+me)?|view)\b.*\b(?:balances?|money|funds)\b",
        ),
        (
            IntentName::CreateBeneficiary,
            r"(?i)\b(?:add|create|new|register)\b.*\b(?:beneficiary|beneficiaries|recipient|receiver|payee)\b",
        ),
        (
            IntentName::CreatePayout,
            r"(?i)\b(?:send|transfer|make|create|pay)\b.*(?:\b(?:payout|payment|money)\b|\b\d+)",
        ),
        (
            IntentName::CheckFx,
            r"(?i)\b(?:exchange\s+rate|convert|fx\s+rate|fx|rate)\b.*\b(?:from|to|into|in)\b",
        ),
        (
            IntentName::Help,
            r"(?i)\b(?:help|what\s+can\s+you\s+do|commands|options)\b",
        ),
    ]
    .into_iter()
    .map(|(intent, pattern)| IntentRule {
        intent,
        pattern: Regex::new(pattern).expect("valid intent pattern"),
    })
    .collect()
});

/// Every intent whose pattern matches, in declaration order, scored by the
/// share of the utterance covered by its matches.
pub fn score_intents(text: &str) -> Vec<Intent> {
    let normalized = normalize_text(text);
    let total = normalized.chars().count();
    if total == 0 {
        return Vec::new();
    }

    INTENT_RULES
        .iter()
        .filter_map(|rule| {
            let matched = rule
                .pattern
                .find_iter(&normalized)
                .map(|found| found.as_str().chars().count())
                .sum::<usize>();
            (matched > 0).then(|| Intent {
                name: rule.intent,
                confidence: (matched as f64 / total as f64).min(1.0),
                entities: EntitySet::default(),
            })
        })
        .collect()
}

/// Highest confidence wins; on an exact tie the earlier candidate is kept.
pub fn select_intent(candidates: Vec<Intent>) -> Intent {
    candidates
        .into_iter()
        .fold(Intent::unknown(), |best, candidate| {
            if candidate.confidence > best.confidence {
                candidate
            } else {
                best
            }
        })
}

pub fn classify_intent(text: &str) -> Intent {
    select_intent(score_intents(text))
}
