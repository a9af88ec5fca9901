use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::intent::normalize_text;
use crate::models::{EntityKey, EntitySet};

static CURRENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(usd|eur|gbp|jpy|aud|cad|chf|cny|hkd|sgd|inr|vnd|dollars?|euros?|pounds?|yen)\b",
    )
    .expect("valid currency regex")
});

static AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[$€£]\s*)?\b(\d{1,3}(?:,\d{3})+|\d+)(\.\d{1,2})?\b")
        .expect("valid amount regex")
});

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("valid email regex")
});

static BENEFICIARY_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(bnf_[a-z0-9]+)\b").expect("valid beneficiary token regex"));

static BENEFICIARY_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:beneficiary|recipient)\s+(?:id\s*:?\s*)?([a-z0-9_-]*\d[a-z0-9_-]*)")
        .expect("valid beneficiary reference regex")
});

static COUNTRY_TRIGGER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:in|from|to|country)\s+").expect("valid country trigger regex")
});

static NAMED_TRIGGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:named|called)\s+").expect("valid name trigger regex"));

static RECIPIENT_TRIGGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:to|for)\s+").expect("valid recipient trigger regex"));

const FILLER_WORDS: &[&str] = &[
    "beneficiary",
    "recipient",
    "receiver",
    "payee",
    "the",
    "my",
    "a",
    "an",
    "new",
    "is",
];

const STOP_WORDS: &[&str] = &[
    "and", "with", "email", "e-mail", "named", "called", "name", "for", "to", "from", "in",
    "into", "country", "at", "on", "of", "please", "who", "whose", "id", "is", "based", "living",
    "lives", "located", "using", "via", "me", "us", "it", "that", "this",
];

const MAX_NAME_WORDS: usize = 4;
const MAX_COUNTRY_WORDS: usize = 3;

/// Maps a currency code or colloquial name to its upper-case ISO code.
pub fn currency_code(word: &str) -> Option<&'static str> {
    match word.trim().to_lowercase().as_str() {
        "usd" | "dollar" | "dollars" => Some("USD"),
        "eur" | "euro" | "euros" => Some("EUR"),
        "gbp" | "pound" | "pounds" => Some("GBP"),
        "jpy" | "yen" => Some("JPY"),
        "aud" => Some("AUD"),
        "cad" => Some("CAD"),
        "chf" => Some("CHF"),
        "cny" => Some("CNY"),
        "hkd" => Some("HKD"),
        "sgd" => Some("SGD"),
        "inr" => Some("INR"),
        "vnd" => Some("VND"),
        _ => None,
    }
}

pub fn extract_entities(text: &str) -> EntitySet {
    let normalized = normalize_text(text);
    let mut entities = EntitySet::new();

    let mut codes = CURRENCY
        .find_iter(&normalized)
        .filter_map(|found| currency_code(found.as_str()));
    if let Some(first) = codes.next() {
        entities.set(EntityKey::Currency, first);
        if let Some(second) = codes.find(|code| *code != first) {
            entities.set(EntityKey::ToCurrency, second);
        }
    }

    let email = EMAIL.find(&normalized);
    if let Some(found) = &email {
        entities.set(EntityKey::Email, found.as_str());
    }

    let beneficiary = extract_beneficiary_id(&normalized);
    if let Some((id, _)) = &beneficiary {
        entities.set(EntityKey::BeneficiaryId, id.clone());
    }

    let reserved = [
        email.map(|found| found.range()),
        beneficiary.map(|(_, range)| range),
    ];
    if let Some(amount) = extract_amount(&normalized, &reserved) {
        entities.set(EntityKey::Amount, amount);
    }

    if let Some(country) = phrases_after(&COUNTRY_TRIGGER, &normalized, MAX_COUNTRY_WORDS).next() {
        entities.set(EntityKey::Country, country);
    }

    let name = phrases_after(&NAMED_TRIGGER, &normalized, MAX_NAME_WORDS)
        .next()
        .or_else(|| phrases_after(&RECIPIENT_TRIGGER, &normalized, MAX_NAME_WORDS).next());
    if let Some(name) = name {
        entities.set(EntityKey::BeneficiaryName, name);
    }

    entities
}

fn extract_beneficiary_id(text: &str) -> Option<(String, Range<usize>)> {
    if let Some(found) = BENEFICIARY_TOKEN
        .captures(text)
        .and_then(|captures| captures.get(1))
    {
        return Some((found.as_str().to_string(), found.range()));
    }

    BENEFICIARY_REFERENCE
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|found| (found.as_str().to_string(), found.range()))
}

// Digits inside an email address or a beneficiary id are not amounts.
fn extract_amount(text: &str, reserved: &[Option<Range<usize>>]) -> Option<String> {
    AMOUNT.captures_iter(text).find_map(|captures| {
        let whole = captures.get(1)?;
        let overlaps = reserved
            .iter()
            .flatten()
            .any(|range| whole.start() < range.end && range.start < whole.end());
        if overlaps {
            return None;
        }

        let mut amount = whole.as_str().replace(',', "");
        if let Some(fraction) = captures.get(2) {
            amount.push_str(fraction.as_str());
        }
        Some(amount)
    })
}

fn phrases_after<'a>(
    trigger: &'a Regex,
    text: &'a str,
    max_words: usize,
) -> impl Iterator<Item = String> + 'a {
    trigger
        .find_iter(text)
        .filter_map(move |found| clean_phrase(&text[found.end()..], max_words))
}

fn clean_phrase(rest: &str, max_words: usize) -> Option<String> {
    let mut words: Vec<&str> = Vec::new();

    for raw in rest.split_whitespace() {
        let word = raw.trim_end_matches([',', '.', '!', '?', ';', ':']);
        let ends_clause = word.len() != raw.len();
        if word.is_empty()
            || !word
                .chars()
                .all(|ch| ch.is_alphabetic() || ch == '\'' || ch == '-')
        {
            break;
        }

        let lower = word.to_lowercase();
        if words.is_empty() && FILLER_WORDS.contains(&lower.as_str()) {
            if ends_clause {
                break;
            }
            continue;
        }
        if STOP_WORDS.contains(&lower.as_str()) || currency_code(&lower).is_some() {
            break;
        }

        words.push(word);
        if ends_clause || words.len() == max_words {
            break;
        }
    }

    (!words.is_empty()).then(|| words.join(" "))
}
