//! Free-text list parsing for the list-collecting steps.

use std::sync::LazyLock;

use regex::Regex;

static NONE_ANSWER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:none|nothing|skip|no|nope|nah|n/?a|nada|not really|nothing really|no thanks|nothing to (?:sell|declare|add)|i don'?t have any|rien|aucun|aucune|non|pas vraiment|non merci|je n'?en ai pas)(?:\s+(?:at all|for now|yet|really|pour l'instant|pour le moment|du tout))?$",
    )
    .expect("none regex")
});

static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*(?:[,;\n/+]|\band\b|\bet\b|&)\s*").expect("separator regex"));

static FILLER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?:i have|i've got|i own|i could sell|i can sell|i pay for|i'm subscribed to|i am subscribed to|there'?s|maybe|probably|also|just|j'ai|je paie|je paye|peut-être|aussi)\s+)*(?:(?:a|an|my|some|the|un|une|des|mon|ma|mes|le|la|les)\s+)?",
    )
    .expect("filler regex")
});

/// Normalize a message for keyword comparison: trimmed, lowercased, with
/// surrounding punctuation removed.
pub fn normalize(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| c.is_ascii_punctuation() && c != '/' && c != '\'')
        .trim()
        .to_lowercase()
}

/// Whether the whole message is an explicit "none" answer.
pub fn is_none_answer(text: &str) -> bool {
    let normalized = normalize(text);
    !normalized.is_empty() && NONE_ANSWER.is_match(&normalized)
}

/// Strip trailing sentence punctuation and surrounding whitespace.
pub fn clean_value(text: &str) -> String {
    text.trim()
        .trim_end_matches(['.', ',', ';', ':', '!', '?'])
        .trim()
        .to_string()
}

/// Parse a comma/"and"-separated list.
///
/// `Some(vec![])` for an explicit "none" answer, `None` when nothing
/// list-like could be read. Items need at least two letters to count.
pub fn parse_list(text: &str) -> Option<Vec<String>> {
    if is_none_answer(text) {
        return Some(Vec::new());
    }

    let items: Vec<String> = SEPARATOR
        .split(text.trim())
        .map(|raw| {
            let cleaned = clean_value(raw);
            FILLER_PREFIX.replace(&cleaned, "").trim().to_string()
        })
        .filter(|item| item.chars().filter(|c| c.is_alphabetic()).count() >= 2)
        .collect();

    if items.is_empty() { None } else { Some(items) }
}
