//! Deterministic, per-step pattern extraction.
//!
//! Each step has one strategy: a pure function from the message (plus the
//! existing draft and today's date) to a partial draft. Strategies never
//! panic; no match yields an empty draft. `strategy_for` is the lookup table.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;

use crate::extraction::deadline::find_deadline;
use crate::extraction::lists::{clean_value, is_none_answer, normalize, parse_list};
use crate::extraction::numbers::{NumberMatch, find_numbers};
use crate::onboarding::{Currency, Language, ProfileDraft, Step};

/// Minimum hourly rate assumed when only a weekly hour count is given.
pub const DEFAULT_MIN_HOURLY_RATE: Decimal = dec!(12);

/// Output of a pattern strategy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternExtraction {
    pub fields: ProfileDraft,
    /// Camel-case names of fields the message implied but didn't provide
    /// (e.g. a goal amount without a purpose).
    pub missing_info: Vec<String>,
}

impl PatternExtraction {
    fn of(fields: ProfileDraft) -> Self {
        Self {
            fields,
            missing_info: Vec::new(),
        }
    }
}

/// Inputs shared by every strategy.
#[derive(Debug, Clone, Copy)]
pub struct PatternContext<'a> {
    pub draft: &'a ProfileDraft,
    pub today: NaiveDate,
}

/// A pattern strategy.
pub type Strategy = fn(&str, &PatternContext<'_>) -> PatternExtraction;

/// The step → strategy table.
pub fn strategy_for(step: Step) -> Strategy {
    match step {
        Step::Greeting => extract_greeting,
        Step::Region => extract_region,
        Step::Name => extract_name,
        Step::Studies => extract_studies,
        Step::Skills => extract_skills,
        Step::Certifications => extract_certifications,
        Step::Location => extract_location,
        Step::Budget => extract_budget,
        Step::WorkPreferences => extract_work_preferences,
        Step::Goal => extract_goal,
        Step::AcademicEvents => extract_academic_events,
        Step::Inventory => extract_inventory,
        Step::Trade => extract_trade,
        Step::Lifestyle => extract_lifestyle,
        Step::Complete => extract_nothing,
    }
}

/// Run the strategy for `step` against `message`.
pub fn extract_for_step(
    step: Step,
    message: &str,
    draft: &ProfileDraft,
    today: NaiveDate,
) -> PatternExtraction {
    if message.trim().is_empty() {
        return PatternExtraction::default();
    }
    let ctx = PatternContext { draft, today };
    let result = strategy_for(step)(message, &ctx);
    tracing::debug!(
        step = %step,
        matched = !result.fields.is_empty(),
        missing = ?result.missing_info,
        "Pattern extraction"
    );
    result
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("pattern regex")
}

pub(crate) fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_nothing(_: &str, _: &PatternContext<'_>) -> PatternExtraction {
    PatternExtraction::default()
}

// ── greeting ────────────────────────────────────────────────────────

static FRENCH_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)\b(bonjour|salut|coucou|bonsoir|oui|fran[çc]ais|c'est parti|allons-y|on y va|pr[êe]te?|d'accord)\b")
});
static ENGLISH_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)\b(hi|hello|hey|hiya|yes|yeah|yep|sure|ready|let'?s go|ok|okay|good (?:morning|afternoon|evening)|english)\b")
});
static EXPLICIT_ENGLISH: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\b(english|anglais|in english)\b"));
static EXPLICIT_FRENCH: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\b(french|fran[çc]ais)\b"));

fn extract_greeting(message: &str, _: &PatternContext<'_>) -> PatternExtraction {
    let language = if EXPLICIT_ENGLISH.is_match(message) {
        Some(Language::En)
    } else if EXPLICIT_FRENCH.is_match(message) || FRENCH_WORDS.is_match(message) {
        Some(Language::Fr)
    } else if ENGLISH_WORDS.is_match(message) {
        Some(Language::En)
    } else {
        None
    };
    PatternExtraction::of(ProfileDraft {
        language,
        ..Default::default()
    })
}

// ── region ──────────────────────────────────────────────────────────

struct RegionRule {
    regex: Regex,
    region: &'static str,
    currency: Currency,
}

static REGION_RULES: LazyLock<Vec<RegionRule>> = LazyLock::new(|| {
    vec![
        RegionRule {
            regex: regex(r"(?i)\b(france|french|fran[çc]ais|paris|lyon|marseille)\b"),
            region: "france",
            currency: Currency::Eur,
        },
        RegionRule {
            regex: regex(
                r"(?i)\b(uk|u\.k\.|united kingdom|england|britain|great britain|scotland|wales|london|royaume[- ]uni|angleterre|pounds?|sterling)\b|£",
            ),
            region: "uk",
            currency: Currency::Gbp,
        },
        RegionRule {
            regex: regex(r"(?i:\b(usa|u\.s\.a?|united states|america|[ée]tats[- ]unis|dollars?)\b)|\bUS\b|\$"),
            region: "us",
            currency: Currency::Usd,
        },
        RegionRule {
            regex: regex(
                r"(?i)\b(belgium|belgique|germany|allemagne|spain|espagne|italy|italie|netherlands|pays-bas|ireland|irlande|portugal|europe|euros?)\b|€",
            ),
            region: "europe",
            currency: Currency::Eur,
        },
    ]
});

fn extract_region(message: &str, _: &PatternContext<'_>) -> PatternExtraction {
    let found = REGION_RULES.iter().find(|rule| rule.regex.is_match(message));
    let Some(rule) = found else {
        return PatternExtraction::default();
    };
    PatternExtraction::of(ProfileDraft {
        region: Some(rule.region.to_string()),
        currency: Some(rule.currency),
        ..Default::default()
    })
}

// ── name ────────────────────────────────────────────────────────────

static NAME_INTRO: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"(?i)(?:my name is|my name's|i'm|i am|call me|it's|this is|je m'appelle|moi c'est|je suis|c'est)\s+([\p{L}][\p{L}'\-]*(?:\s+[\p{L}][\p{L}'\-]*)?)",
    )
});

/// Tokens that look like a one-word answer but are never a name.
const NON_NAME_TOKENS: &[&str] = &[
    "hi", "hello", "hey", "yes", "no", "ok", "okay", "sure", "ready", "none", "nothing", "skip",
    "thanks", "merci", "oui", "non", "bonjour", "salut", "student", "étudiant", "etudiante",
    "netflix", "spotify", "amazon", "prime", "disney", "deezer", "youtube", "gym", "uber",
    "tired", "fine", "good", "great", "here", "from", "in", "a", "the", "not", "going", "happy",
    "so", "very", "just", "back", "what", "why", "how", "idk", "pas", "le", "la",
];

/// Words that end a captured name ("I'm Alice and I study...").
const NAME_STOPWORDS: &[&str] = &["and", "et", "from", "de", "i", "je", "but", "mais", "here"];

fn is_name_token(word: &str) -> bool {
    let lower = word.to_lowercase();
    !NON_NAME_TOKENS.contains(&lower.as_str())
        && word.chars().all(|c| c.is_alphabetic() || c == '\'' || c == '-')
        && word.chars().any(|c| c.is_alphabetic())
}

fn extract_name(message: &str, _: &PatternContext<'_>) -> PatternExtraction {
    let cleaned = clean_value(message);

    let candidate: Option<Vec<&str>> = match NAME_INTRO.captures(&cleaned) {
        Some(caps) => caps.get(1).map(|m| {
            m.as_str()
                .split_whitespace()
                .take_while(|w| !NAME_STOPWORDS.contains(&w.to_lowercase().as_str()))
                .collect()
        }),
        None => {
            let words: Vec<&str> = cleaned.split_whitespace().collect();
            (1..=3).contains(&words.len()).then_some(words)
        }
    };

    let name = candidate
        .filter(|words| !words.is_empty() && words.iter().all(|w| is_name_token(w)))
        .map(|words| title_case(&words.join(" ")));

    PatternExtraction::of(ProfileDraft {
        name,
        ..Default::default()
    })
}

// ── studies ─────────────────────────────────────────────────────────

static DIPLOMA_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"(?i)\b(bachelor|master|licence|license|bts|dut|phd|doctorat|doctorate|bac|mba|msc|bsc|l1|l2|l3|m1|m2|pr[ée]pa|high school|lyc[ée]e|bep)(?:'s)?\b(?:\s+(?:degree|diploma|dipl[ôo]me))?(?:\s+(?:in|of|en|de|d'|in the field of))?\s*(.*)",
    )
});
static STUDYING: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"(?i)(?:i study|i'm studying|i am studying|studying|i do|j'[ée]tudie|je fais|[ée]tudiante? en|student in|major in|majoring in)\s+(.+)",
    )
});

const ACRONYM_DIPLOMAS: &[&str] = &[
    "bts", "dut", "phd", "bac", "mba", "msc", "bsc", "l1", "l2", "l3", "m1", "m2", "bep",
];

fn canonical_diploma(raw: &str) -> String {
    let lower = raw.to_lowercase();
    match lower.as_str() {
        "license" => "Licence".to_string(),
        "prepa" | "prépa" => "Prépa".to_string(),
        other if ACRONYM_DIPLOMAS.contains(&other) => match other {
            "phd" => "PhD".to_string(),
            "msc" => "MSc".to_string(),
            "bsc" => "BSc".to_string(),
            _ => other.to_uppercase(),
        },
        other => title_case(other),
    }
}

fn clean_field(raw: &str) -> Option<String> {
    let field = clean_value(raw)
        .trim_start_matches(|c: char| c == '-' || c == ':' || c.is_whitespace())
        .to_string();
    (field.chars().any(|c| c.is_alphabetic())).then_some(field)
}

fn extract_studies(message: &str, _: &PatternContext<'_>) -> PatternExtraction {
    let cleaned = clean_value(message);

    if let Some(caps) = DIPLOMA_FIELD.captures(&cleaned) {
        return PatternExtraction::of(ProfileDraft {
            diploma: caps.get(1).map(|m| canonical_diploma(m.as_str())),
            field: caps.get(2).and_then(|m| clean_field(m.as_str())),
            ..Default::default()
        });
    }

    if let Some(caps) = STUDYING.captures(&cleaned) {
        return PatternExtraction::of(ProfileDraft {
            field: caps.get(1).and_then(|m| clean_field(m.as_str())),
            ..Default::default()
        });
    }

    // First token is the diploma, the rest the field.
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    let plausible = !words.is_empty()
        && words.len() <= 6
        && !is_none_answer(&cleaned)
        && words.iter().all(|w| w.chars().any(|c| c.is_alphabetic()));
    if !plausible {
        return PatternExtraction::default();
    }
    let (first, rest) = words.split_first().map(|(f, r)| (*f, r.join(" "))).unwrap_or_default();
    PatternExtraction::of(ProfileDraft {
        diploma: Some(canonical_diploma(first)),
        field: clean_field(&rest),
        ..Default::default()
    })
}

// ── skills / certifications ─────────────────────────────────────────

static SKILL_KEYWORDS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"python", "Python"),
        (r"javascript|js", "JavaScript"),
        (r"typescript", "TypeScript"),
        (r"java", "Java"),
        (r"rust", "Rust"),
        (r"sql", "SQL"),
        (r"excel", "Excel"),
        (r"photoshop", "Photoshop"),
        (r"graphic design|design graphique", "Graphic design"),
        (r"web (?:dev|development)|d[ée]veloppement web", "Web development"),
        (r"tutoring|tutor|cours particuliers|soutien scolaire", "Tutoring"),
        (r"english|anglais", "English"),
        (r"spanish|espagnol", "Spanish"),
        (r"german|allemand", "German"),
        (r"translation|traduction", "Translation"),
        (r"writing|r[ée]daction|copywriting", "Writing"),
        (r"photography|photographie|photo", "Photography"),
        (r"video editing|montage vid[ée]o", "Video editing"),
        (r"guitar|guitare", "Guitar"),
        (r"piano", "Piano"),
        (r"baby-?sitting|garde d'enfants", "Babysitting"),
        (r"dog walking|promenade de chiens", "Dog walking"),
        (r"cooking|cuisine", "Cooking"),
        (r"marketing", "Marketing"),
        (r"social media|r[ée]seaux sociaux", "Social media"),
        (r"data analysis|analyse de donn[ée]es", "Data analysis"),
    ]
    .into_iter()
    .map(|(pattern, label)| (regex(&format!(r"(?i)\b(?:{pattern})\b")), label))
    .collect()
});

static CERTIFICATION_KEYWORDS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"first aid|psc1|premiers secours|sst", "First aid"),
        (r"bafa", "BAFA"),
        (r"toeic", "TOEIC"),
        (r"toefl", "TOEFL"),
        (r"ielts", "IELTS"),
        (r"cambridge", "Cambridge English"),
        (r"delf|dalf", "DELF/DALF"),
        (r"driving licen[cs]e|driver'?s licen[cs]e|permis(?: b| de conduire)?", "Driving licence"),
        (r"lifeguard|bnssa", "Lifeguard"),
        (r"haccp", "HACCP"),
        (r"aws", "AWS"),
        (r"cisco|ccna", "Cisco"),
        (r"pmp", "PMP"),
        (r"pix", "PIX"),
    ]
    .into_iter()
    .map(|(pattern, label)| (regex(&format!(r"(?i)\b(?:{pattern})\b")), label))
    .collect()
});

fn keyword_list(message: &str, keywords: &[(Regex, &'static str)]) -> Option<Vec<String>> {
    if is_none_answer(message) {
        return Some(Vec::new());
    }
    let mut hits: Vec<(usize, &'static str)> = keywords
        .iter()
        .filter_map(|(re, label)| re.find(message).map(|m| (m.start(), *label)))
        .collect();
    if hits.is_empty() {
        return parse_list(message);
    }
    hits.sort_by_key(|(pos, _)| *pos);
    let mut labels: Vec<String> = Vec::with_capacity(hits.len());
    for (_, label) in hits {
        if !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
    }
    Some(labels)
}

fn extract_skills(message: &str, _: &PatternContext<'_>) -> PatternExtraction {
    PatternExtraction::of(ProfileDraft {
        skills: keyword_list(message, &SKILL_KEYWORDS),
        ..Default::default()
    })
}

fn extract_certifications(message: &str, _: &PatternContext<'_>) -> PatternExtraction {
    PatternExtraction::of(ProfileDraft {
        certifications: keyword_list(message, &CERTIFICATION_KEYWORDS),
        ..Default::default()
    })
}

// ── location ────────────────────────────────────────────────────────

const CITY_GAZETTEER: &[&str] = &[
    "Paris", "Lyon", "Marseille", "Toulouse", "Nice", "Nantes", "Strasbourg", "Montpellier",
    "Bordeaux", "Lille", "Rennes", "Grenoble", "Dijon", "Angers", "Reims", "Tours", "Caen",
    "Rouen", "Nancy", "Metz", "Brest", "Clermont-Ferrand", "Aix-en-Provence", "London",
    "Manchester", "Birmingham", "Edinburgh", "Glasgow", "Bristol", "Leeds", "Liverpool",
    "Oxford", "Cambridge", "Cardiff", "New York", "Los Angeles", "Chicago", "Boston",
    "San Francisco", "Seattle", "Austin", "Miami", "Brussels", "Bruxelles", "Geneva",
    "Genève", "Montreal", "Montréal", "Berlin", "Madrid", "Barcelona",
];

static LOCATION_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"(?i)^(?:i live in|i'm living in|i am living in|i'm in|i am in|i'm based in|i am based in|based in|living in|i study in|in|j'habite [àa]|j'habite|je vis [àa]|je suis [àa]|[àa])\s+",
    )
});

const NON_PLACE_WORDS: &[&str] = &[
    "i", "me", "my", "don't", "dont", "know", "not", "sure", "yes", "no", "idk", "dunno", "je",
    "sais", "pas", "none", "nothing", "earn", "spend", "hi", "hello",
];

fn find_city(message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    let gazetteer_hit = CITY_GAZETTEER.iter().find(|city| {
        let needle = city.to_lowercase();
        lower.match_indices(&needle).any(|(idx, _)| {
            let before = lower[..idx].chars().next_back();
            let after = lower[idx + needle.len()..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
    });
    if let Some(city) = gazetteer_hit {
        return Some(city.to_string());
    }

    let cleaned = clean_value(message);
    let stripped = LOCATION_PREFIX.replace(&cleaned, "");
    let words: Vec<&str> = stripped.split_whitespace().collect();
    let plausible = (1..=3).contains(&words.len())
        && words.iter().all(|w| {
            w.chars().all(|c| c.is_alphabetic() || c == '-' || c == '\'')
                && !NON_PLACE_WORDS.contains(&w.to_lowercase().as_str())
        });
    plausible.then(|| title_case(&words.join(" ")))
}

fn extract_location(message: &str, _: &PatternContext<'_>) -> PatternExtraction {
    let (income, expenses) = budget_by_keyword(message);
    PatternExtraction::of(ProfileDraft {
        city: find_city(message),
        income,
        expenses,
        ..Default::default()
    })
}

// ── budget ──────────────────────────────────────────────────────────

static INCOME_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"(?i)\b(earn|earns|earning|income|make|making|get|getting|salary|paid|receive|allowance|scholarship|job|gagne|gagner|revenus?|touche|salaire|bourse|re[çc]ois)\b",
    )
});
static EXPENSE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"(?i)\b(spend|spends|spending|expenses?|pay|paying|rent|costs?|bills?|d[ée]pense|d[ée]penses|d[ée]penser|loyer|paie|paye|charges)\b",
    )
});

#[derive(Clone, Copy, PartialEq)]
enum BudgetKind {
    Income,
    Expense,
}

/// Nearest budget keyword to the left of `number`, else to its right.
fn keyword_for(message: &str, numbers: &[NumberMatch], index: usize) -> Option<BudgetKind> {
    let number = &numbers[index];
    let left_start = if index == 0 { 0 } else { numbers[index - 1].end };
    let right_end = numbers.get(index + 1).map_or(message.len(), |n| n.start);

    let last_in = |window: &str| -> Option<BudgetKind> {
        let income = INCOME_KEYWORD.find_iter(window).last().map(|m| m.start());
        let expense = EXPENSE_KEYWORD.find_iter(window).last().map(|m| m.start());
        match (income, expense) {
            (Some(i), Some(e)) => Some(if i > e { BudgetKind::Income } else { BudgetKind::Expense }),
            (Some(_), None) => Some(BudgetKind::Income),
            (None, Some(_)) => Some(BudgetKind::Expense),
            (None, None) => None,
        }
    };
    let first_in = |window: &str| -> Option<BudgetKind> {
        let income = INCOME_KEYWORD.find(window).map(|m| m.start());
        let expense = EXPENSE_KEYWORD.find(window).map(|m| m.start());
        match (income, expense) {
            (Some(i), Some(e)) => Some(if i < e { BudgetKind::Income } else { BudgetKind::Expense }),
            (Some(_), None) => Some(BudgetKind::Income),
            (None, Some(_)) => Some(BudgetKind::Expense),
            (None, None) => None,
        }
    };

    message
        .get(left_start..number.start)
        .and_then(last_in)
        .or_else(|| message.get(number.end..right_end).and_then(first_in))
}

/// Income/expenses assigned by keyword proximity only.
fn budget_by_keyword(message: &str) -> (Option<Decimal>, Option<Decimal>) {
    let numbers = find_numbers(message);
    let mut income = None;
    let mut expenses = None;
    for (index, number) in numbers.iter().enumerate() {
        match keyword_for(message, &numbers, index) {
            Some(BudgetKind::Income) if income.is_none() => income = Some(number.value),
            Some(BudgetKind::Expense) if expenses.is_none() => expenses = Some(number.value),
            _ => {}
        }
    }
    (income, expenses)
}

fn extract_budget(message: &str, _: &PatternContext<'_>) -> PatternExtraction {
    let (mut income, mut expenses) = budget_by_keyword(message);
    if income.is_none() && expenses.is_none() {
        // No keyword anywhere: first number is income, second expenses.
        let numbers = find_numbers(message);
        income = numbers.first().map(|n| n.value);
        expenses = numbers.get(1).map(|n| n.value);
    }
    PatternExtraction::of(ProfileDraft {
        income,
        expenses,
        ..Default::default()
    })
}

// ── work preferences ────────────────────────────────────────────────

static HOURLY_RATE: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"(?i)(?:[€£$]\s*)?(\d+(?:[.,]\d{1,2})?)\s*(?:€|£|\$|eur|euros?|dollars?|pounds?|bucks)?\s*(?:/|per|an|a|par|de l')\s*(?:h|hr|hour|heure)\b",
    )
});
static WEEKLY_HOURS: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)(\d+)\s*(?:h|hrs?|hours?|heures?)\b"));

fn extract_work_preferences(message: &str, _: &PatternContext<'_>) -> PatternExtraction {
    let rate_match = HOURLY_RATE.captures(message);
    let min_hourly_rate = rate_match
        .as_ref()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', ".").parse::<Decimal>().ok());

    // Hours are searched with the rate phrase blanked out.
    let without_rate = match rate_match.as_ref().and_then(|caps| caps.get(0)) {
        Some(m) => format!("{}{}", &message[..m.start()], &message[m.end()..]),
        None => message.to_string(),
    };
    let max_work_hours_weekly = WEEKLY_HOURS
        .captures(&without_rate)
        .and_then(|caps| caps[1].parse::<u32>().ok());

    if max_work_hours_weekly.is_some() || min_hourly_rate.is_some() {
        return PatternExtraction::of(ProfileDraft {
            max_work_hours_weekly,
            min_hourly_rate,
            ..Default::default()
        });
    }

    let numbers = find_numbers(message);
    match numbers.as_slice() {
        [only] => PatternExtraction::of(ProfileDraft {
            max_work_hours_weekly: only.value.trunc().to_u32(),
            min_hourly_rate: Some(DEFAULT_MIN_HOURLY_RATE),
            ..Default::default()
        }),
        [hours, rate, ..] => PatternExtraction::of(ProfileDraft {
            max_work_hours_weekly: hours.value.trunc().to_u32(),
            min_hourly_rate: Some(rate.value),
            ..Default::default()
        }),
        [] => PatternExtraction::default(),
    }
}

// ── goal ────────────────────────────────────────────────────────────

static GOAL_PURPOSE: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"(?i)\b(?:save up for|saving for|save for|to buy|to pay for|to get|to afford|towards|for|pour acheter|pour payer|pour m'offrir|pour)\s+(?:(?:a|an|my|the|some|un|une|mon|ma|mes|le|la|les)\s+|l')?([\p{L}][\p{L}'\- ]*)",
    )
});
static GOAL_ARTICLE_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)^(?:a|an|my|un|une|mon|ma)\s+([\p{L}][\p{L}'\- ]{1,40})$")
});

/// Words that end a goal purpose ("a bike by June").
const PURPOSE_STOPWORDS: &[&str] = &[
    "by", "in", "before", "within", "until", "next", "and", "which", "that", "dans", "avant",
    "d'ici", "en", "et", "qui", "jusqu'à", "for", "pour",
];

const TIME_WORDS: &[&str] = &[
    "months", "month", "weeks", "week", "years", "year", "days", "day", "mois", "semaines", "ans",
    "jours", "six", "two", "three",
];

fn clean_purpose(raw: &str) -> Option<String> {
    let words: Vec<&str> = raw
        .split_whitespace()
        .take_while(|w| !PURPOSE_STOPWORDS.contains(&w.to_lowercase().as_str()))
        .collect();
    let first_is_time = words
        .first()
        .is_some_and(|w| TIME_WORDS.contains(&w.to_lowercase().as_str()));
    if words.is_empty() || first_is_time {
        return None;
    }
    let purpose = clean_value(&words.join(" "));
    (!purpose.is_empty()).then_some(purpose)
}

fn extract_goal(message: &str, ctx: &PatternContext<'_>) -> PatternExtraction {
    let cleaned = clean_value(message);
    let deadline = find_deadline(&cleaned, ctx.today);

    let goal_amount = find_numbers(&cleaned)
        .into_iter()
        .find(|n| {
            deadline
                .as_ref()
                .is_none_or(|d| n.end <= d.span.start || n.start >= d.span.end)
        })
        .map(|n| n.value);

    let goal_name = GOAL_PURPOSE
        .captures_iter(&cleaned)
        .find_map(|caps| caps.get(1).and_then(|m| clean_purpose(m.as_str())))
        .or_else(|| {
            GOAL_ARTICLE_ONLY
                .captures(&cleaned)
                .and_then(|caps| caps.get(1).and_then(|m| clean_purpose(m.as_str())))
        });

    let mut missing_info = Vec::new();
    if goal_amount.is_some() && goal_name.is_none() && ctx.draft.goal_name.is_none() {
        missing_info.push("goalName".to_string());
    }

    PatternExtraction {
        fields: ProfileDraft {
            goal_name,
            goal_amount,
            goal_deadline: deadline.map(|d| d.date),
            ..Default::default()
        },
        missing_info,
    }
}

// ── list steps ──────────────────────────────────────────────────────

fn extract_academic_events(message: &str, _: &PatternContext<'_>) -> PatternExtraction {
    PatternExtraction::of(ProfileDraft {
        academic_events: parse_list(message),
        ..Default::default()
    })
}

fn extract_inventory(message: &str, _: &PatternContext<'_>) -> PatternExtraction {
    PatternExtraction::of(ProfileDraft {
        inventory_items: parse_list(message),
        ..Default::default()
    })
}

fn extract_trade(message: &str, _: &PatternContext<'_>) -> PatternExtraction {
    PatternExtraction::of(ProfileDraft {
        trade_opportunities: parse_list(message),
        ..Default::default()
    })
}

fn extract_lifestyle(message: &str, _: &PatternContext<'_>) -> PatternExtraction {
    let subscriptions =
        parse_list(message).map(|items| items.into_iter().map(canonical_service).collect());
    PatternExtraction::of(ProfileDraft {
        subscriptions,
        ..Default::default()
    })
}

/// Usual spelling of a known subscription service, or the input unchanged.
pub(crate) fn canonical_service(item: String) -> String {
    let lower = normalize(&item);
    KNOWN_SERVICES
        .iter()
        .find(|(key, _)| *key == lower)
        .map_or(item, |(_, label)| label.to_string())
}

const KNOWN_SERVICES: &[(&str, &str)] = &[
    ("netflix", "Netflix"),
    ("spotify", "Spotify"),
    ("deezer", "Deezer"),
    ("disney+", "Disney+"),
    ("disney plus", "Disney+"),
    ("amazon prime", "Amazon Prime"),
    ("prime", "Amazon Prime"),
    ("youtube premium", "YouTube Premium"),
    ("apple music", "Apple Music"),
    ("gym", "Gym"),
    ("salle de sport", "Gym"),
    ("canal+", "Canal+"),
    ("xbox game pass", "Xbox Game Pass"),
    ("playstation plus", "PlayStation Plus"),
];
