//! Deadline normalization: turns "in 6 months", "dans 3 semaines", "June",
//! "juin 2027" or an ISO date into an absolute calendar date.

use std::ops::Range;
use std::sync::LazyLock;

use chrono::{Datelike, Days, Months, NaiveDate};
use regex::Regex;

const UNITS: &str = r"days?|weeks?|months?|years?|jours?|semaines?|mois|ans?|ann[ée]es?";

pub(crate) const NUMBER_WORDS: &str =
    r"\d+|an|a|one|two|three|four|five|six|seven|eight|nine|ten|twelve|un|une|deux|trois|quatre|cinq|sept|huit|neuf|dix|douze";

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("iso regex"));

static RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:in|within|dans|d'ici|sous)\s+(?:the\s+next\s+)?({NUMBER_WORDS})\s*({UNITS})\b"
    ))
    .expect("relative regex")
});

static BARE_RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^\s*({NUMBER_WORDS})\s*({UNITS})\b")).expect("bare regex")
});

static NEXT_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:next\s+(week|month|year)|(?:la\s+)?(semaine)\s+prochaine|(?:le\s+)?(mois)\s+prochain|(?:l['’])?(ann[ée]e)\s+prochaine)\b",
    )
    .expect("next unit regex")
});

static MONTH_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(\d{1,2})(?:st|nd|rd|th|er)?\s+)?(january|february|march|april|may|june|july|august|september|october|november|december|janvier|f[ée]vrier|mars|avril|mai|juin|juillet|ao[uû]t|septembre|octobre|novembre|d[ée]cembre|sept)\b(?:\s+(\d{1,2})(?:st|nd|rd|th)?\b)?(?:,?\s+(\d{4})\b)?",
    )
    .expect("month regex")
});

const GENERIC_FORMATS: &[&str] = &["%d/%m/%Y", "%Y/%m/%d", "%d.%m.%Y", "%B %d, %Y", "%d %B %Y", "%b %d, %Y"];

/// A deadline phrase found in free text.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadlineMatch {
    pub date: NaiveDate,
    pub span: Range<usize>,
}

/// Normalize a deadline phrase to an absolute date.
///
/// Tried in order: ISO date, "in N <unit>", bare "N <unit>", "next <unit>",
/// month name (with optional day and year), then a few generic formats.
/// Month names without a year roll to next year once already past.
pub fn normalize_deadline(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(found) = find_deadline(raw, today) {
        return Some(found.date);
    }
    let trimmed = raw.trim().trim_end_matches(['.', '!']);
    GENERIC_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Locate the first recognizable deadline phrase in `text`.
pub fn find_deadline(text: &str, today: NaiveDate) -> Option<DeadlineMatch> {
    if let Some(caps) = ISO_DATE.captures(text)
        && let Some(date) = ymd(&caps[1], &caps[2], &caps[3])
    {
        return Some(DeadlineMatch {
            date,
            span: caps.get(0)?.range(),
        });
    }

    for re in [&*RELATIVE, &*BARE_RELATIVE] {
        if let Some(caps) = re.captures(text)
            && let Some(count) = number_word(&caps[1])
            && let Some(date) = add_offset(today, count, &caps[2])
        {
            return Some(DeadlineMatch {
                date,
                span: caps.get(0)?.range(),
            });
        }
    }

    if let Some(caps) = NEXT_UNIT.captures(text) {
        let unit = (2..=4)
            .chain(std::iter::once(1))
            .find_map(|i| caps.get(i).map(|m| m.as_str().to_string()))?;
        if let Some(date) = add_offset(today, 1, &unit) {
            return Some(DeadlineMatch {
                date,
                span: caps.get(0)?.range(),
            });
        }
    }

    for caps in MONTH_NAME.captures_iter(text) {
        let Some(month) = month_number(&caps[2]) else {
            continue;
        };
        // "may" is also a verb; only trust it with a day or year attached.
        let bare = caps.get(1).is_none() && caps.get(3).is_none() && caps.get(4).is_none();
        if bare && caps[2].eq_ignore_ascii_case("may") {
            continue;
        }
        let day = caps
            .get(1)
            .or_else(|| caps.get(3))
            .and_then(|m| m.as_str().parse::<u32>().ok());
        let explicit_year = caps.get(4).and_then(|m| m.as_str().parse::<i32>().ok());
        if let Some(date) = resolve_month(today, month, day, explicit_year) {
            return Some(DeadlineMatch {
                date,
                span: caps.get(0)?.range(),
            });
        }
    }

    None
}

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

pub(crate) fn number_word(raw: &str) -> Option<u32> {
    if let Ok(n) = raw.parse::<u32>() {
        return Some(n);
    }
    let n = match raw.to_lowercase().as_str() {
        "a" | "an" | "one" | "un" | "une" => 1,
        "two" | "deux" => 2,
        "three" | "trois" => 3,
        "four" | "quatre" => 4,
        "five" | "cinq" => 5,
        "six" => 6,
        "seven" | "sept" => 7,
        "eight" | "huit" => 8,
        "nine" | "neuf" => 9,
        "ten" | "dix" => 10,
        "twelve" | "douze" => 12,
        _ => return None,
    };
    Some(n)
}

fn add_offset(today: NaiveDate, count: u32, unit: &str) -> Option<NaiveDate> {
    let unit = unit.to_lowercase();
    if unit.starts_with("day") || unit.starts_with("jour") {
        today.checked_add_days(Days::new(u64::from(count)))
    } else if unit.starts_with("week") || unit.starts_with("semaine") {
        today.checked_add_days(Days::new(u64::from(count) * 7))
    } else if unit.starts_with("month") || unit == "mois" {
        today.checked_add_months(Months::new(count))
    } else if unit.starts_with("year") || unit.starts_with("an") {
        today.checked_add_months(Months::new(count.checked_mul(12)?))
    } else {
        None
    }
}

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    let n = match lower.as_str() {
        "january" | "janvier" => 1,
        "february" | "février" | "fevrier" => 2,
        "march" | "mars" => 3,
        "april" | "avril" => 4,
        "may" | "mai" => 5,
        "june" | "juin" => 6,
        "july" | "juillet" => 7,
        "august" | "août" | "aout" => 8,
        "september" | "septembre" | "sept" => 9,
        "october" | "octobre" => 10,
        "november" | "novembre" => 11,
        "december" | "décembre" | "decembre" => 12,
        _ => return None,
    };
    Some(n)
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = first.checked_add_months(Months::new(1))?;
    next_first.pred_opt()
}

fn resolve_month(today: NaiveDate, month: u32, day: Option<u32>, year: Option<i32>) -> Option<NaiveDate> {
    let build = |y: i32| match day {
        Some(d) => NaiveDate::from_ymd_opt(y, month, d),
        None => last_day_of_month(y, month),
    };
    match year {
        Some(y) => build(y),
        None => {
            let this_year = build(today.year())?;
            if this_year < today {
                build(today.year() + 1)
            } else {
                Some(this_year)
            }
        }
    }
}
