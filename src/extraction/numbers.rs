//! Money and count parsing for free text ("800", "1,200€", "1.5k", "12,50").

use std::sync::LazyLock;

use regex::{Captures, Regex};
use rust_decimal::Decimal;

static NUMBER: LazyLock<Regex> = LazyLock::new(|| number_regex("[,. \u{a0}]"));

/// Same grammar without the plain-space group separator.
static NUMBER_UNSPACED: LazyLock<Regex> = LazyLock::new(|| number_regex("[,.\u{a0}]"));

/// A currency marker right after a number.
static CURRENCY_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:[€£$]|(?:eur|euros?|pounds?|dollars?|balles)\b)").expect("currency regex")
});

fn number_regex(separators: &str) -> Regex {
    Regex::new(&format!(
        r"(?i)(\d{{1,3}}(?:{separators}\d{{3}})+|\d+)(?:[.,](\d{{1,2}}))?(?:\s?(k)\b)?"
    ))
    .expect("number regex")
}

/// A number found in text, with its byte span.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberMatch {
    pub value: Decimal,
    pub start: usize,
    pub end: usize,
}

/// Every number in `text`, left to right.
///
/// A plain space only groups thousands when the leading group is shorter
/// than three digits ("1 200") or a currency marker sits next to the number
/// ("150 000 €"). Otherwise "800 600" stays two numbers.
pub fn find_numbers(text: &str) -> Vec<NumberMatch> {
    let mut found = Vec::new();
    for caps in NUMBER.captures_iter(text) {
        let (Some(whole), Some(int_part)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if space_grouped(int_part.as_str()) && !space_grouping_confirmed(text, int_part.as_str(), whole) {
            let offset = whole.start();
            found.extend(
                NUMBER_UNSPACED
                    .captures_iter(whole.as_str())
                    .filter_map(|inner| number_match(&inner, offset)),
            );
            continue;
        }
        found.extend(number_match(&caps, 0));
    }
    found
}

fn space_grouped(int_part: &str) -> bool {
    int_part.contains(' ')
}

fn space_grouping_confirmed(text: &str, int_part: &str, whole: regex::Match<'_>) -> bool {
    let leading = int_part.split(|c: char| !c.is_ascii_digit()).next().map_or(0, str::len);
    if leading < 3 {
        return true;
    }
    let before = text[..whole.start()].trim_end();
    before.ends_with(['€', '£', '$']) || CURRENCY_AFTER.is_match(&text[whole.end()..])
}

fn number_match(caps: &Captures<'_>, offset: usize) -> Option<NumberMatch> {
    let whole = caps.get(0)?;
    let int_part: String = caps
        .get(1)?
        .as_str()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    let mut value: Decimal = int_part.parse().ok()?;
    if let Some(frac) = caps.get(2) {
        let frac_value: Decimal = frac.as_str().parse().ok()?;
        let scale = Decimal::from(10u32.pow(frac.as_str().len() as u32));
        value += frac_value / scale;
    }
    if caps.get(3).is_some() {
        value *= Decimal::from(1000);
    }
    Some(NumberMatch {
        value: value.normalize(),
        start: offset + whole.start(),
        end: offset + whole.end(),
    })
}

/// First number in `text`, if any.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    find_numbers(text).into_iter().next().map(|m| m.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn plain_and_grouped() {
        assert_eq!(parse_amount("I earn 800"), Some(dec!(800)));
        assert_eq!(parse_amount("about 1,200€"), Some(dec!(1200)));
        assert_eq!(parse_amount("1.200 euros"), Some(dec!(1200)));
        assert_eq!(parse_amount("1\u{a0}500"), Some(dec!(1500)));
        assert_eq!(parse_amount("1 200 par mois"), Some(dec!(1200)));
    }

    #[test]
    fn decimals_and_thousands_suffix() {
        assert_eq!(parse_amount("12,50 per hour"), Some(dec!(12.5)));
        assert_eq!(parse_amount("9.99"), Some(dec!(9.99)));
        assert_eq!(parse_amount("2k"), Some(dec!(2000)));
        assert_eq!(parse_amount("1.5K for a trip"), Some(dec!(1500)));
    }

    #[test]
    fn spans_are_ordered() {
        let found = find_numbers("I earn 800 and spend 600");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].value, dec!(800));
        assert_eq!(found[1].value, dec!(600));
        assert!(found[0].end <= found[1].start);
    }

    #[test]
    fn space_separated_figures_stay_apart() {
        let found = find_numbers("800 600");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].value, dec!(800));
        assert_eq!(found[1].value, dec!(600));
        assert_eq!((found[1].start, found[1].end), (4, 7));

        let found = find_numbers("about 950 400 per month");
        assert_eq!(found.iter().map(|n| n.value).collect::<Vec<_>>(), vec![dec!(950), dec!(400)]);
    }

    #[test]
    fn currency_confirms_space_grouping() {
        assert_eq!(find_numbers("150 000 €").len(), 1);
        assert_eq!(parse_amount("150 000 €"), Some(dec!(150000)));
        assert_eq!(parse_amount("€150 000"), Some(dec!(150000)));
        assert_eq!(parse_amount("12 500 euros"), Some(dec!(12500)));
    }

    #[test]
    fn no_digits_no_numbers() {
        assert!(find_numbers("nothing here").is_empty());
        assert_eq!(parse_amount(""), None);
    }
}
