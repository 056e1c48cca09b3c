use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static ORDER_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\border[\s:#-]*\d+").unwrap());
static HASH_NUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#\d+").unwrap());

static REF_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:ref|reference|utr|rrn|txn|transaction)[\s.:#-]*\d{6,}\b").unwrap());

static UPI_HANDLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([a-z][a-z0-9]*[.\-]?)?(\d{4,})(@[a-z][a-z0-9.]*)").unwrap());

static DATE_SLASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{2}/\d{2}/\d{4}\b").unwrap());
static DATE_ISO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").unwrap());

static CURRENCY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:[₹$€£¥]|\b(?:rs|inr)\.?)\s*\d[\d,]*(?:\.\d+)?").unwrap());

static DIGIT_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Rewrites a free-text description so that near-duplicates differing only in
/// a volatile substring (order number, reference id, date, amount) collapse
/// to one classifier cache key. Merchant and location tokens are never
/// substituted; they are the signal the classifier needs.
///
/// Substitutions run in a fixed priority order; each one consumes the digits
/// it matched, so later rules only see what is left.
pub fn normalize_description(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let mut out = trimmed.to_lowercase();

    out = ORDER_WORD_RE.replace_all(&out, "order #ORDER").into_owned();
    out = HASH_NUM_RE.replace_all(&out, "#ORDER").into_owned();

    out = REF_MARKER_RE
        .replace_all(&out, |caps: &Captures| mask_digits(&caps[0]))
        .into_owned();

    out = UPI_HANDLE_RE
        .replace_all(&out, |caps: &Captures| {
            format!(
                "{}{}{}",
                caps.get(1).map(|m| m.as_str()).unwrap_or(""),
                "X".repeat(caps[2].len()),
                &caps[3],
            )
        })
        .into_owned();

    out = DATE_SLASH_RE.replace_all(&out, "DD/MM/YYYY").into_owned();
    out = DATE_ISO_RE.replace_all(&out, "YYYY-MM-DD").into_owned();

    out = CURRENCY_RE
        .replace_all(&out, |caps: &Captures| mask_digits(&caps[0]))
        .into_owned();

    out = DIGIT_RUN_RE
        .replace_all(&out, |caps: &Captures| "X".repeat(caps[0].len()))
        .into_owned();

    return out;
}

fn mask_digits(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_digit() { 'X' } else { c })
        .collect()
}

/// Groups originals by their normalized form, preserving first-seen order
/// within each group. The import service issues one classifier call per
/// group and fans the category back out to every original.
pub fn normalize_batch(texts: &[String]) -> HashMap<String, Vec<String>> {
    let mut groups: HashMap<String, Vec<String>> = HashMap::new();

    for text in texts {
        groups
            .entry(normalize_description(text))
            .or_default()
            .push(text.clone());
    }

    return groups;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn order_numbers_collapse_to_one_key() {
        let a = normalize_description("SWIGGY ORDER #12345");
        let b = normalize_description("SWIGGY ORDER #67890");

        assert_eq!(a, b);
        assert_eq!(a, "swiggy order #ORDER");
    }

    #[test]
    fn reference_ids_keep_their_digit_count() {
        assert_eq!(
            normalize_description("UPI REF 931523643407 SHAIK"),
            "upi ref XXXXXXXXXXXX shaik"
        );
    }

    #[test]
    fn upi_handles_keep_merchant_and_bank() {
        assert_eq!(
            normalize_description("payment to merchant-12345678@okaxis done"),
            "payment to merchant-XXXXXXXX@okaxis done"
        );
    }

    #[test]
    fn dates_become_literal_placeholders() {
        assert_eq!(
            normalize_description("EMI 05/01/2024 HDFC"),
            "emi DD/MM/YYYY hdfc"
        );
        assert_eq!(
            normalize_description("autopay 2024-01-05 netflix"),
            "autopay YYYY-MM-DD netflix"
        );
    }

    #[test]
    fn amounts_keep_currency_literal_and_decimal_point() {
        assert_eq!(
            normalize_description("Rs. 2,500.00 paid to landlord"),
            "rs. X,XXX.XX paid to landlord"
        );
        assert_eq!(normalize_description("₹199 recharge"), "₹XXX recharge");
    }

    #[test]
    fn leftover_digit_runs_are_masked_by_length() {
        assert_eq!(normalize_description("room 42 rent"), "room XX rent");
    }

    #[test]
    fn empty_and_whitespace_input_is_empty() {
        assert_eq!(normalize_description(""), "");
        assert_eq!(normalize_description("   \t"), "");
    }

    #[test]
    fn batch_groups_preserve_first_seen_order() {
        let texts = vec![
            "SWIGGY ORDER #12345".to_owned(),
            "UBER TRIP".to_owned(),
            "SWIGGY ORDER #67890".to_owned(),
        ];

        let groups = normalize_batch(&texts);

        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups["swiggy order #ORDER"],
            vec!["SWIGGY ORDER #12345", "SWIGGY ORDER #67890"]
        );
        assert_eq!(groups["uber trip"], vec!["UBER TRIP"]);
    }
}
