use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::CanonicalTransaction;

/// Derives the deduplication key for a transaction. Two rows are the same
/// transaction iff these four fields match after canonicalization: the date
/// is truncated to its calendar day (timezone formatting noise must collide),
/// the amount is rendered with exactly two decimals, and the description is
/// lowercased and trimmed.
pub fn fingerprint(user_id: &str, date: &DateTime<Utc>, amount: f64, description: &str) -> String {
    let raw = format!(
        "{}|{}|{:.2}|{}",
        user_id,
        date.format("%Y-%m-%d"),
        amount,
        description.trim().to_lowercase(),
    );

    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());

    return hex::encode(hasher.finalize());
}

/// In-batch deduplication: rows are visited in arrival order and the first
/// occurrence of a fingerprint wins. Returns the survivors plus the number
/// of duplicates dropped.
pub fn dedupe_batch(rows: Vec<CanonicalTransaction>) -> (Vec<CanonicalTransaction>, usize) {
    let mut seen: HashSet<String> = HashSet::with_capacity(rows.len());
    let mut unique = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;

    for row in rows {
        if seen.insert(row.fingerprint.clone()) {
            unique.push(row);
        } else {
            skipped += 1;
        }
    }

    return (unique, skipped);
}

#[cfg(test)]
mod test {
    use chrono::DateTime;

    use crate::data::create_id;
    use crate::ingest::amount::TxType;
    use crate::ingest::{UNCATEGORIZED, UNKNOWN_MERCHANT, parse_date};

    use super::*;

    fn tx(fingerprint: &str, description: &str) -> CanonicalTransaction {
        CanonicalTransaction {
            id: create_id(),
            date: DateTime::parse_from_rfc3339("2024-01-15T00:00:00Z")
                .expect("ts")
                .to_utc(),
            amount: -10.0,
            description: description.to_owned(),
            merchant: UNKNOWN_MERCHANT.to_owned(),
            category: UNCATEGORIZED.to_owned(),
            tx_type: TxType::Expense,
            fingerprint: fingerprint.to_owned(),
        }
    }

    #[test]
    fn timezone_formatting_noise_collides() {
        let a = parse_date(&serde_json::json!("2024-01-15T00:00:00Z")).unwrap();
        let b = parse_date(&serde_json::json!("2024-01-15")).unwrap();

        assert_eq!(
            fingerprint("u1", &a, -12.5, "coffee"),
            fingerprint("u1", &b, -12.5, "coffee"),
        );
    }

    #[test]
    fn description_case_and_padding_collide() {
        let date = parse_date(&serde_json::json!("2024-01-15")).unwrap();

        assert_eq!(
            fingerprint("u1", &date, -12.5, "  COFFEE  "),
            fingerprint("u1", &date, -12.5, "coffee"),
        );
    }

    #[test]
    fn amount_formatting_collides_at_two_decimals() {
        let date = parse_date(&serde_json::json!("2024-01-15")).unwrap();

        assert_eq!(
            fingerprint("u1", &date, 50.0, "x"),
            fingerprint("u1", &date, 50.00, "x"),
        );
        assert_ne!(
            fingerprint("u1", &date, 50.01, "x"),
            fingerprint("u1", &date, 50.00, "x"),
        );
    }

    #[test]
    fn users_do_not_collide() {
        let date = parse_date(&serde_json::json!("2024-01-15")).unwrap();

        assert_ne!(
            fingerprint("u1", &date, 50.0, "x"),
            fingerprint("u2", &date, 50.0, "x"),
        );
    }

    #[test]
    fn first_occurrence_wins_in_batch() {
        let rows = vec![tx("fp-a", "first"), tx("fp-b", "other"), tx("fp-a", "second")];

        let (unique, skipped) = dedupe_batch(rows);

        assert_eq!(skipped, 1);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].description, "first");
    }
}
