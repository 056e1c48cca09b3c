use std::collections::HashMap;

use anyhow::Context;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    data::{Data, create_id},
    error::ApiError,
    ingest::{
        CanonicalTransaction, RawRow, UNCATEGORIZED, extract_row,
        fingerprint::{dedupe_batch, fingerprint},
        narration::NarrationParser,
        normalize::normalize_batch,
    },
    services::classifier::Classifier,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct FailedRow {
    pub row: usize,
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped_duplicates: usize,
    pub failed: Vec<FailedRow>,
}

/// Runs one uploaded batch through the pipeline: validation, fingerprint
/// dedup (in-batch then against the store), narration enrichment, grouped
/// classification, insert. Row-level failures are collected; storage
/// failures abort the batch with no partial silent success.
pub async fn import_rows(
    data: &Data,
    classifier: &Classifier,
    parser: &NarrationParser,
    user_id: &str,
    rows: Vec<RawRow>,
) -> Result<ImportSummary, ApiError> {
    let (candidates, failed) = build_candidates(parser, user_id, &rows);

    let (candidates, mut skipped_duplicates) = dedupe_batch(candidates);

    // resolved in arrival order so skip counts stay deterministic; a failed
    // check is fatal for the batch, the row is never inserted on the side
    let mut fresh = Vec::with_capacity(candidates.len());
    for tx in candidates {
        let exists = data
            .transactions
            .fingerprint_exists(user_id, &tx.fingerprint)
            .await
            .context("error checking for duplicate transaction")?;

        if exists {
            skipped_duplicates += 1;
        } else {
            fresh.push(tx);
        }
    }

    classify(classifier, &mut fresh).await;

    data.transactions
        .insert_many(user_id, &fresh)
        .await
        .context("error inserting transactions")?;

    let summary = ImportSummary {
        inserted: fresh.len(),
        skipped_duplicates,
        failed,
    };

    tracing::info!(
        inserted = summary.inserted,
        skipped_duplicates = summary.skipped_duplicates,
        failed = summary.failed.len(),
        "import finished"
    );

    return Ok(summary);
}

/// Validates and enriches raw rows into canonical candidates. A failing row
/// is reported with its index and reason, never aborts the rest.
pub fn build_candidates(
    parser: &NarrationParser,
    user_id: &str,
    rows: &[RawRow],
) -> (Vec<CanonicalTransaction>, Vec<FailedRow>) {
    let mut candidates = Vec::with_capacity(rows.len());
    let mut failed = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        let values = match extract_row(row) {
            Ok(values) => values,
            Err(err) => {
                failed.push(FailedRow {
                    row: idx,
                    error: err.to_string(),
                });
                continue;
            }
        };

        let parsed = parser.parse(&values.description);

        candidates.push(CanonicalTransaction {
            id: create_id(),
            fingerprint: fingerprint(user_id, &values.date, values.amount, &values.description),
            date: values.date,
            amount: values.amount,
            merchant: parsed.merchant,
            category: values.category.unwrap_or_else(|| UNCATEGORIZED.to_owned()),
            tx_type: values.tx_type,
            description: values.description,
        });
    }

    return (candidates, failed);
}

// Best-effort enrichment: descriptions are normalized so near-duplicates
// share one classifier call, and a failed call leaves the sentinel in place
// instead of failing the import.
async fn classify(classifier: &Classifier, txs: &mut [CanonicalTransaction]) {
    let texts: Vec<String> = txs
        .iter()
        .filter(|tx| tx.category == UNCATEGORIZED)
        .map(|tx| tx.description.clone())
        .collect();
    if texts.is_empty() {
        return;
    }

    let mut categories: HashMap<String, String> = HashMap::new();
    for (normalized, originals) in normalize_batch(&texts) {
        match classifier.classify(&normalized).await {
            Ok(category) => {
                for original in originals {
                    categories.insert(original, category.clone());
                }
            }
            Err(err) => {
                tracing::warn!("classifier call failed, leaving group uncategorized: {err:#}")
            }
        }
    }

    for tx in txs.iter_mut() {
        if tx.category != UNCATEGORIZED {
            continue;
        }
        if let Some(category) = categories.get(&tx.description) {
            tx.category = category.clone();
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use serde_json::json;

    use crate::ingest::narration::MerchantAliasTable;

    use super::*;

    fn parser() -> NarrationParser {
        NarrationParser::new(MerchantAliasTable::default())
    }

    fn batch() -> Vec<RawRow> {
        let rows = [
            ("15/01/2024", "POS ATM PURCH OTHPG 3155010693 17Pho*PHONEPE RECHARGE BANGALORE", "-199.00"),
            ("16/01/2024", "DEP TFR UPI/CR/320278741671/SHAIK YA/SBIN/skya smeen1/Paym", "2500.00"),
            ("17/01/2024", "CHQ CLEARING 000812 HOUSE RENT", "-15000.00"),
        ];

        rows.iter()
            .map(|(date, description, amount)| {
                RawRow::from([
                    ("date".to_owned(), json!(date)),
                    ("description".to_owned(), json!(description)),
                    ("amount".to_owned(), json!(amount)),
                ])
            })
            .collect()
    }

    #[test]
    fn candidates_carry_enriched_merchants() {
        let (candidates, failed) = build_candidates(&parser(), "u1", &batch());

        assert!(failed.is_empty());
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].merchant, "PhonePe");
        assert_eq!(candidates[1].merchant, "SHAIK YA");
        assert_eq!(candidates[2].merchant, "Unknown");
        assert_eq!(candidates[2].description, "CHQ CLEARING 000812 HOUSE RENT");
    }

    #[test]
    fn bad_rows_are_reported_not_fatal() {
        let mut rows = batch();
        rows.push(RawRow::from([
            ("date".to_owned(), json!("not a date")),
            ("description".to_owned(), json!("BROKEN ROW")),
            ("amount".to_owned(), json!("10.00")),
        ]));
        rows.push(RawRow::from([
            ("date".to_owned(), json!("18/01/2024")),
            ("description".to_owned(), json!("FREE LUNCH")),
            ("amount".to_owned(), json!("abc")),
        ]));

        let (candidates, failed) = build_candidates(&parser(), "u1", &rows);

        assert_eq!(candidates.len(), 3);
        assert_eq!(failed.len(), 2);
        assert_eq!(failed[0].row, 3);
        assert_eq!(failed[0].error, "unparseable date");
        assert_eq!(failed[1].row, 4);
        assert_eq!(failed[1].error, "unparseable amount");
    }

    #[test]
    fn reimporting_the_same_batch_skips_everything() {
        let parser = parser();

        let (first, _) = build_candidates(&parser, "u1", &batch());
        let (first, skipped) = dedupe_batch(first);
        assert_eq!(skipped, 0);

        // what the store would hold after the first import
        let persisted: HashSet<String> = first.iter().map(|tx| tx.fingerprint.clone()).collect();

        let (second, _) = build_candidates(&parser, "u1", &batch());
        let (second, _) = dedupe_batch(second);
        assert!(second.iter().all(|tx| persisted.contains(&tx.fingerprint)));
    }

    #[test]
    fn in_batch_duplicates_first_occurrence_wins() {
        let mut rows = batch();
        rows.extend(batch());

        let (candidates, _) = build_candidates(&parser(), "u1", &rows);
        let (unique, skipped) = dedupe_batch(candidates);

        assert_eq!(unique.len(), 3);
        assert_eq!(skipped, 3);
    }
}
