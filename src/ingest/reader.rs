use std::io::Cursor;

use anyhow::{Context, Result, bail};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use serde_json::{Value, json};

use super::RawRow;

// Header spellings seen across bank exports, mapped to the canonical keys
// the pipeline reads. First list to claim a header wins.
const COLUMN_ALIASES: &[(&str, &[&str])] = &[
    (
        "date",
        &[
            "date",
            "transaction date",
            "txn date",
            "value date",
            "posting date",
            "trans date",
            "time",
            "timestamp",
        ],
    ),
    (
        "description",
        &[
            "description",
            "desc",
            "particulars",
            "details",
            "narration",
            "transaction details",
            "remarks",
            "memo",
            "original description",
        ],
    ),
    (
        "debit",
        &["debit", "debit amount", "withdrawal", "dr", "dr amount", "outflow"],
    ),
    (
        "credit",
        &["credit", "credit amount", "deposit", "cr", "cr amount", "inflow"],
    ),
    (
        "amount",
        &["amount", "transaction amount", "txn amount", "amt", "value", "amount (inr)"],
    ),
    ("type", &["type", "transaction type", "txn type", "dr/cr"]),
    ("category", &["category", "category name"]),
];

/// Reads an uploaded statement into raw rows keyed by canonical column name.
/// Only an empty or unreadable file is fatal; individual bad records are
/// skipped here and per-row validation happens downstream.
pub fn read_rows(filename: &str, bytes: &[u8]) -> Result<Vec<RawRow>> {
    let lower = filename.to_lowercase();

    if lower.ends_with(".xlsx") || lower.ends_with(".xls") || lower.ends_with(".xlsm") {
        return read_excel(bytes);
    }
    if lower.ends_with(".tsv") {
        return read_delimited(bytes, b'\t');
    }

    return read_delimited(bytes, probe_delimiter(bytes));
}

// Some banks export semicolon-separated "csv" files.
fn probe_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or(&[]);
    let semicolons = first_line.iter().filter(|b| **b == b';').count();
    let commas = first_line.iter().filter(|b| **b == b',').count();

    if semicolons > commas { b';' } else { b',' }
}

fn read_delimited(bytes: &[u8], delimiter: u8) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .context("error reading header row")?
        .iter()
        .map(canonical_column)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!("skipping unreadable record: {err}");
                continue;
            }
        };

        let mut row = RawRow::new();
        for (i, cell) in record.iter().enumerate() {
            let Some(key) = headers.get(i) else { continue };
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }
            row.insert(key.clone(), Value::String(cell.to_owned()));
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }

    if rows.is_empty() {
        bail!("file contains no data rows");
    }

    return Ok(rows);
}

fn read_excel(bytes: &[u8]) -> Result<Vec<RawRow>> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor).context("error opening workbook")?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .context("workbook has no sheets")?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .context("error reading worksheet")?;

    let grid: Vec<Vec<Data>> = range.rows().map(|row| row.to_vec()).collect();
    let header_idx = find_header_row(&grid).context("could not find a header row")?;
    let headers: Vec<String> = grid[header_idx]
        .iter()
        .map(|cell| canonical_column(&cell_to_string(cell)))
        .collect();

    let mut rows = Vec::new();
    for row in grid.iter().skip(header_idx + 1) {
        let mut map = RawRow::new();
        for (i, cell) in row.iter().enumerate() {
            let Some(key) = headers.get(i) else { continue };
            if let Some(value) = cell_value(cell) {
                map.insert(key.clone(), value);
            }
        }
        if !map.is_empty() {
            rows.push(map);
        }
    }

    if rows.is_empty() {
        bail!("file contains no data rows");
    }

    return Ok(rows);
}

// Statement sheets lead with logos and account summaries; the real header is
// the first row carrying a date, a narration and an amount-ish column.
fn find_header_row(grid: &[Vec<Data>]) -> Option<usize> {
    for (idx, row) in grid.iter().take(20).enumerate() {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| cell_to_string(cell).to_lowercase())
            .collect();

        let has_date = cells.iter().any(|c| c.contains("date"));
        let has_desc = cells.iter().any(|c| {
            ["desc", "particular", "detail", "narration"]
                .iter()
                .any(|k| c.contains(k))
        });
        let has_amount = cells.iter().any(|c| {
            ["amount", "debit", "credit", "dr", "cr"]
                .iter()
                .any(|k| c.contains(k))
        });

        if has_date && has_desc && has_amount {
            return Some(idx);
        }
    }

    return None;
}

fn canonical_column(name: &str) -> String {
    let name = name.trim().to_lowercase();
    for (canonical, aliases) in COLUMN_ALIASES {
        if aliases.contains(&name.as_str()) {
            return (*canonical).to_owned();
        }
    }
    name
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn cell_value(cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(Value::String(s.to_owned()))
            }
        }
        Data::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number),
        Data::Int(i) => Some(json!(i)),
        Data::Bool(b) => Some(json!(b)),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|dt| Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(Value::String(s.clone())),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_comma_csv_with_canonical_headers() {
        let csv = "Txn Date,Narration,Withdrawal,Deposit\n\
                   15/01/2024,POS PURCHASE SWIGGY,120.50,\n\
                   16/01/2024,SALARY JAN,,50000.00\n";

        let rows = read_rows("statement.csv", csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["date"], "15/01/2024");
        assert_eq!(rows[0]["description"], "POS PURCHASE SWIGGY");
        assert_eq!(rows[0]["debit"], "120.50");
        assert!(rows[0].get("credit").is_none());
        assert_eq!(rows[1]["credit"], "50000.00");
    }

    #[test]
    fn probes_semicolon_delimited_exports() {
        let csv = "date;description;amount\n2024-01-15;TEST ROW;-12.00\n";

        let rows = read_rows("statement.csv", csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["amount"], "-12.00");
    }

    #[test]
    fn empty_file_is_fatal() {
        assert!(read_rows("statement.csv", b"date,description,amount\n").is_err());
    }

    #[test]
    fn header_row_is_found_below_preamble() {
        let grid = vec![
            vec![Data::String("Account Statement".to_owned())],
            vec![Data::Empty],
            vec![
                Data::String("Txn Date".to_owned()),
                Data::String("Details".to_owned()),
                Data::String("Debit".to_owned()),
                Data::String("Credit".to_owned()),
            ],
            vec![
                Data::String("15/01/2024".to_owned()),
                Data::String("ATM WDL".to_owned()),
                Data::Float(500.0),
                Data::Empty,
            ],
        ];

        assert_eq!(find_header_row(&grid), Some(2));
    }
}
