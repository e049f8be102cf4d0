use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::models::RawRow;
use crate::normalize::excel_serial_to_date;

use super::{ParseFailure, ParseOutput};

/// Resolved column positions for the semantic fields a workbook row can
/// carry. Anything unresolved reads as an empty cell.
#[derive(Debug, Default)]
struct Columns {
    date: Option<usize>,
    name: Option<usize>,
    account: Option<usize>,
    counterparty: Option<usize>,
    direction: Option<usize>,
    amount: Option<usize>,
    memo: Option<usize>,
}

/// Case-insensitive header resolution with locale-variant synonyms: bank
/// exports name the same column differently depending on export language.
fn resolve_columns(headers: &[String]) -> Columns {
    let find = |variants: &[&str]| -> Option<usize> {
        variants
            .iter()
            .find_map(|v| headers.iter().position(|h| h == v))
    };
    Columns {
        date: find(&["datum", "date"]),
        name: find(&["naam / omschrijving", "naam/omschrijving", "omschrijving", "description"]),
        account: find(&["rekening", "iban", "account"]),
        counterparty: find(&["tegenrekening", "counterparty", "iban tegenrekening"]),
        direction: find(&["af bij", "af/bij", "sign"]),
        amount: find(&["bedrag (eur)", "bedrag", "amount", "amount (eur)"]),
        memo: find(&["mededelingen", "details", "memo"]),
    }
}

fn text_cell(row: &[Data], idx: Option<usize>) -> String {
    match idx.and_then(|i| row.get(i)) {
        None | Some(Data::Empty) => String::new(),
        Some(Data::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string().trim().to_string(),
    }
}

/// Dates arrive either as an 8-digit string (handled downstream by the
/// normalizer) or as a workbook serial day count needing epoch conversion.
fn date_cell(row: &[Data], idx: Option<usize>) -> String {
    match idx.and_then(|i| row.get(i)) {
        Some(Data::Float(f)) => excel_serial_to_date(*f),
        Some(Data::Int(i)) => excel_serial_to_date(*i as f64),
        Some(Data::DateTime(dt)) => excel_serial_to_date(dt.as_f64()),
        Some(Data::String(s)) => s.trim().to_string(),
        _ => String::new(),
    }
}

/// Numeric amount cells are re-rendered in the decimal-comma shape the
/// normalizer expects; string cells pass through untouched.
fn amount_cell(row: &[Data], idx: Option<usize>) -> String {
    match idx.and_then(|i| row.get(i)) {
        Some(Data::Float(f)) => format!("{f:.2}").replace('.', ","),
        Some(Data::Int(i)) => format!("{:.2}", *i as f64).replace('.', ","),
        Some(Data::String(s)) => s.trim().to_string(),
        _ => String::new(),
    }
}

/// Parse a legacy binary or XML-zip workbook; `open_workbook_auto` picks
/// the decoder behind one interface. Reads the first sheet only.
pub fn parse(path: &Path) -> Result<ParseOutput, ParseFailure> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ParseFailure::Corrupt(format!("cannot open workbook: {e}")))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ParseFailure::Corrupt("workbook has no sheets".to_string()))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| ParseFailure::Corrupt(format!("cannot read sheet {sheet:?}: {e}")))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = rows_iter
        .next()
        .unwrap_or(&[])
        .iter()
        .map(|c| c.to_string().trim().to_lowercase())
        .collect();
    let cols = resolve_columns(&headers);

    let mut out = ParseOutput::default();
    for row in rows_iter {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let direction = {
            let d = text_cell(row, cols.direction);
            // Workbook exports sometimes omit the Af/Bij column entirely;
            // such rows are booked as outgoing.
            if d.is_empty() {
                "Af".to_string()
            } else {
                d
            }
        };
        out.rows.push(RawRow {
            booking_date: date_cell(row, cols.date),
            name: text_cell(row, cols.name),
            memo: text_cell(row, cols.memo),
            account_iban: text_cell(row, cols.account),
            counterparty_iban: text_cell(row, cols.counterparty),
            direction,
            amount: amount_cell(row, cols.amount),
        });
    }
    Ok(out)
}
