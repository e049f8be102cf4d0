use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::models::RawRow;

use super::{ParseFailure, ParseOutput};

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{2}-\d{2}-\d{4})\b").unwrap())
}

fn iban_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b([A-Z]{2}\d{2}[A-Z]{4}\d{10})\b").unwrap())
}

fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([-+]?\d{1,3}(?:\.\d{3})*,\d{2})").unwrap())
}

/// PDF statements have no structured schema. Extract the page text and
/// treat every line carrying both a date-shaped and an amount-shaped token
/// as one transaction candidate. Unrelated lines that happen to contain
/// both patterns produce false positives; that is a known limitation of
/// this heuristic, not something to harden away silently.
pub fn parse(path: &Path) -> Result<ParseOutput, ParseFailure> {
    let text = pdf_extract::extract_text(path)
        .map_err(|e| ParseFailure::Corrupt(format!("text extraction failed: {e}")))?;
    Ok(scan_text(&text))
}

/// The heuristic itself, split out from the extraction so it can run on
/// plain text.
pub fn scan_text(text: &str) -> ParseOutput {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|ln| !ln.is_empty())
        .collect();

    // One document-wide IBAN guess; without it every candidate lands in
    // the unknown-account bucket.
    let account_iban = iban_re()
        .captures(text)
        .map(|c| c[1].to_string())
        .unwrap_or_default();

    let mut out = ParseOutput::default();
    for (i, ln) in lines.iter().enumerate() {
        let (date, amount) = match (date_re().captures(ln), amount_re().captures(ln)) {
            (Some(d), Some(a)) => (d[1].to_string(), a[1].to_string()),
            _ => continue,
        };
        // Description: the line with both tokens stripped, falling back to
        // the next line when nothing is left.
        let stripped = date_re().replace_all(ln, "");
        let stripped = amount_re().replace_all(&stripped, "");
        let stripped = stripped.trim();
        let description = if stripped.is_empty() {
            lines.get(i + 1).copied().unwrap_or("").to_string()
        } else {
            stripped.to_string()
        };
        let direction = if amount.contains('-') { "Af" } else { "Bij" };
        out.rows.push(RawRow {
            booking_date: date,
            name: String::new(),
            memo: description,
            account_iban: account_iban.clone(),
            counterparty_iban: String::new(),
            direction: direction.to_string(),
            amount: amount.replace('-', ""),
        });
    }
    out
}
