use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use sha2::{Digest, Sha256};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use crate::models::{Direction, NewTransaction, RawRow};

/// A single row failed to decode. Row errors never abort a document scan;
/// the pipeline records them as failed parse events and moves on.
#[derive(Error, Debug)]
pub enum RowError {
    #[error("bad booking date: {0:?}")]
    BadDate(String),

    #[error("bad amount: {0:?}")]
    BadAmount(String),
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Parse a European-formatted amount ("1.234,56", non-breaking-space
/// thousands groups allowed) into signed cents. The sign comes from the
/// direction token only; the same magnitude string can mean either
/// direction depending on the source format.
pub fn parse_eu_amount_cents(raw: &str, direction: Direction) -> Result<i64, RowError> {
    let s = raw
        .trim()
        .replace('.', "")
        .replace('\u{a0}', "")
        .replace(' ', "")
        .replace(',', ".");
    let val: f64 = s
        .parse()
        .map_err(|_| RowError::BadAmount(raw.to_string()))?;
    let cents = (val * 100.0).round() as i64;
    Ok(match direction {
        Direction::Debit => -cents.abs(),
        Direction::Credit => cents.abs(),
    })
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Booking dates arrive as 8-digit `YYYYMMDD` (ING CSV), `dd-mm-yyyy`
/// (PDF statements) or already-ISO strings (reprocessed exports).
pub fn parse_booking_date(raw: &str) -> Result<String, RowError> {
    let s = raw.trim();
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(d) = NaiveDate::parse_from_str(s, "%Y%m%d") {
            return Ok(d.format("%Y-%m-%d").to_string());
        }
    }
    for fmt in ["%Y-%m-%d", "%d-%m-%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d.format("%Y-%m-%d").to_string());
        }
    }
    Err(RowError::BadDate(raw.to_string()))
}

/// Legacy workbook serial date to ISO. Epoch is 1899-12-30, which absorbs
/// the 1900 leap year bug.
#[cfg(any(feature = "excel", test))]
pub fn excel_serial_to_date(serial: f64) -> String {
    let base = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();
    let date = base + chrono::Duration::days(serial as i64);
    date.format("%Y-%m-%d").to_string()
}

fn value_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Valutadatum:\s*(\d{2}-\d{2}-\d{4})").unwrap())
}

/// Some descriptions embed a secondary value date as free text
/// ("Valutadatum: 16-01-2023"); expose it separately from the booking date.
pub fn extract_value_date(text: &str) -> Option<String> {
    let m = value_date_re().captures(text)?;
    let d = NaiveDate::parse_from_str(&m[1], "%d-%m-%Y").ok()?;
    Some(d.format("%Y-%m-%d").to_string())
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// NFKD decomposition, whitespace runs collapsed to one space, trimmed.
/// Applied to every free-text field before hashing or comparison.
pub fn normalize_text(value: &str) -> String {
    let decomposed: String = value.nfkd().collect();
    decomposed.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn volatile_res() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(?i)Datum/Tijd:\s*\d{2}-\d{2}-\d{4}\s*\d{2}:\d{2}:\d{2}",
            r"(?i)Pasvolgnr:\s*\d+",
            r"(?i)Term:\s*\S+",
            r"(?i)Apple Pay",
            r"(?i)Transactie:\s*\S+",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

/// `normalize_text` plus removal of volatile tokens (embedded timestamps,
/// card sequence numbers, terminal ids, payment-network markers) so that
/// noise inside a description does not change the fingerprint between
/// reprocessing runs.
pub fn normalize_description(desc: &str) -> String {
    let mut v = normalize_text(desc);
    for re in volatile_res() {
        v = re.replace_all(&v, "").into_owned();
    }
    v.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

pub struct FingerprintInput<'a> {
    pub account_id: i64,
    pub booking_date: &'a str,
    pub value_date: Option<&'a str>,
    pub amount_cents: i64,
    pub currency: &'a str,
    pub direction: Direction,
    pub counterparty_ref: &'a str,
    pub normalized_description: &'a str,
}

/// SHA-256 over the pipe-joined, upper-cased canonical tuple. Field order
/// and casing are frozen: changing either silently orphans every stored
/// fingerprint.
pub fn fingerprint(inp: &FingerprintInput) -> String {
    let parts = [
        inp.account_id.to_string(),
        inp.booking_date.to_string(),
        inp.value_date.unwrap_or("").to_string(),
        inp.amount_cents.to_string(),
        inp.currency.to_uppercase(),
        inp.direction.as_str().to_string(),
        normalize_text(inp.counterparty_ref).to_uppercase(),
        inp.normalized_description.to_uppercase(),
    ];
    let mut hasher = Sha256::new();
    hasher.update(parts.join("|").as_bytes());
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Row normalization
// ---------------------------------------------------------------------------

fn none_if_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Map a loosely-typed parser row plus resolved account identity onto the
/// canonical transaction record and its fingerprint. Pure; all storage
/// happens in the pipeline.
pub fn normalize_row(
    raw: &RawRow,
    account_id: i64,
    document_id: i64,
) -> Result<NewTransaction, RowError> {
    let booking_date = parse_booking_date(&raw.booking_date)?;
    let description = {
        let memo = raw.memo.trim();
        if memo.is_empty() {
            raw.name.trim().to_string()
        } else {
            memo.to_string()
        }
    };
    let value_date = extract_value_date(&description);
    let direction = Direction::from_token(&raw.direction);
    let amount_cents = parse_eu_amount_cents(&raw.amount, direction)?;
    let counterparty_iban = none_if_empty(&raw.counterparty_iban);
    let counterparty_name = none_if_empty(&raw.name);
    let counterparty_ref = counterparty_iban
        .clone()
        .or_else(|| counterparty_name.clone())
        .unwrap_or_default();
    let normalized_description = normalize_description(&description);

    let txn_hash = fingerprint(&FingerprintInput {
        account_id,
        booking_date: &booking_date,
        value_date: value_date.as_deref(),
        amount_cents,
        currency: "EUR",
        direction,
        counterparty_ref: &counterparty_ref,
        normalized_description: &normalized_description,
    });

    Ok(NewTransaction {
        account_id,
        document_id,
        txn_hash,
        booking_date,
        value_date,
        amount_cents,
        currency: "EUR".to_string(),
        direction,
        counterparty_name,
        counterparty_iban,
        description,
    })
}
