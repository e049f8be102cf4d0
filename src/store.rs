use std::io::Read;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::models::{NewTransaction, ParseEvent};
use crate::parsers::SourceKind;

/// Every statement handled today comes from one bank.
pub const INSTITUTION: &str = "ING";

/// Reserved account_no for PDF imports whose IBAN could not be discovered.
const UNKNOWN_ACCOUNT_NO: &str = "UNKNOWN_PDF";

// ---------------------------------------------------------------------------
// Document registry
// ---------------------------------------------------------------------------

/// SHA-256 of a file, streamed in 8 KiB chunks so large statements never
/// load fully into memory.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Content-addressed document identity: look the file up by digest, insert a
/// row only for unseen byte content. Re-registering identical content
/// returns the existing id; the caller still reprocesses its rows, which is
/// how bug-fixed parsers get a second chance. Emits one document-level
/// ingest event either way.
pub fn register_document(conn: &Connection, path: &Path, kind: SourceKind) -> Result<(i64, bool)> {
    let sha = sha256_file(path)?;
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM documents WHERE sha256 = ?1", [&sha], |row| row.get(0))
        .optional()?;

    if let Some(doc_id) = existing {
        record_event(
            conn,
            doc_id,
            EventStage::Ingest,
            true,
            "Already imported; reprocessing parse only",
        )?;
        return Ok((doc_id, false));
    }

    conn.execute(
        "INSERT INTO documents (path, sha256, source_kind, institution_hint) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            path.display().to_string(),
            sha,
            kind.key(),
            kind.institution_hint(),
        ],
    )?;
    let doc_id = conn.last_insert_rowid();
    record_event(conn, doc_id, EventStage::Ingest, true, "New document imported")?;
    Ok((doc_id, true))
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Find-or-create by the null-aware tuple (institution, iban, account_no).
/// `IS` comparisons make NULL match NULL, so a second import with the same
/// missing fields lands on the same row.
pub fn upsert_account(
    conn: &Connection,
    institution: &str,
    iban: Option<&str>,
    account_no: Option<&str>,
) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM accounts WHERE institution = ?1 AND iban IS ?2 AND account_no IS ?3",
            rusqlite::params![institution, iban, account_no],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO accounts (institution, iban, account_no) VALUES (?1, ?2, ?3)",
        rusqlite::params![institution, iban, account_no],
    )?;
    Ok(conn.last_insert_rowid())
}

/// The shared bucket for transactions whose source account could not be
/// determined (PDFs with no discoverable IBAN).
pub fn unknown_account(conn: &Connection) -> Result<i64> {
    upsert_account(conn, INSTITUTION, None, Some(UNKNOWN_ACCOUNT_NO))
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Idempotent insert guarded by the fingerprint's UNIQUE constraint. The
/// returned bool is the statement's own changed-row count. A conflict is
/// the expected duplicate outcome, reported as `false`, and never updates
/// the existing row.
pub fn insert_transaction_if_absent(conn: &Connection, t: &NewTransaction) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO transactions (
            account_id, document_id, txn_hash, booking_date, value_date,
            amount_cents, currency, direction, counterparty_name,
            counterparty_iban, description
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            t.account_id,
            t.document_id,
            t.txn_hash,
            t.booking_date,
            t.value_date,
            t.amount_cents,
            t.currency,
            t.direction.as_str(),
            t.counterparty_name,
            t.counterparty_iban,
            t.description,
        ],
    )?;
    Ok(changed == 1)
}

// ---------------------------------------------------------------------------
// Parse event log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStage {
    Ingest,
    Parse,
}

impl EventStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStage::Ingest => "ingest",
            EventStage::Parse => "parse",
        }
    }
}

/// Append-only. There is no update or delete path, and the pipeline never
/// reads these rows back; they exist for external diagnostics only.
pub fn record_event(
    conn: &Connection,
    document_id: i64,
    stage: EventStage,
    ok: bool,
    message: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO parse_events (document_id, stage, ok, message) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![document_id, stage.as_str(), ok, message],
    )?;
    Ok(())
}

pub fn list_events(conn: &Connection, document_id: Option<i64>) -> Result<Vec<ParseEvent>> {
    let map = |row: &rusqlite::Row| -> rusqlite::Result<ParseEvent> {
        Ok(ParseEvent {
            id: row.get(0)?,
            document_id: row.get(1)?,
            stage: row.get(2)?,
            ok: row.get(3)?,
            message: row.get(4)?,
            created_at: row.get(5)?,
        })
    };
    let sql_all = "SELECT id, document_id, stage, ok, message, created_at \
                   FROM parse_events ORDER BY id";
    let sql_doc = "SELECT id, document_id, stage, ok, message, created_at \
                   FROM parse_events WHERE document_id = ?1 ORDER BY id";
    let events = match document_id {
        Some(doc) => conn
            .prepare(sql_doc)?
            .query_map([doc], map)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => conn
            .prepare(sql_all)?
            .query_map([], map)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };
    Ok(events)
}
