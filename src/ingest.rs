use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::{GuilderError, Result};
use crate::models::{IngestStats, RawRow};
use crate::normalize::normalize_row;
use crate::parsers::{ParseFailure, SourceKind};
use crate::store::{self, EventStage, INSTITUTION};

/// Resolve the account a row belongs to. CSV and workbook rows carry the
/// statement's own IBAN per row; a PDF without a discoverable IBAN falls
/// into the shared unknown-account bucket instead of a fresh blank account.
fn resolve_account(conn: &Connection, kind: SourceKind, raw: &RawRow) -> Result<i64> {
    let iban = raw.account_iban.trim();
    if iban.is_empty() {
        if kind == SourceKind::Pdf {
            store::unknown_account(conn)
        } else {
            store::upsert_account(conn, INSTITUTION, None, None)
        }
    } else {
        store::upsert_account(conn, INSTITUTION, Some(iban), None)
    }
}

/// Ingest one document: register it by content digest, parse, normalize and
/// idempotently insert every row, and record the audit trail. Everything for
/// the document commits atomically at the end; a bad row never aborts the
/// scan, a missing decoder never aborts the batch.
pub fn ingest_file(conn: &mut Connection, path: &Path) -> Result<IngestStats> {
    let kind = SourceKind::for_path(path)
        .ok_or_else(|| GuilderError::UnsupportedFormat(path.display().to_string()))?;

    let tx = conn.transaction()?;
    let mut stats = IngestStats::default();

    let (doc_id, is_new) = store::register_document(&tx, path, kind)?;
    if is_new {
        stats.docs_new += 1;
    }

    if !kind.available() {
        store::record_event(
            &tx,
            doc_id,
            EventStage::Parse,
            false,
            &format!("no decoder compiled in for {} documents", kind.key()),
        )?;
        tx.commit()?;
        return Ok(stats);
    }

    let output = match kind.parse(path) {
        Ok(output) => output,
        Err(failure @ (ParseFailure::MissingCapability(_) | ParseFailure::Corrupt(_))) => {
            store::record_event(&tx, doc_id, EventStage::Parse, false, &failure.to_string())?;
            tx.commit()?;
            return Ok(stats);
        }
        Err(ParseFailure::Unreadable(e)) => {
            store::record_event(
                &tx,
                doc_id,
                EventStage::Parse,
                false,
                &format!("cannot read document: {e}"),
            )?;
            tx.commit()?;
            return Err(e.into());
        }
    };

    for failure in &output.row_failures {
        stats.tx_seen += 1;
        store::record_event(&tx, doc_id, EventStage::Parse, false, &format!("row error: {failure}"))?;
    }

    for raw in &output.rows {
        stats.tx_seen += 1;
        let account_id = resolve_account(&tx, kind, raw)?;
        match normalize_row(raw, account_id, doc_id) {
            Ok(txn) => {
                if store::insert_transaction_if_absent(&tx, &txn)? {
                    stats.tx_new += 1;
                }
            }
            Err(e) => {
                store::record_event(&tx, doc_id, EventStage::Parse, false, &format!("row error: {e}"))?;
            }
        }
    }

    store::record_event(
        &tx,
        doc_id,
        EventStage::Parse,
        true,
        &format!("parsed rows: seen={}, new={}", stats.tx_seen, stats.tx_new),
    )?;
    tx.commit()?;
    Ok(stats)
}

pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Result<IngestStats>,
}

/// Batch driver: walk a directory in sorted order, dispatch by extension,
/// skip files no parser is registered for. A document that cannot be read
/// is reported and the batch continues; storage errors abort the run.
pub fn ingest_dir(conn: &mut Connection, dir: &Path) -> Result<Vec<FileOutcome>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    let mut outcomes = Vec::new();
    for path in paths {
        if SourceKind::for_path(&path).is_none() {
            continue;
        }
        match ingest_file(conn, &path) {
            Err(GuilderError::Db(e)) => return Err(e.into()),
            result => outcomes.push(FileOutcome { path, result }),
        }
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    const HEADER: &str = "Datum;Naam / Omschrijving;Rekening;Tegenrekening;Code;Af Bij;Bedrag (EUR);Mutatiesoort;Mededelingen\n";

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn write_csv(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("{HEADER}{body}")).unwrap();
        path
    }

    fn count(conn: &Connection, sql: &str) -> i64 {
        conn.query_row(sql, [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn test_ingest_csv_inserts_transactions() {
        let (dir, mut conn) = test_db();
        let path = write_csv(
            dir.path(),
            "stmt.csv",
            "20230115;Albert Heijn;NL20INGB0001234567;NL91ABNA0417164300;BA;Af;23,95;Betaalautomaat;Pasvolgnr: 003\n\
             20230116;Werkgever BV;NL20INGB0001234567;NL39RABO0300065264;OV;Bij;2.500,00;Overschrijving;Salaris\n",
        );
        let stats = ingest_file(&mut conn, &path).unwrap();
        assert_eq!(stats.docs_new, 1);
        assert_eq!(stats.tx_seen, 2);
        assert_eq!(stats.tx_new, 2);

        assert_eq!(count(&conn, "SELECT count(*) FROM transactions"), 2);
        let (cents, direction): (i64, String) = conn
            .query_row(
                "SELECT amount_cents, direction FROM transactions WHERE booking_date = '2023-01-15'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(cents, -2395);
        assert_eq!(direction, "DEBIT");
    }

    #[test]
    fn test_ingest_twice_is_idempotent() {
        let (dir, mut conn) = test_db();
        let path = write_csv(
            dir.path(),
            "stmt.csv",
            "20230115;Albert Heijn;NL20INGB0001234567;;BA;Af;23,95;;\n",
        );
        let first = ingest_file(&mut conn, &path).unwrap();
        let second = ingest_file(&mut conn, &path).unwrap();

        assert_eq!(first.docs_new, 1);
        assert_eq!(first.tx_new, 1);
        assert_eq!(second.docs_new, 0);
        assert_eq!(second.tx_new, 0);
        assert_eq!(count(&conn, "SELECT count(*) FROM documents"), 1);
        assert_eq!(count(&conn, "SELECT count(*) FROM transactions"), 1);
    }

    #[test]
    fn test_partial_failure_isolates_bad_row() {
        let (dir, mut conn) = test_db();
        let mut body = String::new();
        for day in 1..=9 {
            body.push_str(&format!("2023011{day};Winkel {day};NL20INGB0001234567;;BA;Af;1{day},00;;\n"));
        }
        body.push_str("20230120;Kapot;NL20INGB0001234567;;BA;Af;geen bedrag;;\n");
        let path = write_csv(dir.path(), "stmt.csv", &body);

        let stats = ingest_file(&mut conn, &path).unwrap();
        assert_eq!(stats.tx_seen, 10);
        assert_eq!(stats.tx_new, 9);
        assert_eq!(count(&conn, "SELECT count(*) FROM transactions"), 9);
        assert_eq!(
            count(&conn, "SELECT count(*) FROM parse_events WHERE stage = 'parse' AND ok = 0"),
            1
        );
        // The run still records its summary event.
        assert_eq!(
            count(&conn, "SELECT count(*) FROM parse_events WHERE stage = 'parse' AND ok = 1"),
            1
        );
    }

    #[test]
    fn test_overlapping_documents_dedupe_rows() {
        let (dir, mut conn) = test_db();
        let shared = "20230116;Werkgever BV;NL20INGB0001234567;;OV;Bij;2.500,00;;Salaris\n";
        let a = write_csv(dir.path(), "jan.csv", &format!(
            "20230115;Albert Heijn;NL20INGB0001234567;;BA;Af;23,95;;\n{shared}"
        ));
        let b = write_csv(dir.path(), "jan-feb.csv", &format!(
            "{shared}20230201;Jumbo;NL20INGB0001234567;;BA;Af;12,50;;\n"
        ));
        ingest_file(&mut conn, &a).unwrap();
        let stats = ingest_file(&mut conn, &b).unwrap();
        assert_eq!(stats.tx_seen, 2);
        assert_eq!(stats.tx_new, 1);
        assert_eq!(count(&conn, "SELECT count(*) FROM documents"), 2);
        assert_eq!(count(&conn, "SELECT count(*) FROM transactions"), 3);
    }

    #[test]
    fn test_same_account_across_documents() {
        let (dir, mut conn) = test_db();
        let a = write_csv(dir.path(), "a.csv", "20230115;X;NL20INGB0001234567;;BA;Af;1,00;;\n");
        let b = write_csv(dir.path(), "b.csv", "20230216;Y;NL20INGB0001234567;;BA;Af;2,00;;\n");
        ingest_file(&mut conn, &a).unwrap();
        ingest_file(&mut conn, &b).unwrap();
        assert_eq!(count(&conn, "SELECT count(*) FROM accounts"), 1);
    }

    #[test]
    fn test_unsupported_extension_is_typed_error() {
        let (dir, mut conn) = test_db();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "geen afschrift").unwrap();
        let err = ingest_file(&mut conn, &path).unwrap_err();
        assert!(matches!(err, GuilderError::UnsupportedFormat(_)));
    }

    #[cfg(feature = "excel")]
    #[test]
    fn test_corrupt_workbook_fails_document_not_batch() {
        let (dir, mut conn) = test_db();
        let path = dir.path().join("kapot.xlsx");
        std::fs::write(&path, "dit is geen werkboek").unwrap();

        let stats = ingest_file(&mut conn, &path).unwrap();
        assert_eq!(stats.tx_seen, 0);
        assert_eq!(stats.tx_new, 0);
        assert_eq!(count(&conn, "SELECT count(*) FROM transactions"), 0);
        assert_eq!(
            count(&conn, "SELECT count(*) FROM parse_events WHERE stage = 'parse' AND ok = 0"),
            1
        );
    }

    #[test]
    fn test_resolve_account_pdf_unknown_bucket() {
        let (_dir, conn) = test_db();
        let raw = RawRow::default();
        let a = resolve_account(&conn, SourceKind::Pdf, &raw).unwrap();
        let b = resolve_account(&conn, SourceKind::Pdf, &raw).unwrap();
        assert_eq!(a, b);

        let with_iban = RawRow {
            account_iban: "NL20INGB0001234567".to_string(),
            ..Default::default()
        };
        let c = resolve_account(&conn, SourceKind::Pdf, &with_iban).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_ingest_dir_skips_unregistered_extensions() {
        let (dir, mut conn) = test_db();
        write_csv(dir.path(), "stmt.csv", "20230115;X;NL20INGB0001234567;;BA;Af;1,00;;\n");
        std::fs::write(dir.path().join("leesmij.txt"), "negeren").unwrap();

        let docs = dir.path().join("docs");
        std::fs::create_dir(&docs).unwrap();
        std::fs::rename(dir.path().join("stmt.csv"), docs.join("stmt.csv")).unwrap();
        std::fs::rename(dir.path().join("leesmij.txt"), docs.join("leesmij.txt")).unwrap();

        let outcomes = ingest_dir(&mut conn, &docs).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].path.ends_with("stmt.csv"));
        assert!(outcomes[0].result.is_ok());
    }
}
