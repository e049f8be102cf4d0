use std::io::BufReader;
use std::path::Path;

use crate::models::RawRow;

use super::{ParseFailure, ParseOutput};

// Fixed ING export dialect: semicolon-separated, one header row.
const COL_DATE: &str = "Datum";
const COL_NAME: &str = "Naam / Omschrijving";
const COL_ACCOUNT: &str = "Rekening";
const COL_COUNTERPARTY: &str = "Tegenrekening";
const COL_DIRECTION: &str = "Af Bij";
const COL_AMOUNT: &str = "Bedrag (EUR)";
const COL_MEMO: &str = "Mededelingen";

fn find_col(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    // The first header may carry a UTF-8 BOM.
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
}

fn cell(record: &csv::StringRecord, idx: Option<usize>) -> String {
    idx.and_then(|i| record.get(i)).unwrap_or("").trim().to_string()
}

/// Parse an ING CSV export. Header resolution is best-effort: missing
/// columns become empty cells and fail per-row later, never the whole
/// document. Malformed records are skipped and reported in `row_failures`.
pub fn parse(path: &Path) -> Result<ParseOutput, ParseFailure> {
    let file = std::fs::File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers = rdr
        .headers()
        .map_err(|e| ParseFailure::Corrupt(format!("cannot read header row: {e}")))?
        .clone();

    let idx_date = find_col(&headers, COL_DATE);
    let idx_name = find_col(&headers, COL_NAME);
    let idx_account = find_col(&headers, COL_ACCOUNT);
    let idx_counterparty = find_col(&headers, COL_COUNTERPARTY);
    let idx_direction = find_col(&headers, COL_DIRECTION);
    let idx_amount = find_col(&headers, COL_AMOUNT);
    let idx_memo = find_col(&headers, COL_MEMO);

    let mut out = ParseOutput::default();
    for (i, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                out.row_failures.push(format!("row {}: {e}", i + 2));
                continue;
            }
        };
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        out.rows.push(RawRow {
            booking_date: cell(&record, idx_date),
            name: cell(&record, idx_name),
            memo: cell(&record, idx_memo),
            account_iban: cell(&record, idx_account),
            counterparty_iban: cell(&record, idx_counterparty),
            direction: cell(&record, idx_direction),
            amount: cell(&record, idx_amount),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Datum;Naam / Omschrijving;Rekening;Tegenrekening;Code;Af Bij;Bedrag (EUR);Mutatiesoort;Mededelingen\n";

    fn write_csv(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("{HEADER}{body}")).unwrap();
        path
    }

    #[test]
    fn test_parse_ing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "stmt.csv",
            "20230115;Albert Heijn;NL20INGB0001234567;NL91ABNA0417164300;BA;Af;23,95;Betaalautomaat;Pasvolgnr: 003\n\
             20230116;Werkgever BV;NL20INGB0001234567;NL39RABO0300065264;OV;Bij;2.500,00;Overschrijving;Salaris januari\n",
        );
        let out = parse(&path).unwrap();
        assert_eq!(out.rows.len(), 2);
        assert!(out.row_failures.is_empty());
        assert_eq!(out.rows[0].booking_date, "20230115");
        assert_eq!(out.rows[0].name, "Albert Heijn");
        assert_eq!(out.rows[0].direction, "Af");
        assert_eq!(out.rows[0].amount, "23,95");
        assert_eq!(out.rows[0].memo, "Pasvolgnr: 003");
        assert_eq!(out.rows[1].counterparty_iban, "NL39RABO0300065264");
        assert_eq!(out.rows[1].amount, "2.500,00");
    }

    #[test]
    fn test_parse_tolerates_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        std::fs::write(
            &path,
            format!("\u{feff}{HEADER}20230115;Albert Heijn;;;BA;Af;23,95;;\n"),
        )
        .unwrap();
        let out = parse(&path).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].booking_date, "20230115");
    }

    #[test]
    fn test_missing_columns_become_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.csv");
        std::fs::write(&path, "Datum;Bedrag (EUR)\n20230115;23,95\n").unwrap();
        let out = parse(&path).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].amount, "23,95");
        assert_eq!(out.rows[0].name, "");
        assert_eq!(out.rows[0].direction, "");
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "blank.csv", ";;;;;;;;\n20230115;X;;;BA;Af;1,00;;\n");
        let out = parse(&path).unwrap();
        assert_eq!(out.rows.len(), 1);
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let err = parse(Path::new("/nonexistent/stmt.csv")).unwrap_err();
        assert!(matches!(err, ParseFailure::Unreadable(_)));
    }
}
