use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;
use crate::normalize::normalize_text;

/// Stock keyword table: (keyword, category code), ordered, first match
/// wins. Callers inject their own table; nothing in here is global state.
pub const DEFAULT_RULES: &[(&str, &str)] = &[
    ("albert heijn", "GROCERIES"),
    ("jumbo", "GROCERIES"),
    ("lidle", "GROCERIES"),
    ("action", "HOUSEHOLD"),
    ("brabantwonen", "RENT"),
    ("huur", "RENT"),
    ("vgz", "HEALTH"),
    ("nn schadeverzekering", "INSURANCE"),
    ("verzekering", "INSURANCE"),
    ("ing creditcard", "CREDIT_CARD"),
    ("betaalpakket", "BANK_FEES"),
    ("rente", "INTEREST"),
    ("amazon", "SHOPPING"),
    ("washin7", "TRANSPORT"),
];

pub struct CategorizeStats {
    pub categorized: usize,
    pub unmatched: usize,
}

/// "GROCERIES" -> "Groceries", "CREDIT_CARD" -> "Credit_Card".
fn label_for(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut boundary = true;
    for c in code.chars() {
        if c.is_alphabetic() {
            if boundary {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            boundary = false;
        } else {
            out.push(c);
            boundary = true;
        }
    }
    out
}

fn ensure_category(conn: &Connection, code: &str) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM categories WHERE code = ?1", [code], |row| row.get(0))
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO categories (code, label) VALUES (?1, ?2)",
        rusqlite::params![code, label_for(code)],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Assign categories to transactions that have none, by keyword match
/// against the normalized description + counterparty text. Already
/// categorized rows are never touched; the ingestion core itself never
/// calls this.
pub fn categorize_transactions(conn: &Connection, rules: &[(&str, &str)]) -> Result<CategorizeStats> {
    let mut stmt = conn.prepare(
        "SELECT id, description, counterparty_name FROM transactions WHERE category_id IS NULL",
    )?;
    let uncategorized: Vec<(i64, String, Option<String>)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut stats = CategorizeStats { categorized: 0, unmatched: 0 };
    for (txn_id, description, counterparty) in &uncategorized {
        let base = normalize_text(&format!(
            "{} {}",
            description,
            counterparty.as_deref().unwrap_or("")
        ))
        .to_lowercase();

        let matched = rules.iter().find(|(keyword, _)| base.contains(keyword));
        match matched {
            Some((_, code)) => {
                let category_id = ensure_category(conn, code)?;
                conn.execute(
                    "UPDATE transactions SET category_id = ?1 WHERE id = ?2",
                    rusqlite::params![category_id, txn_id],
                )?;
                stats.categorized += 1;
            }
            None => stats.unmatched += 1,
        }
    }
    Ok(stats)
}
