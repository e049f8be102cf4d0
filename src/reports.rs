use rusqlite::Connection;

use crate::error::Result;
use crate::models::CategorySpend;

/// Debit and credit totals per category over an inclusive booking-date
/// range, biggest spenders first. Amounts are stored signed (debits
/// negative), so debit totals are negated back into magnitudes here;
/// consumers never re-derive sign from the raw sum.
pub fn spend_by_category(conn: &Connection, from: &str, to: &str) -> Result<Vec<CategorySpend>> {
    let mut stmt = conn.prepare(
        "SELECT COALESCE(c.code, 'UNCATEGORIZED') AS cat,
                SUM(CASE WHEN t.direction = 'DEBIT' THEN -t.amount_cents ELSE 0 END) AS debit,
                SUM(CASE WHEN t.direction = 'CREDIT' THEN t.amount_cents ELSE 0 END) AS credit
         FROM transactions t
         LEFT JOIN categories c ON c.id = t.category_id
         WHERE t.booking_date BETWEEN ?1 AND ?2
         GROUP BY cat
         ORDER BY debit DESC",
    )?;
    let rows = stmt
        .query_map([from, to], |row| {
            Ok(CategorySpend {
                category: row.get(0)?,
                debit_cents: row.get(1)?,
                credit_cents: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
