use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::eur;
use crate::reports::spend_by_category;
use crate::settings::db_path;

pub fn spend(from: &str, to: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let rows = spend_by_category(&conn, from, to)?;

    let mut table = Table::new();
    table.set_header(vec!["Category", "Debit", "Credit"]);
    for row in &rows {
        table.add_row(vec![
            Cell::new(&row.category),
            Cell::new(eur(row.debit_cents)),
            Cell::new(eur(row.credit_cents)),
        ]);
    }
    println!("Spend {from} to {to}\n{table}");
    Ok(())
}
