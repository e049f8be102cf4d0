use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::settings::db_path;
use crate::store::list_events;

pub fn run(document: Option<i64>) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let events = list_events(&conn, document)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Doc", "Stage", "OK", "Message", "At"]);
    for e in &events {
        table.add_row(vec![
            Cell::new(e.id),
            Cell::new(e.document_id),
            Cell::new(&e.stage),
            Cell::new(if e.ok { "ok" } else { "FAIL" }),
            Cell::new(&e.message),
            Cell::new(&e.created_at),
        ]);
    }
    println!("Parse events\n{table}");
    Ok(())
}
