use crate::categorizer::{categorize_transactions, DEFAULT_RULES};
use crate::db::get_connection;
use crate::error::Result;
use crate::settings::db_path;

pub fn run() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let stats = categorize_transactions(&conn, DEFAULT_RULES)?;
    println!("{} categorized, {} unmatched", stats.categorized, stats.unmatched);
    Ok(())
}
