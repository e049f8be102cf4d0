use std::path::PathBuf;

use colored::Colorize;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::ingest::ingest_dir;
use crate::settings::{db_path, get_documents_dir};

pub fn run(dir: Option<String>) -> Result<()> {
    let dir = dir.map(PathBuf::from).unwrap_or_else(get_documents_dir);
    let mut conn = get_connection(&db_path())?;
    init_db(&conn)?;

    let outcomes = ingest_dir(&mut conn, &dir)?;
    if outcomes.is_empty() {
        println!("No statement documents found in {}", dir.display());
        return Ok(());
    }

    let mut total_new = 0usize;
    for outcome in &outcomes {
        let name = outcome
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| outcome.path.display().to_string());
        match &outcome.result {
            Ok(stats) => {
                total_new += stats.tx_new;
                println!(
                    "{name}: {} rows seen, {} new{}",
                    stats.tx_seen,
                    stats.tx_new,
                    if stats.docs_new == 0 { " (document seen before)" } else { "" },
                );
            }
            Err(e) => println!("{name}: {}", format!("{e}").red()),
        }
    }
    println!("{}", format!("{total_new} new transactions").green());
    Ok(())
}
