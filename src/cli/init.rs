use std::path::PathBuf;

use colored::Colorize;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{save_settings, Settings};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let settings = match data_dir {
        Some(dir) => Settings {
            documents_dir: PathBuf::from(&dir).join("statements").to_string_lossy().to_string(),
            data_dir: dir,
        },
        None => Settings::default(),
    };

    std::fs::create_dir_all(&settings.data_dir)?;
    std::fs::create_dir_all(&settings.documents_dir)?;
    save_settings(&settings)?;

    let conn = get_connection(&PathBuf::from(&settings.data_dir).join("guilder.db"))?;
    init_db(&conn)?;

    println!("{} {}", "Initialized ledger in".green(), settings.data_dir);
    println!("Drop statements into {} and run `guilder ingest`.", settings.documents_dir);
    Ok(())
}
