mod categorizer;
mod cli;
mod db;
mod error;
mod fmt;
mod ingest;
mod models;
mod normalize;
mod parsers;
mod reports;
mod settings;
mod store;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Ingest { dir } => cli::ingest::run(dir),
        Commands::Categorize => cli::categorize::run(),
        Commands::Spend { from, to } => cli::report::spend(&from, &to),
        Commands::Events { document } => cli::events::run(document),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
