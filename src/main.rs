mod cli;
mod commit;
mod db;
mod dedup;
mod error;
mod fmt;
mod mapping;
mod models;
mod normalize;
mod session;
mod settings;
mod workbook;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Ingest {
            file,
            map,
            unmap,
            chunk_size,
            dry_run,
            yes,
        } => cli::ingest::run(&file, &map, &unmap, chunk_size, dry_run, yes),
        Commands::Mapping { file } => cli::mapping::run(&file),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
