use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use compound::cli::{Cli, Command, build_scenario, build_solve_request};
use compound::core::{project, solve};
use compound::store::{JsonFileStore, MemoryStore, Store};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(result: Result<T, String>) {
    let rendered = result.and_then(|value| {
        serde_json::to_string_pretty(&value).map_err(|e| format!("Failed to encode output: {e}"))
    });
    match rendered {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { port, data_dir } => {
            let store: Arc<dyn Store> = match data_dir {
                Some(dir) => match JsonFileStore::open(dir) {
                    Ok(store) => {
                        tracing::info!(dir = %store.dir().display(), "persisting to disk");
                        Arc::new(store)
                    }
                    Err(e) => {
                        eprintln!("Failed to open data directory: {e}");
                        std::process::exit(1);
                    }
                },
                None => Arc::new(MemoryStore::new()),
            };
            if let Err(e) = compound::api::run_http_server(port, store).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Project(args) => {
            print_json(build_scenario(&args).map(|scenario| project(&scenario)));
        }
        Command::Solve {
            unknown,
            target,
            scenario,
        } => {
            print_json(
                build_solve_request(unknown, target, &scenario)
                    .and_then(|request| solve(&request).map_err(|e| e.to_string())),
            );
        }
    }
}
