use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use log::{error, info};

use countdowns::{App, Cli, Config, EventPersistence, EventService, EventStore, FileStore};

pub fn initialize_logger(verbose: bool) {
    // Quiet by default so log lines don't interleave with command output.
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();

    info!("Logger initialized");
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    info!("Application starting up");

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = match Config::load(&config_path) {
        Ok(config) => config.with_env_overrides(),
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = dir;
    }

    // Composition root: one store and one service for the whole process.
    let backend = Arc::new(FileStore::new(config.data_dir.clone()));
    let persistence =
        EventPersistence::new(backend, config.storage_key.clone(), config.read_policy());
    let store = Arc::new(EventStore::new(persistence));
    let service = Arc::new(EventService::new(store));

    let app = App::new(service, config, config_path, cli.verbose);
    let result = app.run(cli.command).await;

    info!("Application shutting down");

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
