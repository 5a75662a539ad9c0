//! `hbnb` console entry point.
//!
//! # Responsibility
//! - Build configuration from the environment (and `.env`, if present).
//! - Refuse to start with a half-initialized store.
//! - Run the console over stdin/stdout and close the store on exit.

use hbnb_core::{init_logging, open_storage, Config, Console};
use log::{error, info};
use std::io::{self, IsTerminal};
use std::process::ExitCode;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("hbnb: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = init_logging(&config.log_level, &config.log_dir) {
        eprintln!("hbnb: logging disabled: {err}");
    }

    let storage = match open_storage(&config) {
        Ok(storage) => storage,
        Err(err) => {
            error!("event=app_start module=cli status=error error={err}");
            eprintln!("hbnb: cannot open storage: {err}");
            return ExitCode::FAILURE;
        }
    };

    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut console = Console::new(storage, io::stdout().lock()).with_prompt(interactive);
    let run_result = console.run(stdin.lock());

    let (mut storage, _) = console.into_parts();
    let close_result = storage.close();
    info!("event=app_stop module=cli status=ok");

    if let Err(err) = run_result {
        eprintln!("hbnb: {err}");
        return ExitCode::FAILURE;
    }
    if let Err(err) = close_result {
        eprintln!("hbnb: failed to close storage: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
