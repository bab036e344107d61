//! Roster inspection entry point.
//!
//! # Responsibility
//! - Open the backend named by `ROSTERSYNC_*` configuration.
//! - Print the loaded roster for one kind (`users`/`groups`) or both.
//!
//! Exit status is non-zero when configuration is invalid or any requested
//! kind failed to load; kinds that loaded are still printed.

use rostersync_core::{
    init_logging, open_backend, parse_entity_kind, EntityKind, LogSink, PersistenceBackend,
    RosterConfig, RosterResult, RosterStore,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("rostersync: {err}");
            ExitCode::from(2)
        }
    }
}

fn run() -> RosterResult<bool> {
    let config = RosterConfig::from_env();
    if let Some(log_dir) = config.log_dir.as_deref() {
        if let Err(err) = init_logging(&config.log_level, &log_dir.to_string_lossy()) {
            eprintln!("rostersync: logging disabled: {err}");
        }
    }

    let kinds = match std::env::args().nth(1) {
        Some(arg) => vec![parse_entity_kind(&arg)?],
        None => EntityKind::ALL.to_vec(),
    };

    let backend = open_backend(&config, LogSink::global())?;
    let mut roster = RosterStore::new();
    let load = backend.load(&mut roster);

    let mut complete = true;
    for kind in kinds {
        if let Some(err) = load.as_ref().err().and_then(|err| err.error_for(kind)) {
            eprintln!("{kind}: {err}");
            complete = false;
            continue;
        }
        println!("{kind} count={} location={}", roster.len(kind), backend.location(kind));
        for name in roster.names(kind) {
            println!("  {name}");
        }
    }
    log::logger().flush();
    Ok(complete)
}
