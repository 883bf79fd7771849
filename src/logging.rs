use std::fs;
use std::io;
use std::path::Path;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "uploader.log";
const DEFAULT_FILTER: &str = "mark_uploader=info,warn";

fn prepare_log_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

/// Console diagnostics on stderr plus a daily-rotated JSON file under
/// `logs/`. Without a usable log directory only the console layer is
/// installed.
pub fn init_logging() {
    let dir_result = prepare_log_dir(Path::new(LOG_DIR));
    let file_layer = match &dir_result {
        Ok(()) => {
            let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            // flushes on drop, so keep it for the life of the process
            std::mem::forget(guard);
            Some(fmt::layer().json().with_writer(writer))
        }
        Err(_) => None,
    };

    // stdout is left to notifications and reports
    let console_layer = fmt::layer().with_target(false).with_writer(io::stderr);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    if let Err(e) = dir_result {
        warn!("Could not create log directory '{}', file logging is off: {}", LOG_DIR, e);
    }
}
