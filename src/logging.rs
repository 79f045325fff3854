//! Diagnostic logging. Standard output carries the service's own lines, so
//! diagnostics go to standard error (CLI, native host) or a file (SCM).

use log::info;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;
use std::path::PathBuf;

const LOG_DIR_NAME: &str = "svchostify-sample";

fn config() -> simplelog::Config {
    ConfigBuilder::new()
        .set_time_level(LevelFilter::Info)
        .build()
}

/// Initialize logging to standard error.
pub fn init_stderr() -> Result<(), log::SetLoggerError> {
    WriteLogger::init(LevelFilter::Info, config(), std::io::stderr())
}

/// Initialize logging to a file (for service mode; no console available).
pub fn init_file() -> Result<(), Box<dyn std::error::Error>> {
    let program_data = std::env::var("ProgramData").unwrap_or_else(|_| "C:\\ProgramData".into());
    let log_dir: PathBuf = [program_data, LOG_DIR_NAME.into()].iter().collect();
    std::fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("service.log");
    let file = File::create(&log_path)?;
    WriteLogger::init(LevelFilter::Info, config(), file)?;
    info!("Logging to {:?}", log_path);
    Ok(())
}
