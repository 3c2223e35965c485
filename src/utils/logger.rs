use chrono::Local;
use eyre::Result;
use fern::Dispatch;

/// Sets up the application logger with console and optional file output.
///
/// The level comes from `RUST_LOG` (default `info`). When `LOG_FILE` is set,
/// every record is also appended to that file.
///
/// # Returns
/// * `Result<()>` - Success or failure of logger setup
///
/// # Errors
/// * If log file creation fails
/// * If logger configuration fails (e.g. a logger is already set)
pub fn setup_logger() -> Result<()> {
    let mut dispatch = Dispatch::new()
        // Set logging level from RUST_LOG env var or default to Info
        .level(
            std::env::var("RUST_LOG")
                .map(|level| level.parse().unwrap_or(log::LevelFilter::Info))
                .unwrap_or(log::LevelFilter::Info),
        )
        // Format log messages with time, log level and module
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ));
        })
        .chain(std::io::stdout());

    if let Ok(path) = std::env::var("LOG_FILE") {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}
