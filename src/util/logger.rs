use log::SetLoggerError;

/// The environment variable that holds the log filter, in `env_logger` syntax,
/// e.g. `PRESERVED_MARKS_LOG=preserved_marks=trace`.
pub const LOG_FILTER_ENV: &str = "PRESERVED_MARKS_LOG";

/// Attempt to init a env_logger for the preserved marks engine.
/// Does nothing if the "builtin_env_logger" feature is disabled, in which case the embedding
/// collector is expected to install its own `log` implementation.
pub fn try_init() -> Result<(), SetLoggerError> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "builtin_env_logger")] {
            env_logger::Builder::from_env(
                // By default, use info level logging.
                env_logger::Env::new().filter_or(LOG_FILTER_ENV, "info"),
            )
            .try_init()
        } else {
            Ok(())
        }
    }
}
