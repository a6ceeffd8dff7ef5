/// Logging setup for settlement-waterfall.
///
/// The library only emits through the `log` facade; binaries call
/// [`Logger::init`] once to install the `env_logger` backend.
pub struct Logger;

impl Logger {
    /// Install the backend with a filter such as "info" or
    /// "settlement_waterfall=debug". `RUST_LOG` still takes precedence.
    /// Calling it twice is harmless.
    pub fn init(level: &str) {
        let mut builder = env_logger::Builder::new();
        builder.parse_filters(level);
        if let Ok(filters) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filters);
        }
        let _ = builder.format_timestamp(None).try_init();
    }
}
