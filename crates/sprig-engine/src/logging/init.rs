use std::sync::Once;

/// Filter used when neither the config nor `RUST_LOG` provides one.
///
/// Per-flush tracing is noisy, so the batch itself stays at `info` and wgpu is
/// limited to warnings.
pub const DEFAULT_FILTER: &str = "sprig_engine=info,wgpu=warn";

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "sprig_engine=trace,wgpu=warn"). Setting `sprig_engine::batch=trace` logs
/// every flush.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    /// Route output through the test harness capture (`Builder::is_test`).
    pub is_test: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            is_test: false,
        }
    }
}

impl LoggingConfig {
    /// Configuration suited to `#[test]` functions.
    pub fn for_tests() -> Self {
        Self {
            env_filter: Some("sprig_engine=trace".to_owned()),
            write_style: env_logger::WriteStyle::Never,
            is_test: true,
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global logger once.
///
/// Idempotent; later calls are ignored. If another logger was already
/// installed elsewhere, that one is kept.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        match config.env_filter {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => match std::env::var("RUST_LOG") {
                Ok(filter) => {
                    builder.parse_filters(&filter);
                }
                Err(_) => {
                    builder.parse_filters(DEFAULT_FILTER);
                }
            },
        }

        builder.write_style(config.write_style);
        builder.is_test(config.is_test);

        if builder.try_init().is_ok() {
            log::debug!("logging initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_logging(LoggingConfig::for_tests());
        init_logging(LoggingConfig::default());
        log::trace!("still alive");
    }
}
