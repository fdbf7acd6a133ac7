use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_LOG_FILTER: &str = "ora_beam=info";

/// Sink for the outcome messages of the upload pipeline.
///
/// Upload outcomes are only ever reported through this trait.
pub trait Logger: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to `tracing` under the `ora_beam` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: "ora_beam", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "ora_beam", "{message}");
    }
}

/// Installs the stderr subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
