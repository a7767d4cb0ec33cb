use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Install the global subscriber. `RUST_LOG` overrides the default `info` level.
///
/// Log lines go to stderr so that the run summary on stdout stays readable.
pub fn init_logger() -> Result<(), SetGlobalDefaultError> {
    let subscriber = Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false));

    tracing::subscriber::set_global_default(subscriber)
}
