use crate::config::Environment;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with pretty formatting for development
/// and JSON formatting for production.
///
/// Filtering comes from the RUST_LOG environment variable (defaults to
/// "info" if not set).
pub fn setup_logging(environment: Environment) {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    if environment.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_level(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().pretty().with_ansi(true))
            .init();
    }
}
