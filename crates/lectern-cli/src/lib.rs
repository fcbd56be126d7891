use lectern_core::{LogLevel, UserFacing};

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Log an error's structured cause at its own level and show the user-facing
/// message on stderr.
pub fn report(err: &(impl UserFacing + std::fmt::Debug)) {
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(cause = ?err, "Operation failed"),
        LogLevel::Warn => tracing::warn!(cause = ?err, "Operation failed"),
        LogLevel::Error => tracing::error!(cause = ?err, "Operation failed"),
    }
    eprintln!("{}", err.user_message());
}
