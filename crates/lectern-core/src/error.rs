//! Error-reporting traits shared by the pipeline crates.
//!
//! Each domain crate defines its own `thiserror` enum; implementing
//! [`UserFacing`] lets callers turn any of them into a single user-visible
//! message plus a structured cause for logging, without leaking transport
//! details into the UI.

/// Log level an error should be reported at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected errors like validation failures
    Debug,
    /// Recoverable issues like transient transport failures
    Warn,
    /// Unexpected failures
    Error,
}

/// How an error should be presented to the person driving the pipeline.
///
/// `user_message` is safe to render verbatim; the error's `Display`/`source`
/// chain is what goes into the log.
pub trait UserFacing {
    /// Client-facing message (may differ from the internal error message)
    fn user_message(&self) -> String;

    /// Whether retrying the same operation can succeed
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}
