//! Logger abstraction used by the container.

use std::fmt::{self, Display, Write as _};

/// Structured key/value pairs attached to a log line.
pub type Fields<'a> = &'a [(&'a str, &'a dyn Display)];

/// Minimal structured logger.
///
/// The container only emits `debug`, `info` and `error` lines. Implement this
/// trait to route them to any logging backend, or use [`TracingLogger`].
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str, fields: Fields<'_>);
    fn info(&self, message: &str, fields: Fields<'_>);
    fn error(&self, message: &str, fields: Fields<'_>);
}

/// Discards everything. The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _message: &str, _fields: Fields<'_>) {}
    fn info(&self, _message: &str, _fields: Fields<'_>) {}
    fn error(&self, _message: &str, _fields: Fields<'_>) {}
}

/// Forwards to the `tracing` crate under the `ref_di` target.
///
/// Fields are rendered as `key=value` pairs into a single `fields` attribute
/// since their names are only known at runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str, fields: Fields<'_>) {
        tracing::debug!(target: "ref_di", fields = %Rendered(fields), "{}", message);
    }

    fn info(&self, message: &str, fields: Fields<'_>) {
        tracing::info!(target: "ref_di", fields = %Rendered(fields), "{}", message);
    }

    fn error(&self, message: &str, fields: Fields<'_>) {
        tracing::error!(target: "ref_di", fields = %Rendered(fields), "{}", message);
    }
}

struct Rendered<'a>(Fields<'a>);

impl Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char(' ')?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}
