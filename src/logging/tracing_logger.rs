use super::{Field, Logger};

/// A [`Logger`] backed by the `tracing` crate. Offered as a convenience
/// constructor for tests, examples, and callers who don't need a bespoke
/// backend — `Builder::with_logger` still requires an explicit logger per
/// `spec.md` §6 (`ErrLoggerNotSet`); this type is never wired in implicitly.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }

    fn render(msg: &str, fields: &[Field<'_>]) -> String {
        if fields.is_empty() {
            return msg.to_string();
        }
        let rendered = fields
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        format!("{msg} {rendered}")
    }
}

impl Logger for TracingLogger {
    fn debug(&self, msg: &str, fields: &[Field<'_>]) {
        tracing::debug!("{}", Self::render(msg, fields));
    }

    fn info(&self, msg: &str, fields: &[Field<'_>]) {
        tracing::info!("{}", Self::render(msg, fields));
    }

    fn warn(&self, msg: &str, fields: &[Field<'_>]) {
        tracing::warn!("{}", Self::render(msg, fields));
    }

    fn error(&self, msg: &str, fields: &[Field<'_>]) {
        tracing::error!("{}", Self::render(msg, fields));
    }
}
