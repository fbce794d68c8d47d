//! The `Logger` capability consumed throughout the runtime, plus a
//! `tracing`-backed reference implementation and the redaction bridge that
//! lets [`crate::secret::SecretValue`] (or any [`crate::secret::Maskable`])
//! flow through log calls without ever printing its payload.

mod tracing_logger;

pub use tracing_logger::TracingLogger;

use crate::secret::Maskable;
use std::fmt;

/// Anything that can appear as a structured log value. Scalars format
/// normally; anything [`Maskable`] is substituted with its masked value
/// before the record reaches the underlying logger (`spec.md` §4.7).
pub trait LogValue {
    fn log_repr(&self) -> String;
}

macro_rules! impl_log_value_display {
    ($($t:ty),* $(,)?) => {
        $(
            impl LogValue for $t {
                fn log_repr(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

impl_log_value_display!(
    String, &str, bool, i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, f32, f64
);

impl LogValue for crate::secret::SecretValue {
    fn log_repr(&self) -> String {
        self.masked_value()
    }
}

/// A single structured log field.
pub struct Field<'a> {
    pub key: &'a str,
    pub value: String,
}

impl<'a> Field<'a> {
    pub fn new(key: &'a str, value: &dyn LogValue) -> Self {
        Self {
            key,
            value: value.log_repr(),
        }
    }
}

impl fmt::Display for Field<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// The logging capability modules and the runtime consume. Concrete
/// backends (file rotation, shipping, OTel export) are out of scope — the
/// core only depends on this trait, same as `spec.md` §1 lists it as an
/// external collaborator interface.
pub trait Logger: Send + Sync {
    fn debug(&self, msg: &str, fields: &[Field<'_>]);
    fn info(&self, msg: &str, fields: &[Field<'_>]);
    fn warn(&self, msg: &str, fields: &[Field<'_>]);
    fn error(&self, msg: &str, fields: &[Field<'_>]);
}

/// Convenience macro-free helper: build a `Field` slice inline.
#[macro_export]
macro_rules! fields {
    ($($key:expr => $value:expr),* $(,)?) => {
        &[$($crate::logging::Field::new($key, &$value)),*]
    };
}
