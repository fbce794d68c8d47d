//! Redaction-by-default wrapper for sensitive strings (`spec.md` §4.7).

mod value;

pub use value::{Maskable, MaskStrategy, SecretKind, SecretValue};
