//! Dynamic reload orchestrator: diff, classify, apply-or-revert, backoff
//! (`spec.md` §4.4).

mod backoff;
mod change;
mod orchestrator;

pub use backoff::Backoff;
pub use change::{diff_section, ConfigChange};
pub use orchestrator::{Reloadable, ReloadOrchestrator, ReloadOutcome};
