//! File backed stand-in for a reader session.
//!
//! A replay directory holds one sub-directory per trigger cycle. Every file in
//! a cycle becomes one result item, its kind taken from the file extension.

mod cycle;
mod discovery;
mod session;

pub use cycle::{Cycle, load_cycles, result_type_for};
pub use discovery::ReplayDiscoverer;
pub use session::{ReplayOptions, ReplaySession};
