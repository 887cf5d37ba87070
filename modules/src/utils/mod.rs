//! Cross-cutting pipeline stages that know nothing about messages.
//!
//! ```text
//! logging.rs    — one event per call: path, phase, elapsed, outcome
//! recovery.rs   — panics below this stage become internal errors
//! keytagger.rs  — tags every key a delivery wrote or deleted
//! savepoint.rs  — isolates the writes of the stages after it
//! ```

pub mod keytagger;
pub mod logging;
pub mod recovery;
pub mod savepoint;

pub use keytagger::KeyTagger;
pub use logging::Logging;
pub use recovery::Recovery;
pub use savepoint::Savepoint;
