//! graphsweep core types
//!
//! Pure data shared by the planner, the runtime and the reporters.
//! Nothing in this crate performs I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod failure;
pub mod id;
pub mod job;
pub mod options;
pub mod outcome;
pub mod presence;

// Re-exports
pub use error::{CoreError, CoreResult};
pub use failure::{BackendError, ErrorClass, JobError};
pub use id::RunId;
pub use job::{Job, ResultSet};
pub use options::ExecutionOptions;
pub use outcome::{JobOutcome, OutcomeStatus, SkipReason};
pub use presence::{SchemaInventory, SchemaPresence};
