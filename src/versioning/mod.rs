//! Version resolution and tagging on top of [VersionControl](crate::vcs::VersionControl).

pub mod incrementer;
pub mod oracle;
pub mod workflow;

pub use incrementer::VersionIncrementer;
pub use oracle::VersionOracle;
pub use workflow::{CommitRequest, CommitWorkflow, WorkflowOutcome};
