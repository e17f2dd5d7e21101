use std::path::PathBuf;
use thiserror::Error;

/// Errors raised before or around the publisher run
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("{0}")]
    Config(String),
    #[error("source file not found: {} (also tried {})", .primary.display(), .nested.display())]
    SourceNotFound { primary: PathBuf, nested: PathBuf },
    #[error("template file not found: {}", .0.display())]
    TemplateNotFound(PathBuf),
    #[error("failed to start publisher '{program}': {source}")]
    PublisherSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PublishError {
    pub fn config(msg: impl Into<String>) -> Self {
        PublishError::Config(msg.into())
    }

    /// Configuration and resolution errors end the run with a usage hint
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            PublishError::Config(_)
                | PublishError::SourceNotFound { .. }
                | PublishError::TemplateNotFound(_)
        )
    }
}

/// Errors raised by version-control operations
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("git query failed: {0}")]
    Query(String),
    #[error("git staging error: {0}")]
    Staging(String),
    #[error("git commit error: {0}")]
    Commit(String),
    #[error("nothing to commit")]
    NothingToCommit,
    #[error("git push error: {0}")]
    Push(String),
    #[error("git tagging error: {0}")]
    Tag(String),
    #[error(transparent)]
    Git(#[from] git2::Error),
}
