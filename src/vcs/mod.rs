//! Version-control seam.
//!
//! The versioning workflow only talks to [VersionControl]. [git::Git2Vcs] backs it
//! with a real repository; [mock::MockVcs] records calls in memory for tests.

pub mod git;
pub mod mock;

pub use git::Git2Vcs;
pub use mock::MockVcs;

use crate::error::VcsError;
use std::path::Path;

pub trait VersionControl {
    /// Long description of HEAD relative to the most recent annotated tag,
    /// as `git describe --long` prints it
    fn describe(&self) -> Result<String, VcsError>;

    /// Stages every `*.<extension>` file directly inside `dir` (relative to the work tree).
    ///
    /// A missing directory or no matching file is a staging error, the same way
    /// `git add <dir>/*.<extension>` fails on a pathspec that matches nothing.
    fn stage_assets(&self, dir: &Path, extension: &str) -> Result<usize, VcsError>;

    /// Stages modifications and deletions of tracked files (`git add -u`)
    fn stage_updates(&self) -> Result<(), VcsError>;

    /// Commits the index; an index identical to HEAD yields [VcsError::NothingToCommit]
    fn commit(&self, message: &str) -> Result<(), VcsError>;

    /// Pushes the current branch and the annotated tags it reaches (`git push --follow-tags`)
    fn push_with_tags(&self) -> Result<(), VcsError>;

    /// Creates an annotated tag on HEAD; fails if the tag already exists
    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<(), VcsError>;
}
