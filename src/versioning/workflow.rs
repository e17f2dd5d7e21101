use crate::error::{PublishError, VcsError};
use crate::vcs::VersionControl;
use crate::version::{BumpLevel, Version};
use crate::versioning::{VersionIncrementer, VersionOracle};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Extension of the scrivener text assets staged on every commit
const ASSET_EXTENSION: &str = "rtf";

/// What to commit and how far to bump, built once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    pub project: String,
    pub message: String,
    pub level: BumpLevel,
}

impl CommitRequest {
    /// Rejects messages of one character or less and suppressed versioning
    pub fn new(
        project: impl Into<String>,
        message: impl Into<String>,
        level: BumpLevel,
    ) -> Result<Self, PublishError> {
        let message = message.into();
        if message.trim().chars().count() <= 1 {
            return Err(PublishError::config(
                "will not commit without a proper commit message; use '-g <msg>'",
            ));
        }
        if level == BumpLevel::Suppressed {
            return Err(PublishError::config("versioning is suppressed; nothing to commit"));
        }
        Ok(CommitRequest { project: project.into(), message, level })
    }

    /// Directory holding the scrivener documents, `<project>.scriv/Files/Docs`
    pub fn asset_dir(&self) -> PathBuf {
        PathBuf::from(format!("{}.scriv", self.project)).join("Files").join("Docs")
    }
}

/// Version produced by the workflow, plus whatever went wrong on the way
#[derive(Debug)]
pub struct WorkflowOutcome {
    pub version: Version,
    /// Staging, commit or push failure that made the workflow fall back
    pub fallback: Option<VcsError>,
    /// Tag creation failure after a successful commit and push
    pub tag_failure: Option<VcsError>,
}

impl WorkflowOutcome {
    /// True when the commit and push went through, whether or not tagging did
    pub fn committed(&self) -> bool {
        self.fallback.is_none()
    }

    /// True when every requested step succeeded
    pub fn complete(&self) -> bool {
        self.fallback.is_none() && self.tag_failure.is_none()
    }
}

/// Stage, commit, push and optionally bump, falling back to the current version
pub struct CommitWorkflow<'a, V: VersionControl + ?Sized> {
    vcs: &'a V,
}

impl<'a, V: VersionControl + ?Sized> CommitWorkflow<'a, V> {
    pub fn new(vcs: &'a V) -> Self {
        CommitWorkflow { vcs }
    }

    /// Runs the workflow for `request`.
    ///
    /// Staging, commit and push failures are not errors: the current version is
    /// returned with the failure attached. `Err` only means the version itself
    /// could not be determined.
    pub fn commit_and_tag(&self, request: &CommitRequest) -> Result<WorkflowOutcome, VcsError> {
        if let Err(e) = self.stage(request) {
            return self.fall_back(e);
        }

        if let Err(e) = self.commit_and_push(request) {
            return self.fall_back(e);
        }

        let (version, tag_failure) = VersionIncrementer::new(self.vcs).bump_reporting(request.level)?;
        Ok(WorkflowOutcome { version, fallback: None, tag_failure })
    }

    fn stage(&self, request: &CommitRequest) -> Result<(), VcsError> {
        let staged = self.vcs.stage_assets(&request.asset_dir(), ASSET_EXTENSION)?;
        debug!("Staged {} scrivener asset(s)", staged);
        self.vcs.stage_updates()
    }

    fn commit_and_push(&self, request: &CommitRequest) -> Result<(), VcsError> {
        self.vcs.commit(&request.message)?;
        self.vcs.push_with_tags()?;
        info!("Committed and pushed: {}", request.message);
        Ok(())
    }

    fn fall_back(&self, error: VcsError) -> Result<WorkflowOutcome, VcsError> {
        let version = VersionOracle::new(self.vcs).current_version()?;
        warn!("{} - maintaining current version ({})", error, version);
        Ok(WorkflowOutcome { version, fallback: Some(error), tag_failure: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::mock::{Failure, VcsCall};
    use crate::vcs::MockVcs;

    fn request(level: BumpLevel) -> CommitRequest {
        CommitRequest::new("Thesis", "rewrite chapter 2", level).unwrap()
    }

    #[test]
    fn test_request_rejects_short_message() {
        assert!(CommitRequest::new("Thesis", "", BumpLevel::Minor).is_err());
        assert!(CommitRequest::new("Thesis", "x", BumpLevel::None).is_err());
        assert!(CommitRequest::new("Thesis", "ok", BumpLevel::None).is_ok());
    }

    #[test]
    fn test_request_rejects_suppressed() {
        let err = CommitRequest::new("Thesis", "message", BumpLevel::Suppressed).unwrap_err();
        assert!(err.is_usage_error());
    }

    #[test]
    fn test_asset_dir() {
        let dir = request(BumpLevel::None).asset_dir();
        assert_eq!(dir, PathBuf::from("Thesis.scriv").join("Files").join("Docs"));
    }

    #[test]
    fn test_minor_commit_runs_every_step_in_order() {
        let vcs = MockVcs::tagged(2, 5, 13);
        let outcome = CommitWorkflow::new(&vcs).commit_and_tag(&request(BumpLevel::Minor)).unwrap();

        assert!(outcome.complete());
        assert_eq!(outcome.version.to_string(), "v2.6-0");
        assert_eq!(
            vcs.calls(),
            vec![
                VcsCall::StageAssets(PathBuf::from("Thesis.scriv").join("Files").join("Docs")),
                VcsCall::StageUpdates,
                VcsCall::Commit("rewrite chapter 2".to_string()),
                VcsCall::Push,
                VcsCall::Describe,
                VcsCall::Tag { name: "v2.6".to_string(), message: "Version v2.6".to_string() },
            ]
        );
    }

    #[test]
    fn test_none_level_advances_commit_count_only() {
        let vcs = MockVcs::tagged(2, 5, 13);
        let outcome = CommitWorkflow::new(&vcs).commit_and_tag(&request(BumpLevel::None)).unwrap();

        assert_eq!(outcome.version.to_string(), "v2.5-14");
        assert!(!vcs.calls().iter().any(|call| matches!(call, VcsCall::Tag { .. })));
    }

    #[test]
    fn test_nothing_to_commit_falls_back_without_tagging() {
        let vcs = MockVcs::tagged(2, 5, 13).failing(Failure::NothingToCommit);
        let before = VersionOracle::new(&vcs).current_version().unwrap();

        let outcome = CommitWorkflow::new(&vcs).commit_and_tag(&request(BumpLevel::Major)).unwrap();

        assert_eq!(outcome.version, before);
        assert!(matches!(outcome.fallback, Some(VcsError::NothingToCommit)));
        let calls = vcs.calls();
        assert!(!calls.contains(&VcsCall::Push));
        assert!(!calls.iter().any(|call| matches!(call, VcsCall::Tag { .. })));
    }

    #[test]
    fn test_push_failure_falls_back_without_tagging() {
        let vcs = MockVcs::tagged(0, 3, 1).failing(Failure::Push);
        let outcome = CommitWorkflow::new(&vcs).commit_and_tag(&request(BumpLevel::Minor)).unwrap();

        assert!(matches!(outcome.fallback, Some(VcsError::Push(_))));
        // The local commit went through before the push failed
        assert_eq!(outcome.version.to_string(), "v0.3-2");
        assert!(!vcs.calls().iter().any(|call| matches!(call, VcsCall::Tag { .. })));
    }

    #[test]
    fn test_staging_failure_skips_commit() {
        let vcs = MockVcs::tagged(1, 1, 0).failing(Failure::Staging);
        let outcome = CommitWorkflow::new(&vcs).commit_and_tag(&request(BumpLevel::Minor)).unwrap();

        assert!(matches!(outcome.fallback, Some(VcsError::Staging(_))));
        assert_eq!(outcome.version.to_string(), "v1.1-0");
        assert!(!vcs.calls().iter().any(|call| matches!(call, VcsCall::Commit(_))));
        assert!(!vcs.calls().contains(&VcsCall::StageUpdates));
    }

    #[test]
    fn test_tag_failure_keeps_current_version() {
        let vcs = MockVcs::tagged(1, 1, 0).failing(Failure::Tag);
        let outcome = CommitWorkflow::new(&vcs).commit_and_tag(&request(BumpLevel::Minor)).unwrap();

        assert!(outcome.committed());
        assert!(!outcome.complete());
        assert!(matches!(outcome.tag_failure, Some(VcsError::Tag(_))));
        assert_eq!(outcome.version.to_string(), "v1.1-1");
    }

    #[test]
    fn test_fallback_query_failure_is_an_error() {
        let vcs = MockVcs::untagged().failing(Failure::NothingToCommit);
        let result = CommitWorkflow::new(&vcs).commit_and_tag(&request(BumpLevel::None));
        assert!(matches!(result, Err(VcsError::Query(_))));
    }
}
