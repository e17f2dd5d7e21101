use crate::error::VcsError;
use crate::vcs::VersionControl;
use std::cell::RefCell;
use std::path::{Path, PathBuf};

/// A call made against [MockVcs], in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsCall {
    Describe,
    StageAssets(PathBuf),
    StageUpdates,
    Commit(String),
    Push,
    Tag { name: String, message: String },
}

impl VcsCall {
    /// True for calls that change repository or remote state
    pub fn is_mutation(&self) -> bool {
        !matches!(self, VcsCall::Describe)
    }
}

/// Operations that can be told to fail
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Failure {
    Staging,
    Commit,
    NothingToCommit,
    Push,
    Tag,
}

#[derive(Debug, Default)]
struct MockState {
    tag: Option<(u32, u32)>,
    commits_since_tag: u32,
    tags: Vec<String>,
}

/// In-memory repository that records calls and simulates tag history
#[derive(Debug, Default)]
pub struct MockVcs {
    state: RefCell<MockState>,
    calls: RefCell<Vec<VcsCall>>,
    failures: Vec<Failure>,
}

impl MockVcs {
    /// Repository whose latest annotated tag is `v<major>.<minor>` with `commits` on top
    pub fn tagged(major: u32, minor: u32, commits: u32) -> Self {
        MockVcs {
            state: RefCell::new(MockState {
                tag: Some((major, minor)),
                commits_since_tag: commits,
                tags: vec![format!("v{}.{}", major, minor)],
            }),
            ..Default::default()
        }
    }

    /// Repository without any annotated tag
    pub fn untagged() -> Self {
        MockVcs::default()
    }

    pub fn failing(mut self, failure: Failure) -> Self {
        self.failures.push(failure);
        self
    }

    pub fn calls(&self) -> Vec<VcsCall> {
        self.calls.borrow().clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls.borrow().iter().filter(|call| call.is_mutation()).count()
    }

    pub fn tags(&self) -> Vec<String> {
        self.state.borrow().tags.clone()
    }

    fn record(&self, call: VcsCall) {
        self.calls.borrow_mut().push(call);
    }

    fn fails(&self, failure: Failure) -> bool {
        self.failures.contains(&failure)
    }
}

impl VersionControl for MockVcs {
    fn describe(&self) -> Result<String, VcsError> {
        self.record(VcsCall::Describe);
        let state = self.state.borrow();
        match state.tag {
            Some((major, minor)) => Ok(format!(
                "v{}.{}-{}-g0000000",
                major, minor, state.commits_since_tag
            )),
            None => Err(VcsError::Query("No names found, cannot describe anything.".to_string())),
        }
    }

    fn stage_assets(&self, dir: &Path, extension: &str) -> Result<usize, VcsError> {
        self.record(VcsCall::StageAssets(dir.to_path_buf()));
        if self.fails(Failure::Staging) {
            return Err(VcsError::Staging(format!(
                "pathspec '{}' did not match any files",
                dir.join(format!("*.{}", extension)).display()
            )));
        }
        Ok(1)
    }

    fn stage_updates(&self) -> Result<(), VcsError> {
        self.record(VcsCall::StageUpdates);
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<(), VcsError> {
        self.record(VcsCall::Commit(message.to_string()));
        if self.fails(Failure::NothingToCommit) {
            return Err(VcsError::NothingToCommit);
        }
        if self.fails(Failure::Commit) {
            return Err(VcsError::Commit("simulated commit failure".to_string()));
        }
        self.state.borrow_mut().commits_since_tag += 1;
        Ok(())
    }

    fn push_with_tags(&self) -> Result<(), VcsError> {
        self.record(VcsCall::Push);
        if self.fails(Failure::Push) {
            return Err(VcsError::Push("simulated push failure".to_string()));
        }
        Ok(())
    }

    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<(), VcsError> {
        self.record(VcsCall::Tag { name: name.to_string(), message: message.to_string() });
        let mut state = self.state.borrow_mut();
        if self.fails(Failure::Tag) || state.tags.iter().any(|tag| tag == name) {
            return Err(VcsError::Tag(format!("tag '{}' already exists", name)));
        }

        let parsed: Option<(u32, u32)> = name
            .strip_prefix('v')
            .and_then(|rest| rest.split_once('.'))
            .and_then(|(major, minor)| Some((major.parse().ok()?, minor.parse().ok()?)));
        if let Some(tag) = parsed {
            state.tag = Some(tag);
            state.commits_since_tag = 0;
        }
        state.tags.push(name.to_string());
        Ok(())
    }
}
