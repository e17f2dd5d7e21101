use git2::{
    Cred, CredentialType, DescribeFormatOptions, DescribeOptions, PushOptions, RemoteCallbacks,
    Repository, Signature,
};
use log::{debug, info, warn};
use std::cell::Cell;
use std::path::{Path, PathBuf};

use crate::error::VcsError;
use crate::vcs::VersionControl;

const DEFAULT_REMOTE: &str = "origin";
const SSH_KEY_NAMES: [&str; 3] = ["id_ed25519", "id_rsa", "id_ecdsa"];
const MAX_CREDENTIAL_ATTEMPTS: u32 = 5;

pub struct Git2Vcs {
    pub repository: Repository,
    /// Directory the run started in, relative to the working tree root
    prefix: PathBuf,
}

impl Git2Vcs {
    /// Opens the repository containing `path`; asset directories are taken relative to `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VcsError> {
        let path = path.as_ref();
        let repository = Repository::discover(path).map_err(|e| {
            VcsError::Query(format!(
                "failed to find git repository at {:?}: {}",
                path,
                e.message()
            ))
        })?;

        let prefix = match repository.workdir() {
            Some(workdir) => relative_to(path, workdir)?,
            None => PathBuf::new(),
        };
        debug!("Opened repository at {:?}, prefix {:?}", repository.path(), prefix);

        Ok(Git2Vcs { repository, prefix })
    }

    /// Push callbacks: credentials from the local git setup, and refs the remote
    /// rejected turned into errors
    fn push_callbacks() -> RemoteCallbacks<'static> {
        let mut callbacks = RemoteCallbacks::new();
        let attempts = Cell::new(0u32);

        // libgit2 calls back again after every refused credential
        callbacks.credentials(move |url, username_from_url, allowed_types| {
            attempts.set(attempts.get() + 1);
            debug!(
                "Credentials attempt {} for {} (allowed: {:?})",
                attempts.get(),
                url,
                allowed_types
            );
            if attempts.get() > MAX_CREDENTIAL_ATTEMPTS {
                warn!("Too many credential attempts, authentication likely failing");
                return Err(git2::Error::from_str("authentication failed after multiple attempts"));
            }
            push_credentials(url, username_from_url, allowed_types)
        });

        // A rejected ref does not fail `Remote::push` by itself
        callbacks.push_update_reference(|refname, status| match status {
            Some(message) => Err(git2::Error::from_str(&format!(
                "{} rejected by remote: {}",
                refname, message
            ))),
            None => Ok(()),
        });

        callbacks
    }

    fn get_signature(&self) -> Result<Signature<'_>, git2::Error> {
        self.repository.signature()
    }

    fn workdir(&self) -> Result<&Path, VcsError> {
        self.repository
            .workdir()
            .ok_or_else(|| VcsError::Staging("repository has no working tree".to_string()))
    }

    /// Gets the current branch name
    pub fn current_branch(&self) -> Result<String, VcsError> {
        let head = self.repository.head()?;
        let branch_name = head
            .shorthand()
            .ok_or_else(|| VcsError::Query("could not determine current branch".to_string()))?;
        Ok(branch_name.to_string())
    }

    /// Remote the branch tracks, falling back to `origin`
    fn upstream_remote(&self, branch: &str) -> String {
        self.repository
            .branch_upstream_remote(&format!("refs/heads/{}", branch))
            .ok()
            .and_then(|buf| buf.as_str().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_REMOTE.to_string())
    }

    /// Annotated tags pointing at HEAD or one of its ancestors
    pub fn reachable_annotated_tags(&self) -> Result<Vec<String>, VcsError> {
        let head = self.repository.head()?.peel_to_commit()?.id();
        let mut candidates = Vec::new();

        self.repository.tag_foreach(|oid, name| {
            if let Ok(name) = std::str::from_utf8(name) {
                candidates.push((oid, name.trim_start_matches("refs/tags/").to_string()));
            }
            true
        })?;

        let mut tags = Vec::new();
        for (oid, name) in candidates {
            // Lightweight tags point straight at a commit, not at a tag object
            let Ok(tag) = self.repository.find_tag(oid) else {
                continue;
            };
            let target = tag.target_id();
            if target == head || self.repository.graph_descendant_of(head, target)? {
                tags.push(name);
            }
        }
        tags.sort();
        Ok(tags)
    }
}

impl VersionControl for Git2Vcs {
    fn describe(&self) -> Result<String, VcsError> {
        let describe = self
            .repository
            .describe(&DescribeOptions::new())
            .map_err(|e| VcsError::Query(e.message().to_string()))?;

        let mut format = DescribeFormatOptions::new();
        format.always_use_long_format(true);

        let description = describe
            .format(Some(&format))
            .map_err(|e| VcsError::Query(e.message().to_string()))?;
        debug!("Described HEAD as {}", description);
        Ok(description)
    }

    fn stage_assets(&self, dir: &Path, extension: &str) -> Result<usize, VcsError> {
        let workdir = self.workdir()?;
        let dir = self.prefix.join(dir);
        let absolute = workdir.join(&dir);
        let pathspec = dir.join(format!("*.{}", extension));

        if !absolute.is_dir() {
            return Err(VcsError::Staging(format!(
                "pathspec '{}' did not match any files",
                pathspec.display()
            )));
        }

        let mut matched: Vec<PathBuf> = Vec::new();
        for entry in walkdir::WalkDir::new(&absolute).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| VcsError::Staging(e.to_string()))?;
            let path = entry.path();
            if entry.file_type().is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(extension)
            {
                let relative = path
                    .strip_prefix(workdir)
                    .map_err(|e| VcsError::Staging(e.to_string()))?;
                matched.push(relative.to_path_buf());
            }
        }

        if matched.is_empty() {
            return Err(VcsError::Staging(format!(
                "pathspec '{}' did not match any files",
                pathspec.display()
            )));
        }

        let mut index = self.repository.index()?;
        for path in &matched {
            index.add_path(path)?;
        }
        index.write()?;

        debug!("Staged {} asset(s) matching {}", matched.len(), pathspec.display());
        Ok(matched.len())
    }

    fn stage_updates(&self) -> Result<(), VcsError> {
        let mut index = self.repository.index()?;

        index.update_all(["*"].iter(), None)?;
        index.write()?;

        debug!("Staged updates of tracked files");
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<(), VcsError> {
        info!("Creating commit: {}", message);

        let mut index = self.repository.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repository.find_tree(tree_id)?;

        let parent_commit = match self.repository.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => {
                warn!("No parent commit found - this will be the initial commit");
                None
            }
        };

        if let Some(parent) = &parent_commit {
            if parent.tree_id() == tree_id {
                return Err(VcsError::NothingToCommit);
            }
        }

        let sig = self.get_signature().map_err(|e| {
            VcsError::Commit(format!(
                "{}. Please configure user.name and user.email in git config",
                e.message()
            ))
        })?;
        let parents: Vec<&git2::Commit> = parent_commit.iter().collect();

        let commit_id = self
            .repository
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .map_err(|e| VcsError::Commit(e.message().to_string()))?;

        info!("Created commit: {}", commit_id);
        Ok(())
    }

    fn push_with_tags(&self) -> Result<(), VcsError> {
        let branch = self.current_branch()?;
        let remote_name = self.upstream_remote(&branch);
        info!("Pushing {} with tags to {}", branch, remote_name);

        let mut remote = self
            .repository
            .find_remote(&remote_name)
            .map_err(|e| VcsError::Push(format!("remote '{}': {}", remote_name, e.message())))?;

        let mut refspecs = vec![format!("refs/heads/{}:refs/heads/{}", branch, branch)];
        for tag in self.reachable_annotated_tags()? {
            refspecs.push(format!("refs/tags/{}:refs/tags/{}", tag, tag));
        }
        debug!("Push refspecs: {:?}", refspecs);

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(Self::push_callbacks());

        remote
            .push(refspecs.as_slice(), Some(&mut push_options))
            .map_err(|e| VcsError::Push(e.message().to_string()))?;

        info!("Pushed {} to {}", branch, remote_name);
        Ok(())
    }

    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<(), VcsError> {
        info!("Creating tag: {}", name);

        let sig = self
            .get_signature()
            .map_err(|e| VcsError::Tag(e.message().to_string()))?;
        let head = self
            .repository
            .head()
            .and_then(|head| head.peel(git2::ObjectType::Commit))
            .map_err(|e| VcsError::Tag(e.message().to_string()))?;

        self.repository
            .tag(name, &head, &sig, message, false)
            .map_err(|e| VcsError::Tag(e.message().to_string()))?;

        info!("Created tag: {}", name);
        Ok(())
    }
}

/// `path` relative to the working tree root `workdir`
fn relative_to(path: &Path, workdir: &Path) -> Result<PathBuf, VcsError> {
    let canonical = |p: &Path| {
        p.canonicalize()
            .map_err(|e| VcsError::Query(format!("cannot resolve {:?}: {}", p, e)))
    };
    let path = canonical(path)?;
    let workdir = canonical(workdir)?;
    path.strip_prefix(&workdir)
        .map(Path::to_path_buf)
        .map_err(|_| VcsError::Query(format!("{:?} is outside the working tree {:?}", path, workdir)))
}

fn push_credentials(
    url: &str,
    username_from_url: Option<&str>,
    allowed_types: CredentialType,
) -> Result<Cred, git2::Error> {
    if allowed_types.contains(CredentialType::SSH_KEY) {
        if let Some(cred) = ssh_credentials(username_from_url.unwrap_or("git")) {
            return Ok(cred);
        }
    }

    if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
        let config = git2::Config::open_default()?;
        if let Ok(cred) = Cred::credential_helper(&config, url, username_from_url) {
            return Ok(cred);
        }
    }

    if allowed_types.contains(CredentialType::DEFAULT) {
        return Cred::default();
    }

    Err(git2::Error::from_str("no suitable credentials found"))
}

/// The ssh agent first, then the usual key files under `~/.ssh`
fn ssh_credentials(username: &str) -> Option<Cred> {
    if let Ok(cred) = Cred::ssh_key_from_agent(username) {
        return Some(cred);
    }

    let ssh_dir = dirs::home_dir()?.join(".ssh");
    SSH_KEY_NAMES.iter().find_map(|name| {
        let private_key = ssh_dir.join(name);
        if !private_key.exists() {
            return None;
        }
        let public_key = ssh_dir.join(format!("{}.pub", name));
        debug!("Trying ssh key {:?}", private_key);
        Cred::ssh_key(
            username,
            public_key.exists().then_some(public_key.as_path()),
            &private_key,
            None,
        )
        .ok()
    })
}
