use crate::error::VcsError;
use crate::vcs::VersionControl;
use crate::version::{BumpLevel, Version};
use crate::versioning::VersionOracle;
use log::{info, warn};

/// Computes the next version and records it as an annotated tag
pub struct VersionIncrementer<'a, V: VersionControl + ?Sized> {
    vcs: &'a V,
}

impl<'a, V: VersionControl + ?Sized> VersionIncrementer<'a, V> {
    pub fn new(vcs: &'a V) -> Self {
        VersionIncrementer { vcs }
    }

    /// Bumps the current version by `level` and tags HEAD with it.
    ///
    /// A failed tag creation is logged and the current version is returned, since
    /// the bumped version would not exist in history. Levels that do not create a
    /// tag return the current version without touching the repository.
    pub fn bump(&self, level: BumpLevel) -> Result<Version, VcsError> {
        self.bump_reporting(level).map(|(version, _)| version)
    }

    /// Like [VersionIncrementer::bump], also handing back the tag failure it recovered from
    pub fn bump_reporting(
        &self,
        level: BumpLevel,
    ) -> Result<(Version, Option<VcsError>), VcsError> {
        let current = VersionOracle::new(self.vcs).current_version()?;
        if !level.creates_tag() {
            return Ok((current, None));
        }

        let next = current.bumped(level);
        let tag = next.tag_name();
        match self.vcs.create_annotated_tag(&tag, &format!("Version {}", tag)) {
            Ok(()) => {
                info!("Incremented version {} -> {}", current, next);
                Ok((next, None))
            }
            Err(e) => {
                warn!("{} - keeping current version {}", e, current);
                Ok((current, Some(e)))
            }
        }
    }
}
