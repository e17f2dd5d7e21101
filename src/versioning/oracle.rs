use crate::error::VcsError;
use crate::vcs::VersionControl;
use crate::version::Version;
use log::debug;

/// Reads the current version from the most recent annotated tag
pub struct VersionOracle<'a, V: VersionControl + ?Sized> {
    vcs: &'a V,
}

impl<'a, V: VersionControl + ?Sized> VersionOracle<'a, V> {
    pub fn new(vcs: &'a V) -> Self {
        VersionOracle { vcs }
    }

    pub fn current_version(&self) -> Result<Version, VcsError> {
        let description = self.vcs.describe()?;
        let version = Version::parse_description(&description)?;
        debug!("Current version is {}", version);
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::MockVcs;

    #[test]
    fn test_current_version() {
        let vcs = MockVcs::tagged(2, 5, 13);
        let version = VersionOracle::new(&vcs).current_version().unwrap();
        assert_eq!(version, Version::new(2, 5, 13));
        assert_eq!(vcs.mutation_count(), 0);
    }

    #[test]
    fn test_current_version_without_tag() {
        let vcs = MockVcs::untagged();
        let result = VersionOracle::new(&vcs).current_version();
        assert!(matches!(result, Err(VcsError::Query(_))));
    }
}
