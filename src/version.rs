use crate::error::VcsError;
use regex::Regex;
use std::fmt;

/// Version derived from the most recent annotated tag and the commits on top of it
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub commits_since_tag: u32,
}

/// Requested magnitude of the version increment for a run
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum BumpLevel {
    /// Commit, keep the current tag
    #[default]
    None,
    Minor,
    Major,
    /// No versioning at all: no commit, no query
    Suppressed,
}

impl Version {
    pub fn new(major: u32, minor: u32, commits_since_tag: u32) -> Self {
        Version { major, minor, commits_since_tag }
    }

    /// Parses a long description (`v<major>.<minor>-<commits>-<hash>`).
    ///
    /// Everything after the third hyphen-separated field is treated as the hash,
    /// so a hash carrying extra hyphens is accepted rather than misread.
    pub fn parse_description(description: &str) -> Result<Self, VcsError> {
        let description = description.trim();
        let regex = Self::description_regex()?;
        let captures = regex.captures(description).ok_or_else(|| {
            VcsError::Query(format!("malformed version description '{}'", description))
        })?;

        let number = |index: usize| -> Result<u32, VcsError> {
            captures[index].parse::<u32>().map_err(|e| {
                VcsError::Query(format!("invalid number in '{}': {}", description, e))
            })
        };

        Ok(Version {
            major: number(1)?,
            minor: number(2)?,
            commits_since_tag: number(3)?,
        })
    }

    /// Tag name for this version, `v<major>.<minor>`
    pub fn tag_name(&self) -> String {
        format!("v{}.{}", self.major, self.minor)
    }

    /// Next version for the given level; `None` and `Suppressed` leave it unchanged
    pub fn bumped(&self, level: BumpLevel) -> Version {
        match level {
            BumpLevel::Minor => Version::new(self.major, self.minor.saturating_add(1), 0),
            BumpLevel::Major => Version::new(self.major.saturating_add(1), 0, 0),
            BumpLevel::None | BumpLevel::Suppressed => *self,
        }
    }

    fn description_regex() -> Result<Regex, VcsError> {
        Regex::new(r"^v(\d+)\.(\d+)-(\d+)-(.+)$")
            .map_err(|e| VcsError::Query(format!("invalid description grammar: {}", e)))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.tag_name(), self.commits_since_tag)
    }
}

impl BumpLevel {
    /// True when a new tag is to be created
    pub fn creates_tag(&self) -> bool {
        matches!(self, BumpLevel::Minor | BumpLevel::Major)
    }
}
