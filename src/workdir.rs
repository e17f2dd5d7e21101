use log::{debug, error};
use std::path::{Path, PathBuf};

/// Switches the process working directory and restores it when dropped
pub struct WorkDirGuard {
    saved: PathBuf,
}

impl WorkDirGuard {
    pub fn enter(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let saved = std::env::current_dir()?;
        std::env::set_current_dir(path.as_ref())?;
        debug!("Changed directory to {}", path.as_ref().display());
        Ok(WorkDirGuard { saved })
    }

    pub fn saved(&self) -> &Path {
        &self.saved
    }
}

impl Drop for WorkDirGuard {
    fn drop(&mut self) {
        match std::env::set_current_dir(&self.saved) {
            Ok(()) => debug!("Restored directory {}", self.saved.display()),
            Err(e) => error!("Failed to restore directory {}: {}", self.saved.display(), e),
        }
    }
}
