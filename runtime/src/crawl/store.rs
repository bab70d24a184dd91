//! Raw capture storage: two sibling directories keyed by subject id.

use crate::error::HarvestResult;
use std::path::{Path, PathBuf};

/// Persists `{id}.txt` profile and detail documents side by side.
#[derive(Debug, Clone)]
pub struct CaptureStore {
    profile_dir: PathBuf,
    detail_dir: PathBuf,
}

impl CaptureStore {
    pub fn new(profile_dir: impl Into<PathBuf>, detail_dir: impl Into<PathBuf>) -> Self {
        Self {
            profile_dir: profile_dir.into(),
            detail_dir: detail_dir.into(),
        }
    }

    fn profile_path(&self, id: &str) -> PathBuf {
        self.profile_dir.join(format!("{id}.txt"))
    }

    fn detail_path(&self, id: &str) -> PathBuf {
        self.detail_dir.join(format!("{id}.txt"))
    }

    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    /// Write both documents for `id`, creating the directories on demand.
    ///
    /// The detail document lands first, so an interrupted write never leaves
    /// a profile capture without its detail.
    pub fn persist(&self, id: &str, profile: &str, detail: &str) -> HarvestResult<()> {
        std::fs::create_dir_all(&self.profile_dir)?;
        std::fs::create_dir_all(&self.detail_dir)?;
        std::fs::write(self.detail_path(id), detail)?;
        std::fs::write(self.profile_path(id), profile)?;
        Ok(())
    }

    /// Both documents for `id`, or `None` when either is missing.
    pub fn load(&self, id: &str) -> HarvestResult<Option<(String, String)>> {
        let (profile, detail) = (self.profile_path(id), self.detail_path(id));
        if !profile.is_file() || !detail.is_file() {
            return Ok(None);
        }
        Ok(Some((
            std::fs::read_to_string(profile)?,
            std::fs::read_to_string(detail)?,
        )))
    }

    /// Whether both documents for `id` are on disk.
    pub fn is_captured(&self, id: &str) -> bool {
        self.profile_path(id).is_file() && self.detail_path(id).is_file()
    }
}
