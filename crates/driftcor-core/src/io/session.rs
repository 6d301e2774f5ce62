use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;

use super::record::{RecordElement, RecordFile};

/// Owns the scratch record files created for one run.
///
/// Every file created through the session is removed when the session is
/// dropped, whether the run succeeded or not.
#[derive(Debug, Default)]
pub struct CacheSession {
    scratch: Vec<(String, PathBuf)>,
}

impl CacheSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a named scratch record file at `path`.
    pub fn create<T: RecordElement>(
        &mut self,
        name: &str,
        path: &Path,
        count: usize,
        shape: &[usize],
    ) -> Result<RecordFile<T>> {
        let file = RecordFile::<T>::create(path, count, shape)?;
        debug!(cache = name, path = %path.display(), count, ?shape, "Created scratch cache");
        self.scratch.push((name.to_string(), path.to_path_buf()));
        Ok(file)
    }

    pub fn scratch_paths(&self) -> impl Iterator<Item = &Path> {
        self.scratch.iter().map(|(_, p)| p.as_path())
    }
}

impl Drop for CacheSession {
    fn drop(&mut self) {
        for (name, path) in self.scratch.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(cache = %name, path = %path.display(), "Removed scratch cache"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(cache = %name, path = %path.display(), error = %e, "Failed to remove scratch cache"),
            }
        }
    }
}
