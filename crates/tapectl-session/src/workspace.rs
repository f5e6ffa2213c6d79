//! Per-session temporary directories.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Exclusively owned directory holding a session's script, text dump and
/// screenshots. Removed explicitly via [`Workspace::remove`].
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    /// Create a fresh, uniquely named directory under `base_dir`.
    pub async fn create(base_dir: &Path) -> tapectl_core::Result<Self> {
        tokio::fs::create_dir_all(base_dir).await?;
        let path = base_dir.join(format!("session-{}", Uuid::new_v4().simple()));
        tokio::fs::create_dir(&path).await?;
        debug!(path = %path.display(), "workspace created");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Absolute path of a file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Best-effort removal. Failures are logged, never returned.
    pub async fn remove(&self) {
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "workspace removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove workspace"),
        }
    }
}
