//! Per-deployment working directory

use lempman_core::{fsutil, Error, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

const KEY_FILE: &str = "deploy.key";
const INVENTORY_FILE: &str = "inventory.ini";
const VARS_FILE: &str = "vars.yml";

/// Directory `<root>/<uuid>` holding one deployment's files
#[derive(Debug, Clone)]
pub struct Workspace {
    id: String,
    dir: PathBuf,
}

impl Workspace {
    /// Create a fresh workspace with a new id
    pub fn create(root: &Path) -> Result<Self> {
        let id = Uuid::new_v4().to_string();
        let dir = root.join(&id);
        std::fs::create_dir_all(&dir)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700)) {
                tracing::warn!("Failed to set workspace permissions: {}", e);
            }
        }

        debug!("Created deployment workspace {}", dir.display());
        Ok(Self { id, dir })
    }

    /// Open an existing workspace. Only UUID ids are accepted.
    pub fn open(root: &Path, id: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(id)
            .map_err(|_| Error::invalid(format!("Invalid deployment id: {}", id)))?;
        let id = uuid.to_string();
        let dir = root.join(&id);

        if !dir.is_dir() {
            return Err(Error::not_found(format!("deployment {}", id)));
        }
        Ok(Self { id, dir })
    }

    /// Reuse the given workspace or start a new one
    pub fn open_or_create(root: &Path, id: Option<&str>) -> Result<Self> {
        match id.filter(|i| !i.is_empty()) {
            Some(id) => Self::open(root, id),
            None => Self::create(root),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key_path(&self) -> PathBuf {
        self.dir.join(KEY_FILE)
    }

    pub fn inventory_path(&self) -> PathBuf {
        self.dir.join(INVENTORY_FILE)
    }

    pub fn vars_path(&self) -> PathBuf {
        self.dir.join(VARS_FILE)
    }

    pub fn has_key(&self) -> bool {
        self.key_path().is_file()
    }

    /// Store the private key with owner-only permissions
    pub fn write_key(&self, key: &str) -> Result<PathBuf> {
        let mut content = key.trim().replace("\r\n", "\n");
        // ssh refuses keys without a trailing newline
        content.push('\n');

        let path = self.key_path();
        fsutil::write_private(&path, content.as_bytes())?;
        Ok(path)
    }

    pub fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        fsutil::write_private(path, content.as_bytes())
    }

    /// Delete the private key; a missing key is not an error
    pub fn remove_key(&self) -> Result<()> {
        match std::fs::remove_file(self.key_path()) {
            Ok(()) => {
                debug!("Removed deployment key from {}", self.dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete workspaces under `root` last modified more than `max_age` ago.
    ///
    /// Only directories named by a UUID are touched. Returns how many were removed.
    pub fn prune(root: &Path, max_age: Duration) -> Result<usize> {
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let now = SystemTime::now();
        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_workspace = entry
                .file_name()
                .to_str()
                .map_or(false, |name| Uuid::parse_str(name).is_ok());
            if !is_workspace || !path.is_dir() {
                continue;
            }

            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());
            if age.map_or(false, |age| age > max_age) {
                match std::fs::remove_dir_all(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => warn!("Failed to remove stale workspace {}: {}", path.display(), e),
                }
            }
        }

        if removed > 0 {
            info!("Pruned {} stale deployment workspaces", removed);
        }
        Ok(removed)
    }
}
