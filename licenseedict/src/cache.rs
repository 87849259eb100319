//! Persistence of the last successfully verified license.
//!
//! The cache holds exactly one JSON document. Callers treat writes as
//! advisory; a failed save never fails validation.

use crate::error::{LicenseError, LicenseResult};
use crate::license::License;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File name of the cached license document.
pub const CACHE_FILE_NAME: &str = "license_cache.json";

/// Key-value blob store for one license document.
pub trait CacheStore: Send + Sync {
    /// Persists `license`, replacing any previous entry.
    fn save(&self, license: &License) -> LicenseResult<()>;

    /// Loads the cached license. `Ok(None)` means no entry exists.
    fn load(&self) -> LicenseResult<Option<License>>;
}

/// A cache that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCache;

impl CacheStore for DisabledCache {
    fn save(&self, _license: &License) -> LicenseResult<()> {
        Ok(())
    }

    fn load(&self) -> LicenseResult<Option<License>> {
        Ok(None)
    }
}

/// File-backed cache storing `license_cache.json` in one directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Creates a cache rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates a cache at the default location for an application.
    ///
    /// Resolves to `<user cache dir>/<publisher>/<app>` when an app name is
    /// given, falling back to `<temp dir>/licenseedict`.
    #[must_use]
    pub fn for_app(app_name: &str, app_publisher: &str) -> Self {
        Self::new(default_cache_dir(app_name, app_publisher))
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the full path of the cache document.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE_NAME)
    }
}

impl CacheStore for FileCache {
    fn save(&self, license: &License) -> LicenseResult<()> {
        create_private_dir(&self.dir)?;
        let data = serde_json::to_vec(license)?;
        write_private_file(&self.path(), &data)
    }

    fn load(&self) -> LicenseResult<Option<License>> {
        let data = match fs::read(self.path()) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LicenseError::Storage(format!("failed to read cache: {e}"))),
        };
        let license = serde_json::from_slice(&data)?;
        Ok(Some(license))
    }
}

/// Resolves the default cache directory for an application.
#[must_use]
pub fn default_cache_dir(app_name: &str, app_publisher: &str) -> PathBuf {
    if !app_name.is_empty() {
        if let Some(base) = dirs::cache_dir() {
            return base.join(app_publisher).join(app_name);
        }
    }
    std::env::temp_dir().join("licenseedict")
}

fn create_private_dir(dir: &Path) -> LicenseResult<()> {
    fs::create_dir_all(dir)
        .map_err(|e| LicenseError::Storage(format!("failed to create cache dir: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
            .map_err(|e| LicenseError::Storage(format!("failed to set cache dir mode: {e}")))?;
    }

    Ok(())
}

fn write_private_file(path: &Path, data: &[u8]) -> LicenseResult<()> {
    fs::write(path, data)
        .map_err(|e| LicenseError::Storage(format!("failed to write cache: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| LicenseError::Storage(format!("failed to set cache file mode: {e}")))?;
    }

    Ok(())
}
