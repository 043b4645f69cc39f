//! # File I/O Module
//!
//! Handles project file operations with safety features:
//! - **Atomic saves**: Write to a sibling `.tmp`, fsync, rename over the target
//! - **File locking**: Advisory OS lock plus a `.lock` file naming the holder
//! - **Version validation**: Refuse files written by a newer schema
//!
//! ## File Format
//!
//! Projects are saved as `.ort` files containing pretty-printed JSON.
//! Lock files use the `.ort.lock` extension.
//!
//! ## Example
//!
//! ```rust,no_run
//! use calc_core::file_io::{save_project, load_project, FileLock};
//! use calc_core::project::Project;
//! use std::path::Path;
//!
//! let project = Project::new("Engineer", "Tank farm", "Client");
//! let path = Path::new("tank-farm.ort");
//!
//! let lock = FileLock::acquire(path, "engineer@company.kz").unwrap();
//! save_project(&project, path).unwrap();
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{CalcError, CalcResult};
use crate::project::{Project, SCHEMA_VERSION};
use crate::settings::GlobalSettings;

/// Project file extension
pub const PROJECT_EXTENSION: &str = "ort";

/// Locks older than this are taken over regardless of the holder
const STALE_LOCK_HOURS: i64 = 24;

/// Lock file metadata stored in .ort.lock files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// User identifier (email or username)
    pub user_id: String,
    /// Machine name where lock was acquired
    pub machine: String,
    /// Process ID that holds the lock
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Create new lock info for the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }

    /// Holder the way it is shown in a "file locked" message
    pub fn holder(&self) -> String {
        format!("{} ({})", self.user_id, self.machine)
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
            .or_else(|| {
                fs::read_to_string("/etc/hostname")
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            })
    }
}

/// File lock guard that releases the lock when dropped.
///
/// Uses both:
/// 1. OS-level file locking (via fs2) for process safety
/// 2. .lock file with metadata for user visibility
#[derive(Debug)]
pub struct FileLock {
    project_path: PathBuf,
    lock_path: PathBuf,
    /// Keeps the OS lock alive
    _lock_file: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire an exclusive lock on a project file.
    ///
    /// # Returns
    ///
    /// * `Ok(FileLock)` - Lock acquired successfully
    /// * `Err(CalcError::FileLocked)` - Another process holds the lock
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> CalcResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::new(user_id);

        if let Ok(existing) = read_lock_info(&lock_path) {
            if !is_lock_stale(&existing) {
                return Err(CalcError::file_locked(
                    path.display().to_string(),
                    existing.holder(),
                    existing.locked_at.to_rfc3339(),
                ));
            }
            warn!(
                path = %path.display(),
                holder = %existing.holder(),
                pid = existing.pid,
                "taking over stale project lock"
            );
        }

        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| CalcError::file_error("create lock", lock_path.display().to_string(), e.to_string()))?;

        lock_file.try_lock_exclusive().map_err(|_| {
            CalcError::file_locked(path.display().to_string(), "another process", "unknown")
        })?;

        let lock_json = serde_json::to_string_pretty(&info).map_err(CalcError::serialization)?;
        lock_file
            .write_all(lock_json.as_bytes())
            .and_then(|_| lock_file.sync_all())
            .map_err(|e| CalcError::file_error("write lock", lock_path.display().to_string(), e.to_string()))?;

        debug!(path = %path.display(), user = %info.user_id, "project lock acquired");

        Ok(FileLock {
            project_path: path.to_path_buf(),
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Check if a file is locked without acquiring the lock.
    ///
    /// Returns `Some(LockInfo)` if locked, `None` if available or stale.
    pub fn check(path: &Path) -> Option<LockInfo> {
        read_lock_info(&lock_path_for(path))
            .ok()
            .filter(|info| !is_lock_stale(info))
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // OS lock goes with the handle
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// `<path>.<ext>.lock` next to the project file
fn lock_path_for(project_path: &Path) -> PathBuf {
    with_suffix(project_path, "lock")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut out = path.to_path_buf();
    let extension = path
        .extension()
        .map(|e| format!("{}.{}", e.to_string_lossy(), suffix))
        .unwrap_or_else(|| suffix.to_string());
    out.set_extension(extension);
    out
}

fn read_lock_info(lock_path: &Path) -> CalcResult<LockInfo> {
    read_json(lock_path, "read lock")
}

/// A lock is stale when its process is gone (same machine) or it is older
/// than a day.
fn is_lock_stale(info: &LockInfo) -> bool {
    if hostname().as_deref() == Some(info.machine.as_str()) {
        if info.pid == std::process::id() {
            return false;
        }
        #[cfg(unix)]
        {
            if fs::metadata(format!("/proc/{}", info.pid)).is_err() && Path::new("/proc/self").exists() {
                return true;
            }
        }
        #[cfg(windows)]
        {
            use std::process::Command;
            let output = Command::new("tasklist")
                .args(["/FI", &format!("PID eq {}", info.pid), "/NH"])
                .output();
            if let Ok(output) = output {
                let stdout = String::from_utf8_lossy(&output.stdout);
                if !stdout.contains(&info.pid.to_string()) {
                    return true;
                }
            }
        }
    }

    (Utc::now() - info.locked_at).num_hours() > STALE_LOCK_HOURS
}

/// Write any serializable value as pretty JSON with atomic write semantics.
///
/// 1. Serialize to JSON
/// 2. Write to `<path>.tmp` and fsync
/// 3. Rename over `path` (atomic on most filesystems)
pub fn write_json_atomic<T: Serialize>(value: &T, path: &Path) -> CalcResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(CalcError::serialization)?;
    write_bytes_atomic(json.as_bytes(), path)
}

/// Atomic write of raw bytes (also used for PDF reports).
pub fn write_bytes_atomic(bytes: &[u8], path: &Path) -> CalcResult<()> {
    let tmp_path = with_suffix(path, "tmp");

    let mut tmp_file = File::create(&tmp_path)
        .map_err(|e| CalcError::file_error("create temp file", tmp_path.display().to_string(), e.to_string()))?;

    let written = tmp_file.write_all(bytes).and_then(|_| tmp_file.sync_all());
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(CalcError::file_error(
            "write temp file",
            tmp_path.display().to_string(),
            e.to_string(),
        ));
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CalcError::file_error("rename to final", path.display().to_string(), e.to_string())
    })
}

fn read_json<T: DeserializeOwned>(path: &Path, operation: &str) -> CalcResult<T> {
    let mut file =
        File::open(path).map_err(|e| CalcError::file_error(operation, path.display().to_string(), e.to_string()))?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| CalcError::file_error(operation, path.display().to_string(), e.to_string()))?;

    serde_json::from_str(&contents)
        .map_err(|e| CalcError::serialization(format!("Invalid JSON in {}: {}", path.display(), e)))
}

/// Save a project to a file with atomic write semantics.
///
/// # Example
///
/// ```rust,no_run
/// use calc_core::file_io::save_project;
/// use calc_core::project::Project;
/// use std::path::Path;
///
/// let project = Project::new("Engineer", "Tank farm", "Client");
/// save_project(&project, Path::new("tank-farm.ort"))?;
/// # Ok::<(), calc_core::errors::CalcError>(())
/// ```
pub fn save_project(project: &Project, path: &Path) -> CalcResult<()> {
    write_json_atomic(project, path)?;
    info!(path = %path.display(), items = project.item_count(), "project saved");
    Ok(())
}

/// Load a project from a file.
///
/// # Returns
///
/// * `Ok(Project)` - Successfully loaded project
/// * `Err(CalcError::VersionMismatch)` - File version is incompatible
/// * `Err(CalcError::SerializationError)` - Invalid JSON
/// * `Err(CalcError::FileError)` - I/O error
pub fn load_project(path: &Path) -> CalcResult<Project> {
    let project: Project = read_json(path, "open")?;
    validate_version(&project.meta.version)?;
    info!(
        path = %path.display(),
        facility = %project.meta.facility,
        items = project.item_count(),
        "project loaded"
    );
    Ok(project)
}

/// Load a project, returning whether it's read-only due to a lock.
///
/// * `Ok((Project, None))` - Loaded successfully, no lock
/// * `Ok((Project, Some(LockInfo)))` - Loaded, but another user has the lock
pub fn load_project_with_lock_check(path: &Path) -> CalcResult<(Project, Option<LockInfo>)> {
    let project = load_project(path)?;
    let lock_info = FileLock::check(path);
    Ok((project, lock_info))
}

/// Lock, load, modify and save a project in one step.
///
/// The lock is held for the whole edit and released on return. `edit`'s
/// value is passed through; on error nothing is written.
pub fn edit_project<T>(
    path: &Path,
    user_id: &str,
    edit: impl FnOnce(&mut Project) -> CalcResult<T>,
) -> CalcResult<T> {
    let _lock = FileLock::acquire(path, user_id)?;
    let mut project = load_project(path)?;
    let out = edit(&mut project)?;
    save_project(&project, path)?;
    Ok(out)
}

/// Load standalone calculation settings (missing keys take defaults).
///
/// Out-of-range policy values fail with `ValidationFailed`.
pub fn load_settings(path: &Path) -> CalcResult<GlobalSettings> {
    let settings: GlobalSettings = read_json(path, "read settings")?;
    settings.validate()?;
    Ok(settings)
}

/// Check a file schema version against [`SCHEMA_VERSION`].
///
/// Major versions must match; within 0.x a newer minor is refused.
fn validate_version(file_version: &str) -> CalcResult<()> {
    let mismatch = || CalcError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };
    let parse = |v: &str| -> Option<Vec<u32>> { v.split('.').map(|p| p.parse().ok()).collect() };

    let file_parts = parse(file_version).ok_or_else(mismatch)?;
    let current_parts = parse(SCHEMA_VERSION).ok_or_else(mismatch)?;

    match (file_parts.as_slice(), current_parts.as_slice()) {
        ([file_major, ..], [major, ..]) if file_major != major => Err(mismatch()),
        ([0, file_minor, ..], [0, minor, ..]) if file_minor > minor => Err(mismatch()),
        ([_, ..], [_, ..]) => Ok(()),
        _ => Err(mismatch()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::ngps::{IndustryType, NgpsInput};
    use crate::calculations::CalculationItem;
    use crate::category::HazardCategory;
    use std::env::temp_dir;

    fn temp_project_path(name: &str) -> PathBuf {
        temp_dir().join(format!("ortcalc_test_{}_{}.ort", name, std::process::id()))
    }

    fn depot() -> CalculationItem {
        CalculationItem::Ngps(NgpsInput {
            label: "Depot".to_string(),
            industry_type: IndustryType::FuelDepot,
            area_m2: 6_000,
            category: HazardCategory::A,
            distance_to_station_km: 12.0,
        })
    }

    #[test]
    fn test_lock_path_generation() {
        let lock_path = lock_path_for(Path::new("/path/to/project.ort"));
        assert_eq!(lock_path, Path::new("/path/to/project.ort.lock"));
        assert_eq!(lock_path_for(Path::new("plain")), Path::new("plain.lock"));
    }

    #[test]
    fn test_lock_info_creation() {
        let info = LockInfo::new("test@example.com");
        assert_eq!(info.user_id, "test@example.com");
        assert!(info.pid > 0);
        assert!(info.holder().starts_with("test@example.com ("));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = temp_project_path("roundtrip");

        let mut project = Project::new("Test Engineer", "Depot", "Test Client");
        project.add_item(depot());
        save_project(&project, &path).unwrap();

        let loaded = load_project(&path).unwrap();
        assert_eq!(loaded.meta.engineer, "Test Engineer");
        assert_eq!(loaded.meta.facility, "Depot");
        assert_eq!(loaded.items, project.items);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_atomic_save_creates_no_tmp_file() {
        let path = temp_project_path("atomic");
        let tmp_path = with_suffix(&path, "tmp");

        save_project(&Project::new("Test", "Site", "Client"), &path).unwrap();

        assert!(!tmp_path.exists());
        assert!(path.exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_file_lock_acquire_and_release() {
        let path = temp_project_path("lock_test");
        File::create(&path).unwrap();

        let lock = FileLock::acquire(&path, "test@example.com").unwrap();
        assert_eq!(lock.info.user_id, "test@example.com");
        assert_eq!(lock.project_path(), path.as_path());

        let lock_path = lock_path_for(&path);
        assert!(lock_path.exists());
        assert!(FileLock::check(&path).is_some());

        let second = FileLock::acquire(&path, "other@example.com").unwrap_err();
        assert_eq!(second.error_code(), "FILE_LOCKED");
        assert!(second.is_recoverable());

        drop(lock);
        assert!(!lock_path.exists());
        assert!(FileLock::check(&path).is_none());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_stale_lock_is_taken_over() {
        let path = temp_project_path("stale_lock");
        File::create(&path).unwrap();

        let mut old = LockInfo::new("gone@example.com");
        old.machine = "elsewhere".to_string();
        old.locked_at = Utc::now() - chrono::Duration::hours(STALE_LOCK_HOURS + 1);
        write_json_atomic(&old, &lock_path_for(&path)).unwrap();

        assert!(FileLock::check(&path).is_none());
        let lock = FileLock::acquire(&path, "me@example.com").unwrap();
        assert_eq!(lock.info.user_id, "me@example.com");

        drop(lock);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.5").is_ok());
        assert!(validate_version("0.0.9").is_ok());
        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("draft").is_err());
        assert!(validate_version("").is_err());
    }

    #[test]
    fn test_load_rejects_newer_schema() {
        let path = temp_project_path("newer");
        let mut project = Project::new("Test", "Site", "Client");
        project.meta.version = "0.9.0".to_string();
        write_json_atomic(&project, &path).unwrap();

        let err = load_project(&path).unwrap_err();
        assert_eq!(err.error_code(), "VERSION_MISMATCH");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_project(&temp_project_path("does_not_exist")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_ERROR");
    }

    #[test]
    fn test_edit_project() {
        let path = temp_project_path("edit");
        save_project(&Project::new("Test", "Site", "Client"), &path).unwrap();

        let id = edit_project(&path, "tester", |p| Ok(p.add_item(depot()))).unwrap();
        let loaded = load_project(&path).unwrap();
        assert!(loaded.get_item(&id).is_some());
        assert!(FileLock::check(&path).is_none());

        let failed: CalcResult<()> = edit_project(&path, "tester", |p| {
            p.items.clear();
            Err(CalcError::ItemNotFound { id: "x".to_string() })
        });
        assert!(failed.is_err());
        assert_eq!(load_project(&path).unwrap().item_count(), 1);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_with_lock_check() {
        let path = temp_project_path("lock_check");
        save_project(&Project::new("Test", "Site", "Client"), &path).unwrap();

        let (loaded, lock_info) = load_project_with_lock_check(&path).unwrap();
        assert_eq!(loaded.meta.facility, "Site");
        assert!(lock_info.is_none());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_settings_partial() {
        let path = temp_dir().join(format!("ortcalc_settings_{}.json", std::process::id()));
        fs::write(&path, r#"{ "evacuation": { "singleStoreyStair": "excluded" } }"#).unwrap();
        let settings = load_settings(&path).unwrap();
        assert_eq!(
            settings.evacuation.single_storey_stair,
            crate::settings::StairSegmentRule::Excluded
        );
        assert_eq!(settings.ngps.large_area_threshold_m2, 10_000);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_settings_rejects_bad_policy() {
        let path = temp_dir().join(format!("ortcalc_bad_settings_{}.json", std::process::id()));
        fs::write(&path, r#"{ "ngps": { "largeAreaMinVehicles": 4000000000 } }"#).unwrap();
        let err = load_settings(&path).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        assert_eq!(err.field_errors()[0].field, "largeAreaMinVehicles");
        let _ = fs::remove_file(&path);
    }
}
