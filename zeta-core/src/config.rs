//! Session configuration, read from JSON.
//!
//! ```json
//! {
//!   "files": [
//!     { "path": "zzt.zip", "filenameMap": "zzt/", "readonly": true },
//!     { "path": "town.zip", "use83Names": true }
//!   ],
//!   "arg": "TOWN.ZZT",
//!   "storage": { "database": "zzt_saves", "root": "saves", "backend": "directory" },
//!   "mouseSensitivity": 4
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::archive::ArchiveOptions;
use crate::error::{ZetaError, ZetaResult};
use crate::fs::StorageOptions;
use crate::input::DEFAULT_MOUSE_SENSITIVITY;
use crate::scheduler::SchedulerConfig;

/// Conventional memory handed to the core, in KB.
pub const DEFAULT_MEMORY_LIMIT: u32 = 640;

/// Executables tried in order at session start.
pub const DEFAULT_EXECUTABLES: [&str; 2] = ["ZZT.EXE", "SUPERZ.EXE"];

/// One archive layered into storage, lowest precedence first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveSource {
    pub path: PathBuf,
    #[serde(flatten)]
    pub options: ArchiveOptions,
}

/// File shared by every key-value database under one storage root.
pub const KEY_VALUE_FILE: &str = "local_storage.json";

/// Where the persistent layer keeps its blobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageBackend {
    /// One file per save in `root/database/`.
    #[default]
    Directory,
    /// Encoded strings in `root/local_storage.json`, namespaced by database.
    KeyValue,
}

/// Writable storage persisted under `root`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentConfig {
    pub database: String,
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(flatten)]
    pub options: StorageOptions,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub files: Vec<ArchiveSource>,
    /// Command tail for the executable.
    pub arg: String,
    pub storage: Option<PersistentConfig>,
    pub mouse_sensitivity: i32,
    pub memory_limit: u32,
    pub extended_memory_limit: Option<u32>,
    pub executables: Vec<String>,
    pub scheduler: SchedulerConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            arg: String::new(),
            storage: None,
            mouse_sensitivity: DEFAULT_MOUSE_SENSITIVITY,
            memory_limit: DEFAULT_MEMORY_LIMIT,
            extended_memory_limit: None,
            executables: DEFAULT_EXECUTABLES.iter().map(|s| s.to_string()).collect(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> ZetaResult<Self> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file. Relative archive and storage paths are resolved
    /// against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> ZetaResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let mut config = Self::from_json(&json)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Make every relative path in this config relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for file in &mut self.files {
            if file.path.is_relative() {
                file.path = base.join(&file.path);
            }
        }
        if let Some(storage) = &mut self.storage {
            if storage.root.is_relative() {
                storage.root = base.join(&storage.root);
            }
        }
    }

    pub fn validate(&self) -> ZetaResult<()> {
        let invalid = |msg: String| Err(ZetaError::InvalidConfig(msg));

        if self.executables.is_empty() {
            return invalid("no executables listed".into());
        }
        if self.memory_limit == 0 {
            return invalid("memoryLimit must be positive".into());
        }
        if self.mouse_sensitivity < 1 {
            return invalid(format!(
                "mouseSensitivity must be at least 1, got {}",
                self.mouse_sensitivity
            ));
        }
        if let Some(storage) = &self.storage {
            if storage.database.is_empty() || storage.database.contains(['/', '\\']) {
                return invalid(format!("bad database name {:?}", storage.database));
            }
            if storage.backend == StorageBackend::KeyValue && storage.options.use_83_names {
                return invalid("keyValue storage does not support use83Names".into());
            }
        }

        let s = &self.scheduler;
        if s.min_budget == 0 || s.min_budget > s.max_budget {
            return invalid(format!(
                "budget bounds {}..{} are empty",
                s.min_budget, s.max_budget
            ));
        }
        if s.grow_ratio <= 1.0 || !(0.0..1.0).contains(&s.shrink_ratio) || s.shrink_ratio == 0.0 {
            return invalid("growRatio must exceed 1 and shrinkRatio lie in (0, 1)".into());
        }
        if s.fast_slice_ms > s.slow_slice_ms {
            return invalid("fastSliceMs exceeds slowSliceMs".into());
        }
        if s.timer_period_ms <= 0.0 {
            return invalid("timerPeriodMs must be positive".into());
        }
        Ok(())
    }
}
