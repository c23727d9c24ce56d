//! File operations requested by the core, answered from layered storage.

use log::{debug, trace, warn};

use super::dta::FindRecord;
use super::handle::{FileHandle, HandleTable};
use super::{OpenMode, Whence};
use crate::fs::{CompositeStorage, StorageProvider};

/// DOS-style file services over a [`CompositeStorage`].
///
/// All methods return the integer codes the core expects: a handle id or
/// byte count on success, `-1` on failure.
#[derive(Default)]
pub struct DosFileSystem {
    storage: CompositeStorage,
    handles: HandleTable,
    /// Directory search state.
    search_entries: Vec<String>,
    search_index: usize,
}

impl DosFileSystem {
    pub fn new(storage: CompositeStorage) -> Self {
        Self {
            storage,
            ..Self::default()
        }
    }

    pub fn storage(&self) -> &CompositeStorage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut CompositeStorage {
        &mut self.storage
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    /// Open a file. Names are upper-cased before lookup.
    ///
    /// Read access needs an existing file. Write access needs a layer that
    /// accepts the name; a missing file (or truncate) starts empty.
    pub fn open(&mut self, name: &str, mode: i32) -> i32 {
        let key = name.to_uppercase();
        let mode = OpenMode::from_bits(mode);
        let existing = self.storage.get(&key);

        let data = if mode.write {
            if !self.storage.can_set(&key) {
                debug!("open {} for write refused", key);
                return -1;
            }
            match existing {
                Some(data) if !mode.truncate => data,
                _ => Vec::new(),
            }
        } else {
            match existing {
                Some(data) => data,
                None => return -1,
            }
        };

        let id = self.handles.insert(FileHandle::new(key, data, mode.write));
        debug!("opened {} as {} (write: {})", name, id, mode.write);
        id
    }

    /// Close a handle, committing its buffer if it was opened for writing.
    pub fn close(&mut self, handle: i32) -> i32 {
        let Some(file) = self.handles.remove(handle) else {
            return -1;
        };
        let (key, data, write_back) = file.into_parts();
        if write_back && !self.storage.set(&key, &data) {
            warn!("commit of {} rejected by every storage layer", key);
        }
        0
    }

    /// Close every handle, committing writable ones.
    pub fn close_all(&mut self) {
        for file in self.handles.drain() {
            let (key, data, write_back) = file.into_parts();
            if write_back && !self.storage.set(&key, &data) {
                warn!("commit of {} rejected by every storage layer", key);
            }
        }
    }

    pub fn read(&mut self, handle: i32, dst: &mut [u8]) -> i32 {
        match self.handles.get_mut(handle) {
            Some(file) => {
                let count = file.read(dst);
                trace!("read {} bytes from {}", count, handle);
                count as i32
            }
            None => -1,
        }
    }

    pub fn write(&mut self, handle: i32, src: &[u8]) -> i32 {
        match self.handles.get_mut(handle) {
            Some(file) => {
                let count = file.write(src);
                trace!("wrote {} bytes to {}", count, handle);
                count as i32
            }
            None => -1,
        }
    }

    pub fn seek(&mut self, handle: i32, offset: i32, whence: i32) -> i32 {
        let (Some(file), Ok(whence)) = (self.handles.get_mut(handle), Whence::try_from(whence))
        else {
            return -1;
        };
        file.seek(offset as i64, whence);
        0
    }

    pub fn truncate(&mut self, handle: i32, len: i32) -> i32 {
        match (self.handles.get_mut(handle), usize::try_from(len)) {
            (Some(file), Ok(len)) => {
                file.truncate(len);
                0
            }
            _ => -1,
        }
    }

    /// Files matching a single-wildcard pattern (`*.ZZT`, `*`), in DOS order:
    /// shorter names first, then alphabetical.
    ///
    /// Returns None for patterns this harness cannot evaluate.
    pub fn list_pattern(&self, pattern: &str) -> Option<Vec<String>> {
        let pattern = pattern.to_uppercase();
        let mut files = match pattern.as_str() {
            "*" | "*.*" => self.storage.list(),
            _ => {
                let suffix = pattern.strip_prefix('*')?;
                if suffix.contains(['*', '?']) {
                    return None;
                }
                self.storage.list_matching(&|key| key.ends_with(suffix))
            }
        };
        files.sort_by(|a, b| {
            a.chars()
                .count()
                .cmp(&b.chars().count())
                .then_with(|| a.cmp(b))
        });
        Some(files)
    }

    /// Start a directory search and report the first match into `buf`.
    pub fn find_first(&mut self, buf: &mut [u8], _mask: u16, pattern: &str) -> i32 {
        self.search_entries.clear();
        self.search_index = 0;
        match self.list_pattern(pattern) {
            Some(files) => {
                self.search_entries = files;
                self.find_next(buf)
            }
            None => {
                debug!("unknown find pattern: {}", pattern);
                -1
            }
        }
    }

    /// Report the next match of the current search into `buf`.
    pub fn find_next(&mut self, buf: &mut [u8]) -> i32 {
        let Some(name) = self.search_entries.get(self.search_index) else {
            return -1;
        };
        let size = self.storage.get(name).map(|d| d.len()).unwrap_or(0);
        let record = FindRecord {
            name: name.clone(),
            size: u32::try_from(size).unwrap_or(u32::MAX),
        };
        self.search_index += 1;
        if record.write_to(buf) {
            0
        } else {
            -1
        }
    }

    /// Current directory: always the root, reported as an empty string.
    pub fn get_cwd(&self, buf: &mut [u8]) -> i32 {
        if let Some(first) = buf.first_mut() {
            *first = 0;
        }
        0
    }

    /// Directory changes are not supported.
    pub fn chdir(&mut self, path: &str) -> i32 {
        debug!("chdir {} refused", path);
        -1
    }
}
