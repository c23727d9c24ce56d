//! Open file handles and the per-session handle table.

use std::collections::BTreeMap;

use super::Whence;

/// One open file: a private copy of its bytes plus a cursor.
///
/// Handles on the same key never share state; each one commits its own
/// buffer on close, so the last writer to close wins.
#[derive(Debug, Clone)]
pub struct FileHandle {
    key: String,
    data: Vec<u8>,
    pos: usize,
    write_back: bool,
}

impl FileHandle {
    pub fn new(key: String, data: Vec<u8>, write_back: bool) -> Self {
        Self {
            key,
            data,
            pos: 0,
            write_back,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether close commits the buffer back to storage.
    pub fn write_back(&self) -> bool {
        self.write_back
    }

    /// Copy bytes at the cursor into `dst`. Returns the count copied.
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        let available = self.data.len().saturating_sub(self.pos);
        let len = dst.len().min(available);
        dst[..len].copy_from_slice(&self.data[self.pos..self.pos + len]);
        self.pos += len;
        len
    }

    /// Copy `src` in at the cursor, growing the buffer as needed.
    pub fn write(&mut self, src: &[u8]) -> usize {
        let end = self.pos + src.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].copy_from_slice(src);
        self.pos = end;
        src.len()
    }

    /// Move the cursor. The result is clamped to `0..=len`.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> usize {
        let base = match whence {
            Whence::Set => 0,
            Whence::Current => self.pos as i64,
            Whence::End => self.data.len() as i64,
        };
        let target = base.saturating_add(offset).clamp(0, self.data.len() as i64);
        self.pos = target as usize;
        self.pos
    }

    /// Cut or extend the file to `len` bytes.
    pub fn truncate(&mut self, len: usize) {
        self.data.resize(len, 0);
        self.pos = self.pos.min(len);
    }

    pub fn into_parts(self) -> (String, Vec<u8>, bool) {
        (self.key, self.data, self.write_back)
    }
}

/// Open handles keyed by small positive integers.
#[derive(Debug, Default)]
pub struct HandleTable {
    handles: BTreeMap<i32, FileHandle>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a handle under the lowest unused id (starting at 1).
    pub fn insert(&mut self, handle: FileHandle) -> i32 {
        let mut id = 1;
        for &used in self.handles.keys() {
            if used != id {
                break;
            }
            id += 1;
        }
        self.handles.insert(id, handle);
        id
    }

    pub fn get_mut(&mut self, id: i32) -> Option<&mut FileHandle> {
        self.handles.get_mut(&id)
    }

    pub fn remove(&mut self, id: i32) -> Option<FileHandle> {
        self.handles.remove(&id)
    }

    /// Remove every handle, in id order.
    pub fn drain(&mut self) -> impl Iterator<Item = FileHandle> {
        std::mem::take(&mut self.handles).into_values()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
