//! Persistent storage: an async backing store drained into a sync provider.
//!
//! Opening happens in two explicit phases. [`DirectoryStore::open`] (or any
//! other [`AsyncStore`]) yields the async store, then [`drain`] copies every
//! blob into memory and returns a [`PersistentStorage`] the emulation loop
//! can use without awaiting. Writes land in memory immediately and are
//! forwarded to the async store by a background task.

use std::future::Future;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::memory::MemoryStorage;
use super::provider::{StorageOptions, StorageProvider};
use crate::error::{ZetaError, ZetaResult};

/// Asynchronous blob store.
pub trait AsyncStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> impl Future<Output = Option<Vec<u8>>> + Send;
    fn set(&self, key: &str, data: Vec<u8>) -> impl Future<Output = bool> + Send;
    fn list(&self) -> impl Future<Output = Vec<String>> + Send;
}

/// Async store keeping one file per key in `<root>/<database>/`.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    /// Open (creating if needed) the directory for `database`.
    pub async fn open(root: impl AsRef<Path>, database: &str) -> ZetaResult<Self> {
        if !valid_key(database) {
            return Err(ZetaError::PersistentUnavailable(format!(
                "bad database name {:?}",
                database
            )));
        }
        let dir = root.as_ref().join(database);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ZetaError::PersistentUnavailable(format!("{}: {}", dir.display(), e)))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Keys map straight onto file names, so anything path-like is refused.
fn valid_key(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(['/', '\\', '\0'])
}

impl AsyncStore for DirectoryStore {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        if !valid_key(key) {
            return None;
        }
        tokio::fs::read(self.dir.join(key)).await.ok()
    }

    async fn set(&self, key: &str, data: Vec<u8>) -> bool {
        if !valid_key(key) {
            return false;
        }
        match tokio::fs::write(self.dir.join(key), data).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Persistent write of {} failed: {}", key, e);
                false
            }
        }
    }

    async fn list(&self) -> Vec<String> {
        let mut names = Vec::new();
        let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await else {
            return names;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if let (true, Some(name)) = (is_file, entry.file_name().to_str()) {
                names.push(name.to_string());
            }
        }
        names
    }
}

type Commit = (String, Vec<u8>);

/// Synchronous view of an [`AsyncStore`], filled by [`drain`].
pub struct PersistentStorage {
    inner: MemoryStorage,
    writer: mpsc::UnboundedSender<Commit>,
}

/// Handle on the background task forwarding commits to the async store.
pub struct WriteBack {
    task: JoinHandle<usize>,
}

impl WriteBack {
    /// Wait until every queued commit has been written.
    ///
    /// Completes once the owning [`PersistentStorage`] has been dropped.
    /// Returns the number of blobs written.
    pub async fn finish(self) -> ZetaResult<usize> {
        self.task
            .await
            .map_err(|e| ZetaError::PersistentUnavailable(e.to_string()))
    }
}

/// Copy every blob out of `store` and wrap it for synchronous use.
pub async fn drain<S: AsyncStore>(
    store: S,
    options: StorageOptions,
) -> ZetaResult<(PersistentStorage, WriteBack)> {
    let mut inner = MemoryStorage::with_options(StorageOptions {
        readonly: false,
        ..options
    });
    let keys = store.list().await;
    for key in &keys {
        if let Some(data) = store.get(key).await {
            inner.add_file(key, data);
        }
    }
    debug!("Drained {} persistent files", inner.len());

    let (writer, mut rx) = mpsc::unbounded_channel::<Commit>();
    let task = tokio::spawn(async move {
        let mut written = 0;
        while let Some((key, data)) = rx.recv().await {
            if store.set(&key, data).await {
                written += 1;
            }
        }
        written
    });

    let storage = PersistentStorage {
        inner,
        writer,
    };
    Ok((storage, WriteBack { task }))
}

impl StorageProvider for PersistentStorage {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.get(key)
    }

    /// Commits under the stored key, so a write through an 8.3 alias
    /// updates the long-named blob it stands for.
    fn set(&mut self, key: &str, data: &[u8]) -> bool {
        let Some(stored) = self.inner.store(key, data) else {
            return false;
        };
        if self.writer.send((stored.clone(), data.to_vec())).is_err() {
            warn!("Persistent writer stopped; {} kept in memory only", stored);
        }
        true
    }

    fn list(&self) -> Vec<String> {
        self.inner.list()
    }

    fn can_set(&self, key: &str) -> bool {
        self.inner.can_set(key)
    }

    fn reserve_names(&mut self, names: &[String]) {
        self.inner.reserve_names(names)
    }
}
