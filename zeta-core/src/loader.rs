//! Assembles layered storage for a session from its config.

use std::io::Cursor;

use log::{info, warn};

use crate::archive::load_archive;
use crate::config::{PersistentConfig, SessionConfig, StorageBackend, KEY_VALUE_FILE};
use crate::error::ZetaResult;
use crate::fs::{
    drain, CompositeStorage, DirectoryStore, JsonFileStore, KeyValueStorage, MemoryStorage,
    StorageProvider, WriteBack,
};

/// Storage ready for a session, plus the flush handle of its persistent
/// layer if one was opened.
pub struct LoadedStorage {
    pub storage: CompositeStorage,
    pub write_back: Option<WriteBack>,
}

/// Build the storage stack: every configured archive in order, then one
/// writable layer on top.
///
/// Archive read or decode failures abort loading. If the persistent store
/// cannot be opened, a non-persistent in-memory layer takes its place.
pub async fn build_storage(config: &SessionConfig) -> ZetaResult<LoadedStorage> {
    let mut storage = CompositeStorage::new();

    for source in &config.files {
        let bytes = tokio::fs::read(&source.path).await?;
        let provider = load_archive(Cursor::new(bytes), &source.options)?;
        info!(
            "Loaded {} files from {}",
            provider.len(),
            source.path.display()
        );
        storage.push(provider);
    }

    let write_back = match &config.storage {
        Some(persistent) => match open_persistent(persistent).await {
            Ok((layer, write_back)) => {
                storage.push(layer);
                write_back
            }
            Err(e) => {
                warn!("Persistent storage unavailable, saves will not persist: {}", e);
                storage.push(MemoryStorage::with_options(persistent.options));
                None
            }
        },
        None => {
            storage.push(MemoryStorage::new());
            None
        }
    };

    Ok(LoadedStorage {
        storage,
        write_back,
    })
}

/// Open the configured persistent backend. Only the directory backend
/// writes in the background; key-value writes land on disk immediately.
async fn open_persistent(
    config: &PersistentConfig,
) -> ZetaResult<(Box<dyn StorageProvider>, Option<WriteBack>)> {
    match config.backend {
        StorageBackend::Directory => {
            let store = DirectoryStore::open(&config.root, &config.database).await?;
            let (layer, write_back) = drain(store, config.options).await?;
            Ok((Box::new(layer), Some(write_back)))
        }
        StorageBackend::KeyValue => {
            let store = JsonFileStore::open(config.root.join(KEY_VALUE_FILE)).await?;
            let layer = KeyValueStorage::new(store, &config.database, config.options)?;
            Ok((Box::new(layer), None))
        }
    }
}
