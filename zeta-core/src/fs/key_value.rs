//! Provider over a flat string key-value store.
//!
//! Blobs are stored under `"{database}_file_{KEY}"` as comma-separated
//! decimal bytes, so several databases can share one store.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::provider::{StorageOptions, StorageProvider};
use crate::error::{ZetaError, ZetaResult};

/// Synchronous string store (a browser `localStorage` or anything shaped like it).
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&mut self, key: &str, value: String);
    fn keys(&self) -> Vec<String>;
}

impl KeyValueStore for BTreeMap<String, String> {
    fn get_item(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: String) {
        self.insert(key.to_string(), value);
    }

    fn keys(&self) -> Vec<String> {
        BTreeMap::keys(self).cloned().collect()
    }
}

/// [`KeyValueStore`] kept as one JSON object on disk, rewritten after
/// every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    items: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Load `path`, starting empty when it does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> ZetaResult<Self> {
        let path = path.into();
        let unavailable =
            |e: String| ZetaError::PersistentUnavailable(format!("{}: {}", path.display(), e));

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| unavailable(e.to_string()))?;
        }
        let items = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text).map_err(|e| unavailable(e.to_string()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(unavailable(e.to_string())),
        };
        debug!("Opened {} with {} items", path.display(), items.len());
        Ok(Self { path, items })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get_item(key)
    }

    fn set_item(&mut self, key: &str, value: String) {
        self.items.set_item(key, value);
        let written = serde_json::to_string(&self.items)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&self.path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            warn!("Writing {} failed: {}", self.path.display(), e);
        }
    }

    fn keys(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }
}

/// Storage provider namespaced inside a [`KeyValueStore`].
pub struct KeyValueStorage<S: KeyValueStore> {
    store: S,
    prefix: String,
    options: StorageOptions,
}

impl<S: KeyValueStore> KeyValueStorage<S> {
    /// Fails for `use_83_names`: keys are stored exactly as the guest
    /// names them, so there are no long names to alias.
    pub fn new(store: S, database: &str, options: StorageOptions) -> ZetaResult<Self> {
        if options.use_83_names {
            return Err(ZetaError::InvalidConfig(
                "key-value storage does not support use83Names".into(),
            ));
        }
        Ok(Self {
            store,
            prefix: format!("{}_file_", database),
            options,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

fn encode(data: &[u8]) -> String {
    data.iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn decode(key: &str, text: &str) -> Option<Vec<u8>> {
    if text.is_empty() {
        return Some(Vec::new());
    }
    match text.split(',').map(|s| s.trim().parse::<u8>()).collect() {
        Ok(data) => Some(data),
        Err(e) => {
            warn!("Corrupt stored value for {}: {}", key, e);
            None
        }
    }
}

impl<S: KeyValueStore> StorageProvider for KeyValueStorage<S> {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let key = self.options.case.apply(key);
        let text = self.store.get_item(&format!("{}{}", self.prefix, key))?;
        decode(&key, &text)
    }

    fn set(&mut self, key: &str, data: &[u8]) -> bool {
        if self.options.readonly {
            return false;
        }
        let key = self.options.case.apply(key);
        self.store
            .set_item(&format!("{}{}", self.prefix, key), encode(data));
        true
    }

    fn list(&self) -> Vec<String> {
        self.store
            .keys()
            .into_iter()
            .filter_map(|k| k.strip_prefix(&self.prefix).map(|s| s.to_string()))
            .collect()
    }

    fn can_set(&self, _key: &str) -> bool {
        !self.options.readonly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_store() {
        let mut fs =
            KeyValueStorage::new(BTreeMap::new(), "zzt", StorageOptions::default()).unwrap();
        assert!(fs.set("save1.sav", &[0, 7, 255]));

        assert_eq!(fs.get("SAVE1.SAV"), Some(vec![0, 7, 255]));
        assert_eq!(
            fs.store().get_item("zzt_file_SAVE1.SAV"),
            Some("0,7,255".to_string())
        );
    }

    #[test]
    fn test_list_only_own_database() {
        let mut store = BTreeMap::new();
        store.insert("zzt_file_A.SAV".to_string(), "1".to_string());
        store.insert("superz_file_B.SAV".to_string(), "2".to_string());
        store.insert("unrelated".to_string(), "x".to_string());

        let fs = KeyValueStorage::new(store, "zzt", StorageOptions::default()).unwrap();
        assert_eq!(fs.list(), vec!["A.SAV"]);
    }

    #[test]
    fn test_empty_and_corrupt_values() {
        let mut store = BTreeMap::new();
        store.insert("zzt_file_EMPTY".to_string(), String::new());
        store.insert("zzt_file_BAD".to_string(), "1,x,3".to_string());

        let fs = KeyValueStorage::new(store, "zzt", StorageOptions::default()).unwrap();
        assert_eq!(fs.get("EMPTY"), Some(Vec::new()));
        assert_eq!(fs.get("BAD"), None);
        assert_eq!(fs.get("MISSING"), None);
    }

    #[test]
    fn test_83_names_rejected() {
        let options = StorageOptions::default().with_83_names();
        let result = KeyValueStorage::new(BTreeMap::new(), "zzt", options);
        assert!(matches!(result, Err(ZetaError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_json_file_store_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("kv").join("local_storage.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        let mut fs = KeyValueStorage::new(store, "zzt", StorageOptions::default()).unwrap();
        assert!(fs.set("slot.sav", &[1, 2]));

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, r#"{"zzt_file_SLOT.SAV":"1,2"}"#);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let fs = KeyValueStorage::new(reopened, "zzt", StorageOptions::default()).unwrap();
        assert_eq!(fs.get("SLOT.SAV"), Some(vec![1, 2]));
    }

    #[tokio::test]
    async fn test_json_file_store_rejects_garbage() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("local_storage.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path).await,
            Err(ZetaError::PersistentUnavailable(_))
        ));
    }

    #[test]
    fn test_readonly() {
        let mut fs =
            KeyValueStorage::new(BTreeMap::new(), "zzt", StorageOptions::readonly()).unwrap();
        assert!(!fs.can_set("A"));
        assert!(!fs.set("A", &[1]));
        assert!(fs.list().is_empty());
    }
}
