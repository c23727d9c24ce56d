//! In-memory storage provider.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use log::warn;

use super::provider::{StorageOptions, StorageProvider};
use super::short_name::{is_short_path, AliasTable};
use crate::error::ZetaResult;

/// Simple in-memory map of named blobs.
///
/// With `use_83_names`, long keys stay stored under their full name and are
/// exposed through aliases computed on first lookup.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    files: HashMap<String, Vec<u8>>,
    options: StorageOptions,
    /// Names owned by lower composite layers.
    reserved: HashSet<String>,
    aliases: OnceLock<AliasTable>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty provider with the given key policy.
    pub fn with_options(options: StorageOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Create with initial files.
    ///
    /// Fails if 8.3 aliasing is enabled and some long name cannot be given
    /// an alias.
    pub fn with_files<I, S>(files: I, options: StorageOptions) -> ZetaResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: AsRef<str>,
    {
        let files: HashMap<String, Vec<u8>> = files
            .into_iter()
            .map(|(k, v)| (options.case.apply(k.as_ref()), v))
            .collect();
        let aliases = OnceLock::new();
        if options.use_83_names {
            let _ = aliases.set(AliasTable::build(files.keys())?);
        }
        Ok(Self {
            files,
            options,
            aliases,
            ..Self::default()
        })
    }

    /// Add a file, bypassing the read-only flag.
    pub fn add_file(&mut self, name: &str, data: impl Into<Vec<u8>>) {
        self.insert(self.options.case.apply(name), data.into());
    }

    pub fn options(&self) -> StorageOptions {
        self.options
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn aliases(&self) -> &AliasTable {
        self.aliases.get_or_init(|| {
            AliasTable::build_reserving(self.files.keys(), &self.reserved).unwrap_or_else(|e| {
                warn!("8.3 aliasing disabled: {}", e);
                AliasTable::default()
            })
        })
    }

    /// Map an incoming (case-folded) key onto the stored key.
    fn stored_key(&self, key: String) -> String {
        if self.options.use_83_names {
            if let Some(long) = self.aliases().resolve(&key) {
                return long.to_string();
            }
        }
        key
    }

    /// Write `data` and return the key it was stored under, which is the
    /// long name when `key` is an alias. None if read-only.
    pub(crate) fn store(&mut self, key: &str, data: &[u8]) -> Option<String> {
        if self.options.readonly {
            return None;
        }
        let key = self.stored_key(self.options.case.apply(key));
        self.insert(key.clone(), data.to_vec());
        Some(key)
    }

    fn insert(&mut self, key: String, data: Vec<u8>) {
        let is_new_long_name =
            self.options.use_83_names && !is_short_path(&key) && !self.files.contains_key(&key);
        self.files.insert(key, data);
        if is_new_long_name {
            self.aliases = OnceLock::new();
        }
    }
}

impl StorageProvider for MemoryStorage {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let key = self.stored_key(self.options.case.apply(key));
        self.files.get(&key).cloned()
    }

    fn set(&mut self, key: &str, data: &[u8]) -> bool {
        self.store(key, data).is_some()
    }

    fn list(&self) -> Vec<String> {
        if !self.options.use_83_names {
            return self.files.keys().cloned().collect();
        }
        let aliases = self.aliases();
        self.files
            .keys()
            .map(|k| aliases.alias_of(k).unwrap_or(k).to_string())
            .collect()
    }

    fn can_set(&self, _key: &str) -> bool {
        !self.options.readonly
    }

    fn reserve_names(&mut self, names: &[String]) {
        if !self.options.use_83_names {
            return;
        }
        let case = self.options.case;
        self.reserved.extend(names.iter().map(|n| case.apply(n)));
        self.aliases = OnceLock::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::KeyCase;

    #[test]
    fn test_set_get() {
        let mut fs = MemoryStorage::new();
        assert!(fs.set("TOWN.ZZT", &[0x01, 0x02]));

        assert_eq!(fs.get("TOWN.ZZT"), Some(vec![0x01, 0x02]));
        assert_eq!(fs.get("town.zzt"), Some(vec![0x01, 0x02])); // upper-cased
        assert_eq!(fs.get("MISSING.ZZT"), None);
    }

    #[test]
    fn test_get_returns_copy() {
        let mut fs = MemoryStorage::new();
        fs.add_file("A.TXT", b"abc".to_vec());

        let mut copy = fs.get("A.TXT").unwrap();
        copy[0] = b'X';
        assert_eq!(fs.get("A.TXT"), Some(b"abc".to_vec()));
    }

    #[test]
    fn test_readonly_rejects_writes() {
        let mut fs = MemoryStorage::with_files([("A.TXT", vec![1])], StorageOptions::readonly())
            .unwrap();

        assert!(!fs.can_set("A.TXT"));
        assert!(!fs.can_set("NEW.TXT"));
        assert!(!fs.set("A.TXT", &[2]));
        assert!(!fs.set("NEW.TXT", &[2]));
        assert_eq!(fs.get("A.TXT"), Some(vec![1]));
    }

    #[test]
    fn test_case_policies() {
        let mut lower = MemoryStorage::with_options(StorageOptions::default().with_case(KeyCase::Lower));
        lower.set("Save.SAV", &[1]);
        assert_eq!(lower.list(), vec!["save.sav".to_string()]);

        let mut exact =
            MemoryStorage::with_options(StorageOptions::default().with_case(KeyCase::Preserve));
        exact.set("Save.SAV", &[1]);
        assert_eq!(exact.get("SAVE.SAV"), None);
        assert_eq!(exact.get("Save.SAV"), Some(vec![1]));
    }

    #[test]
    fn test_83_aliases() {
        let fs = MemoryStorage::with_files(
            [
                ("VeryLongNameA.zzt", vec![1]),
                ("VeryLongNameB.zzt", vec![2]),
                ("TOWN.ZZT", vec![3]),
            ],
            StorageOptions::default().with_83_names(),
        )
        .unwrap();

        let mut files = fs.list();
        files.sort();
        assert_eq!(files, vec!["TOWN.ZZT", "VERYLON~1.ZZT", "VERYLON~2.ZZT"]);
        assert_eq!(fs.get("verylon~2.zzt"), Some(vec![2]));
        assert_eq!(fs.get("VERYLONGNAMEA.ZZT"), Some(vec![1]));
    }

    #[test]
    fn test_83_write_through_alias() {
        let mut fs = MemoryStorage::with_files(
            [("LONGFILENAME.TXT", vec![1])],
            StorageOptions::default().with_83_names(),
        )
        .unwrap();

        assert!(fs.set("LONGFIL~1.TXT", &[9]));
        assert_eq!(fs.get("LONGFILENAME.TXT"), Some(vec![9]));
        assert_eq!(fs.len(), 1);
    }

    #[test]
    fn test_83_new_long_name_gets_alias() {
        let mut fs = MemoryStorage::with_options(StorageOptions::default().with_83_names());
        fs.set("LONGFILENAME.TXT", &[1]);
        assert_eq!(fs.list(), vec!["LONGFIL~1.TXT".to_string()]);
    }

    #[test]
    fn test_83_aliases_skip_reserved_names() {
        let mut fs = MemoryStorage::with_files(
            [("VERYLONGNAME.TXT", vec![1])],
            StorageOptions::default().with_83_names(),
        )
        .unwrap();
        fs.reserve_names(&["verylon~1.txt".to_string()]);

        assert_eq!(fs.list(), vec!["VERYLON~2.TXT".to_string()]);
        assert_eq!(fs.get("VERYLON~1.TXT"), None);
        assert_eq!(fs.store("VERYLON~2.TXT", &[2]).as_deref(), Some("VERYLONGNAME.TXT"));
    }
}
