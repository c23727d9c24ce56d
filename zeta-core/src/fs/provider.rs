//! StorageProvider trait - named-blob backends for the DOS filesystem view.

use serde::{Deserialize, Serialize};

/// A backing store of named byte blobs.
///
/// Blobs handed out by `get` are always fresh copies; callers never see
/// provider-owned memory.
pub trait StorageProvider: Send + Sync {
    /// Read a blob. Returns None if the key does not exist.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Replace a blob. Returns false if this provider rejects the key.
    fn set(&mut self, key: &str, data: &[u8]) -> bool;

    /// List all keys (unordered).
    fn list(&self) -> Vec<String>;

    /// Check whether `set` would accept this key.
    fn can_set(&self, key: &str) -> bool;

    /// List keys accepted by `filter`.
    fn list_matching(&self, filter: &dyn Fn(&str) -> bool) -> Vec<String> {
        self.list().into_iter().filter(|key| filter(key)).collect()
    }

    /// Names already visible beneath this provider in a composite.
    /// Generated 8.3 aliases must not reuse them.
    fn reserve_names(&mut self, _names: &[String]) {}
}

impl<P: StorageProvider + ?Sized> StorageProvider for Box<P> {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, data: &[u8]) -> bool {
        (**self).set(key, data)
    }

    fn list(&self) -> Vec<String> {
        (**self).list()
    }

    fn can_set(&self, key: &str) -> bool {
        (**self).can_set(key)
    }

    fn reserve_names(&mut self, names: &[String]) {
        (**self).reserve_names(names)
    }
}

/// Case folding applied to keys before they reach the backing map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyCase {
    /// DOS style: every key is upper-cased.
    #[default]
    Upper,
    Lower,
    /// Keys are stored exactly as given.
    Preserve,
}

impl KeyCase {
    pub fn apply(self, key: &str) -> String {
        match self {
            KeyCase::Upper => key.to_uppercase(),
            KeyCase::Lower => key.to_lowercase(),
            KeyCase::Preserve => key.to_string(),
        }
    }
}

/// Per-provider key policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageOptions {
    #[serde(default, rename = "ignoreCase")]
    pub case: KeyCase,
    /// Expose long names under generated 8.3 aliases.
    #[serde(default, rename = "use83Names")]
    pub use_83_names: bool,
    #[serde(default)]
    pub readonly: bool,
}

impl StorageOptions {
    pub fn readonly() -> Self {
        Self {
            readonly: true,
            ..Self::default()
        }
    }

    pub fn with_case(mut self, case: KeyCase) -> Self {
        self.case = case;
        self
    }

    pub fn with_83_names(mut self) -> Self {
        self.use_83_names = true;
        self
    }
}
