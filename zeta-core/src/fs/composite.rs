//! Layered storage: an ordered stack of providers behind one lookup facade.

use super::provider::StorageProvider;

/// Ordered stack of providers.
///
/// - Reads come from the most recently added provider that has the key
/// - Writes go to the most recently added provider that accepts them
/// - Listing is the sorted, deduplicated union of every layer
///
/// Archives loaded later shadow earlier ones; writable storage is normally
/// pushed last so it overlays the read-only layers beneath it.
#[derive(Default)]
pub struct CompositeStorage {
    providers: Vec<Box<dyn StorageProvider>>,
}

impl CompositeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from providers in precedence order (last wins).
    pub fn with_providers(providers: Vec<Box<dyn StorageProvider>>) -> Self {
        let mut storage = Self::new();
        for provider in providers {
            storage.push_boxed(provider);
        }
        storage
    }

    /// Add a provider on top of the stack.
    ///
    /// Names already listed by the layers beneath are reserved in the new
    /// provider, so its 8.3 aliases never shadow them.
    pub fn push(&mut self, provider: impl StorageProvider + 'static) {
        self.push_boxed(Box::new(provider));
    }

    fn push_boxed(&mut self, mut provider: Box<dyn StorageProvider>) {
        if !self.providers.is_empty() {
            provider.reserve_names(&self.list());
        }
        self.providers.push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl StorageProvider for CompositeStorage {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.providers.iter().rev().find_map(|p| p.get(key))
    }

    fn set(&mut self, key: &str, data: &[u8]) -> bool {
        self.providers.iter_mut().rev().any(|p| p.set(key, data))
    }

    fn list(&self) -> Vec<String> {
        let mut files: Vec<String> = self.providers.iter().flat_map(|p| p.list()).collect();
        files.sort();
        files.dedup();
        files
    }

    fn can_set(&self, key: &str) -> bool {
        self.providers.iter().any(|p| p.can_set(key))
    }

    fn reserve_names(&mut self, names: &[String]) {
        for provider in &mut self.providers {
            provider.reserve_names(names);
        }
    }

    fn list_matching(&self, filter: &dyn Fn(&str) -> bool) -> Vec<String> {
        let mut files: Vec<String> = self
            .providers
            .iter()
            .flat_map(|p| p.list_matching(filter))
            .collect();
        files.sort();
        files.dedup();
        files
    }
}

#[cfg(test)]
mod tests {
    use super::super::{MemoryStorage, StorageOptions};
    use super::*;

    fn layer(files: &[(&str, &[u8])], options: StorageOptions) -> MemoryStorage {
        MemoryStorage::with_files(files.iter().map(|(k, v)| (*k, v.to_vec())), options).unwrap()
    }

    #[test]
    fn test_last_added_wins() {
        let mut fs = CompositeStorage::new();
        fs.push(layer(&[("K.TXT", b"first")], StorageOptions::default()));
        fs.push(layer(&[("K.TXT", b"second")], StorageOptions::default()));

        assert_eq!(fs.get("K.TXT"), Some(b"second".to_vec()));
    }

    #[test]
    fn test_falls_through_to_lower_layer() {
        let mut fs = CompositeStorage::new();
        fs.push(layer(&[("BASE.TXT", b"base")], StorageOptions::readonly()));
        fs.push(MemoryStorage::new());

        assert_eq!(fs.get("BASE.TXT"), Some(b"base".to_vec()));
        assert_eq!(fs.get("MISSING.TXT"), None);
    }

    #[test]
    fn test_list_dedup_sorted() {
        let mut fs = CompositeStorage::new();
        fs.push(layer(&[("A", b"1"), ("C", b"2")], StorageOptions::default()));
        fs.push(layer(&[("B", b"3"), ("A", b"4")], StorageOptions::default()));

        assert_eq!(fs.list(), vec!["A", "B", "C"]);
        assert_eq!(fs.list_matching(&|k| k != "B"), vec!["A", "C"]);
    }

    #[test]
    fn test_write_goes_to_top_writable_layer() {
        let mut fs = CompositeStorage::new();
        fs.push(MemoryStorage::new());
        fs.push(layer(&[("GAME.ZZT", b"orig")], StorageOptions::readonly()));

        assert!(fs.can_set("GAME.ZZT"));
        assert!(fs.set("GAME.ZZT", b"saved"));

        // The read-only archive still shadows the writable layer beneath it.
        assert_eq!(fs.get("GAME.ZZT"), Some(b"orig".to_vec()));
        assert_eq!(fs.get("OTHER.ZZT"), None);
    }

    #[test]
    fn test_aliases_avoid_lower_layer_names() {
        let mut fs = CompositeStorage::new();
        fs.push(layer(&[("VERYLON~1.TXT", b"real")], StorageOptions::readonly()));
        fs.push(layer(
            &[("VERYLONGNAME.TXT", b"long")],
            StorageOptions::readonly().with_83_names(),
        ));

        assert_eq!(fs.list(), vec!["VERYLON~1.TXT", "VERYLON~2.TXT"]);
        assert_eq!(fs.get("VERYLON~1.TXT"), Some(b"real".to_vec()));
        assert_eq!(fs.get("VERYLON~2.TXT"), Some(b"long".to_vec()));
    }

    #[test]
    fn test_all_readonly_rejects() {
        let mut fs = CompositeStorage::new();
        fs.push(layer(&[("A.TXT", b"a")], StorageOptions::readonly()));

        assert!(!fs.can_set("A.TXT"));
        assert!(!fs.set("A.TXT", b"b"));
        assert!(!CompositeStorage::new().can_set("A.TXT"));
    }
}
