//! Layered virtual storage for the emulated DOS filesystem.
//!
//! - `StorageProvider`: get/set/list/can_set over named blobs
//! - `MemoryStorage`: in-memory map, optionally with 8.3 aliases
//! - `KeyValueStorage`: blobs encoded into a flat string store (`JsonFileStore` on disk)
//! - `PersistentStorage`: async store drained into memory, written back in the background
//! - `CompositeStorage`: ordered stack of providers, last added wins

mod composite;
mod key_value;
mod memory;
mod persistent;
mod provider;
mod short_name;

pub use composite::CompositeStorage;
pub use key_value::{JsonFileStore, KeyValueStorage, KeyValueStore};
pub use memory::MemoryStorage;
pub use persistent::{drain, AsyncStore, DirectoryStore, PersistentStorage, WriteBack};
pub use provider::{KeyCase, StorageOptions, StorageProvider};
pub use short_name::{is_short_path, short_name, AliasTable, MAX_ALIAS_ATTEMPTS};
