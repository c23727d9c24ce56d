//! ZZT / Super ZZT emulator harness core
//!
//! This crate hosts an opaque DOS emulation core:
//! - Layered virtual storage (memory, zip archives, persistent stores)
//! - DOS file services answered from that storage
//! - Adaptive scheduler pacing the core against wall-clock time
//! - Input translation and display/speaker callbacks
//!
//! # Architecture
//!
//! The harness uses a layered design:
//! - `StorageProvider` trait: one backing store of named blobs
//! - `CompositeStorage`: overlay stack of providers
//! - `EmulatorCore` / `CoreHost` traits: the two directions across the core boundary
//! - `Session`: one core, its `Harness`, and its `Scheduler`
//! - `runner::run`: drives a session on tokio until the core halts

pub mod archive;
pub mod config;
pub mod display;
pub mod dos;
pub mod error;
pub mod fs;
pub mod host;
pub mod input;
pub mod loader;
pub mod runner;
pub mod scheduler;
pub mod session;

#[cfg(test)]
mod test_support;

pub use archive::{
    load_archive, load_archive_from_path, load_archive_with, ArchiveOptions, FilenameMap,
};
pub use config::{ArchiveSource, PersistentConfig, SessionConfig, StorageBackend};
pub use display::{Display, HeadlessDisplay, HeadlessSpeaker, Speaker};
pub use dos::DosFileSystem;
pub use error::{ZetaError, ZetaResult};
pub use fs::{CompositeStorage, MemoryStorage, StorageOptions, StorageProvider};
pub use host::{CoreHost, CoreState, EmulatorCore};
pub use loader::{build_storage, LoadedStorage};
pub use runner::{run, RunStats, TokioClock};
pub use scheduler::{Clock, ManualClock, Scheduler, SchedulerConfig, Step, SystemClock};
pub use session::{Harness, Session};
