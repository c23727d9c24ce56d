//! DOS file services for the emulation core.
//!
//! The core calls these to open, read, write, seek and enumerate files.
//! Every call is answered from a [`CompositeStorage`](crate::fs::CompositeStorage)
//! through short-lived in-memory handles.

pub mod dta;
mod files;
mod handle;

pub use dta::FindRecord;
pub use files::DosFileSystem;
pub use handle::{FileHandle, HandleTable};

/// Open mode flags passed by the core.
pub mod open_mode {
    pub const READ: i32 = 0;
    pub const WRITE: i32 = 1;
    pub const READ_WRITE: i32 = 2;
    /// Mask selecting the access bits.
    pub const ACCESS_MASK: i32 = 0x3;
    /// Start from an empty file regardless of existing content.
    pub const TRUNCATE: i32 = 0x10000;
}

/// Access requested by an open call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    pub write: bool,
    pub truncate: bool,
}

impl OpenMode {
    pub const READ: OpenMode = OpenMode {
        write: false,
        truncate: false,
    };

    pub const WRITE: OpenMode = OpenMode {
        write: true,
        truncate: false,
    };

    /// Decode raw mode bits.
    ///
    /// Only write-only access commits on close. Read/write access (and the
    /// sharing bits the core passes through from AL) opens like a read.
    pub fn from_bits(mode: i32) -> Self {
        let access = mode & open_mode::ACCESS_MASK;
        Self {
            write: access == open_mode::WRITE,
            truncate: mode & open_mode::TRUNCATE != 0,
        }
    }
}

/// Seek origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Whence {
    /// 0: From start of file
    Set = 0,
    /// 1: From current position
    Current = 1,
    /// 2: From end of file
    End = 2,
}

impl TryFrom<i32> for Whence {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Set),
            1 => Ok(Self::Current),
            2 => Ok(Self::End),
            _ => Err(value),
        }
    }
}

/// Host feature ids queried by the core.
pub mod feature {
    pub const JOYSTICK_CONNECTED: i32 = 1;
    pub const MOUSE_CONNECTED: i32 = 2;
}
