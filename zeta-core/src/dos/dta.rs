//! Find-data record written by find-first/find-next.
//!
//! Layout of the fields filled in (offsets into the core's buffer):
//! - 0x15: Attribute byte
//! - 0x16-0x17: File time
//! - 0x18-0x19: File date
//! - 0x1A-0x1D: File size (little-endian)
//! - 0x1E-0x2A: File name, NUL-terminated

/// Offset of the attribute byte.
pub const ATTRIBUTE: usize = 0x15;
/// Offset of the little-endian file size.
pub const SIZE: usize = 0x1A;
/// Offset of the NUL-terminated name.
pub const NAME: usize = 0x1E;
/// Bytes the core reserves for a find record.
pub const RECORD_LEN: usize = 0x100;

/// One directory entry as reported to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindRecord {
    pub name: String,
    pub size: u32,
}

impl FindRecord {
    /// Write this entry into a find-data buffer.
    ///
    /// Returns false if the buffer cannot hold the name and terminator.
    pub fn write_to(&self, buf: &mut [u8]) -> bool {
        let name = self.name.as_bytes();
        if buf.len() < NAME + name.len() + 1 {
            return false;
        }

        // Attribute, time and date are reported as zero.
        buf[ATTRIBUTE..SIZE].fill(0);
        buf[SIZE..SIZE + 4].copy_from_slice(&self.size.to_le_bytes());
        buf[NAME..NAME + name.len()].copy_from_slice(name);
        buf[NAME + name.len()] = 0;
        true
    }
}
