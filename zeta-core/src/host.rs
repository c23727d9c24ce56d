//! The boundary between the harness and the emulation core.
//!
//! The core itself (CPU, DOS kernel, PIT, video) is opaque. It is driven
//! through [`EmulatorCore`] and calls back into the harness through
//! [`CoreHost`], which is passed to every entry point that may need it
//! instead of being registered globally. One host per session.

/// Result of one execution slice, as reported by the core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoreState {
    /// 0: The core stopped for good
    Halted,
    /// 1: Budget exhausted, more work pending
    Running,
    /// 2: Blocked until the next displayed frame
    AwaitingFrame,
    /// 3: Idle until the next timer tick
    AwaitingTimer,
    /// 4: Waiting on a programmed timer delay of the given length
    AwaitingPitDelay { ms: f64 },
}

impl CoreState {
    /// Decode a raw state code. Code 4 carries the delay separately.
    pub fn from_code(code: i32, pit_delay_ms: f64) -> Option<Self> {
        match code {
            0 => Some(Self::Halted),
            1 => Some(Self::Running),
            2 => Some(Self::AwaitingFrame),
            3 => Some(Self::AwaitingTimer),
            4 => Some(Self::AwaitingPitDelay { ms: pit_delay_ms }),
            _ => None,
        }
    }
}

/// Entry points of the emulation core.
pub trait EmulatorCore {
    /// Reset the machine with `memory_limit` KB of conventional memory.
    fn init(&mut self, memory_limit: u32);

    /// Extended memory, in KB.
    fn set_extended_memory_limit(&mut self, _limit: u32) {}

    /// Load the executable open under `handle`, with a DOS command tail.
    fn load_binary(&mut self, host: &mut dyn CoreHost, handle: i32, arg: &str);

    /// Run up to `budget` instructions.
    fn execute(&mut self, host: &mut dyn CoreHost, budget: u32) -> CoreState;

    /// A display frame was presented.
    fn mark_frame(&mut self);

    /// One period of the system timer elapsed.
    fn mark_timer_tick(&mut self);

    /// Time of day, in milliseconds since midnight.
    fn set_timer_offset(&mut self, ms_since_midnight: u32);

    fn video_mode(&self) -> u8;

    /// Guest memory; text video lives at [`TEXT_VRAM`].
    fn ram(&self) -> &[u8];

    fn key_down(&mut self, chr: u8, scancode: u8);
    fn key_up(&mut self, scancode: u8);
    fn modifier_set(&mut self, bits: u8);
    fn modifier_clear(&mut self, bits: u8);

    fn joy_axis(&mut self, _axis: u8, _value: i8) {}
    fn joy_button(&mut self, _button: u8, _pressed: bool) {}
    fn mouse_axis(&mut self, _axis: u8, _delta: i32) {}
    fn mouse_button(&mut self, _button: u8, _pressed: bool) {}
}

/// Start of 80x25 colour text memory inside guest RAM.
pub const TEXT_VRAM: usize = 0xB8000;
/// Bytes of text memory (character + attribute per cell).
pub const TEXT_VRAM_LEN: usize = 80 * 25 * 2;

/// Services the core calls back into.
///
/// File operations return the integer codes of the DOS layer (`-1` on
/// failure).
pub trait CoreHost {
    fn open(&mut self, name: &str, mode: i32) -> i32;
    fn read(&mut self, handle: i32, dst: &mut [u8]) -> i32;
    fn write(&mut self, handle: i32, src: &[u8]) -> i32;
    fn seek(&mut self, handle: i32, offset: i32, whence: i32) -> i32;
    fn truncate(&mut self, handle: i32, len: i32) -> i32;
    fn close(&mut self, handle: i32) -> i32;
    fn find_first(&mut self, buf: &mut [u8], mask: u16, pattern: &str) -> i32;
    fn find_next(&mut self, buf: &mut [u8]) -> i32;
    fn get_cwd(&mut self, buf: &mut [u8]) -> i32;
    fn chdir(&mut self, path: &str) -> i32;

    fn has_feature(&self, id: i32) -> bool;

    /// Host time in milliseconds, as sampled at the start of the current tick.
    fn now_millis(&self) -> i64;

    /// Font bitmap: 256 glyphs of `height` rows each.
    fn update_charset(&mut self, width: u32, height: u32, bitmap: &[u8]);
    /// 16 RGB palette entries.
    fn update_palette(&mut self, palette: &[u32]);
    fn update_blink(&mut self, blink: bool);

    fn speaker_on(&mut self, cycles: i32, freq: f64);
    fn speaker_off(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_codes() {
        assert_eq!(CoreState::from_code(0, 0.0), Some(CoreState::Halted));
        assert_eq!(CoreState::from_code(1, 0.0), Some(CoreState::Running));
        assert_eq!(CoreState::from_code(2, 0.0), Some(CoreState::AwaitingFrame));
        assert_eq!(CoreState::from_code(3, 0.0), Some(CoreState::AwaitingTimer));
        assert_eq!(
            CoreState::from_code(4, 12.5),
            Some(CoreState::AwaitingPitDelay { ms: 12.5 })
        );
        assert_eq!(CoreState::from_code(9, 0.0), None);
    }
}
