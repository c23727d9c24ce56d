//! One emulator session: the core, the host services it calls back into,
//! and the scheduler driving it.

use log::{debug, info};

use crate::config::SessionConfig;
use crate::display::{Display, Speaker};
use crate::dos::{feature, open_mode, DosFileSystem};
use crate::error::{ZetaError, ZetaResult};
use crate::host::{CoreHost, EmulatorCore, TEXT_VRAM, TEXT_VRAM_LEN};
use crate::input::{self, GamepadState};
use crate::scheduler::{Clock, Scheduler, TickOutcome};

/// Message shown once the core halts.
pub const HALT_MESSAGE: &str = "Emulation stopped.";

const MS_PER_DAY: i64 = 86_400_000;

/// Host services for one core: files, display, speaker and time.
pub struct Harness<D: Display, S: Speaker> {
    fs: DosFileSystem,
    display: D,
    speaker: S,
    focused: bool,
    /// Wall time sampled at the start of the current tick.
    time_ms: f64,
}

impl<D: Display, S: Speaker> Harness<D, S> {
    pub fn new(fs: DosFileSystem, display: D, speaker: S) -> Self {
        Self {
            fs,
            display,
            speaker,
            focused: true,
            time_ms: 0.0,
        }
    }

    pub fn fs(&self) -> &DosFileSystem {
        &self.fs
    }

    pub fn fs_mut(&mut self) -> &mut DosFileSystem {
        &mut self.fs
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn speaker(&self) -> &S {
        &self.speaker
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Track host window focus. Losing focus silences the speaker.
    pub fn set_focus(&mut self, focused: bool) {
        self.focused = focused;
        if !focused {
            self.speaker.off();
        }
    }

    pub fn time_ms(&self) -> f64 {
        self.time_ms
    }

    pub fn set_time(&mut self, ms: f64) {
        self.time_ms = ms;
    }

    pub fn into_fs(self) -> DosFileSystem {
        self.fs
    }
}

impl<D: Display, S: Speaker> CoreHost for Harness<D, S> {
    fn open(&mut self, name: &str, mode: i32) -> i32 {
        self.fs.open(name, mode)
    }

    fn read(&mut self, handle: i32, dst: &mut [u8]) -> i32 {
        self.fs.read(handle, dst)
    }

    fn write(&mut self, handle: i32, src: &[u8]) -> i32 {
        self.fs.write(handle, src)
    }

    fn seek(&mut self, handle: i32, offset: i32, whence: i32) -> i32 {
        self.fs.seek(handle, offset, whence)
    }

    fn truncate(&mut self, handle: i32, len: i32) -> i32 {
        self.fs.truncate(handle, len)
    }

    fn close(&mut self, handle: i32) -> i32 {
        self.fs.close(handle)
    }

    fn find_first(&mut self, buf: &mut [u8], mask: u16, pattern: &str) -> i32 {
        self.fs.find_first(buf, mask, pattern)
    }

    fn find_next(&mut self, buf: &mut [u8]) -> i32 {
        self.fs.find_next(buf)
    }

    fn get_cwd(&mut self, buf: &mut [u8]) -> i32 {
        self.fs.get_cwd(buf)
    }

    fn chdir(&mut self, path: &str) -> i32 {
        self.fs.chdir(path)
    }

    fn has_feature(&self, id: i32) -> bool {
        matches!(id, feature::JOYSTICK_CONNECTED | feature::MOUSE_CONNECTED)
    }

    fn now_millis(&self) -> i64 {
        self.time_ms as i64
    }

    fn update_charset(&mut self, width: u32, height: u32, bitmap: &[u8]) {
        let len = (256 * height as usize).min(bitmap.len());
        self.display.set_charset(width, height, &bitmap[..len]);
    }

    fn update_palette(&mut self, palette: &[u32]) {
        let len = palette.len().min(16);
        self.display.set_palette(&palette[..len]);
    }

    fn update_blink(&mut self, blink: bool) {
        self.display.set_blink(blink);
    }

    fn speaker_on(&mut self, cycles: i32, freq: f64) {
        if !self.focused {
            self.speaker.off();
            return;
        }
        self.speaker.on(cycles, freq);
    }

    fn speaker_off(&mut self) {
        self.speaker.off();
    }
}

/// A running core with its harness and scheduler.
pub struct Session<C, D, S, K>
where
    C: EmulatorCore,
    D: Display,
    S: Speaker,
    K: Clock,
{
    core: C,
    harness: Harness<D, S>,
    scheduler: Scheduler,
    clock: K,
    mouse_sensitivity: i32,
    gamepads: Vec<GamepadState>,
}

impl<C, D, S, K> Session<C, D, S, K>
where
    C: EmulatorCore,
    D: Display,
    S: Speaker,
    K: Clock,
{
    /// Initialize the core and load the first executable found.
    ///
    /// The executable handle is closed once the core has loaded it, and the
    /// core's clock is set to the host's time of day.
    pub fn start(
        mut core: C,
        mut harness: Harness<D, S>,
        clock: K,
        config: &SessionConfig,
    ) -> ZetaResult<Self> {
        core.init(config.memory_limit);
        if let Some(limit) = config.extended_memory_limit {
            core.set_extended_memory_limit(limit);
        }

        let handle = config
            .executables
            .iter()
            .map(|name| (name, harness.open(name, open_mode::READ)))
            .find(|(_, handle)| *handle >= 0);
        let Some((name, handle)) = handle else {
            return Err(ZetaError::ExecutableNotFound(config.executables.clone()));
        };
        info!("Loading {}", name);
        core.load_binary(&mut harness, handle, &config.arg);
        harness.close(handle);

        let now = clock.now_ms();
        core.set_timer_offset((now as i64).rem_euclid(MS_PER_DAY) as u32);

        let mut scheduler = Scheduler::new(config.scheduler.clone());
        scheduler.reset_timer(clock.now_ms());
        harness.set_time(now);

        Ok(Self {
            core,
            harness,
            scheduler,
            clock,
            mouse_sensitivity: config.mouse_sensitivity,
            gamepads: Vec::new(),
        })
    }

    /// Run one scheduler tick.
    pub fn tick(&mut self) -> TickOutcome {
        let was_halted = self.scheduler.is_halted();
        let now = self.clock.now_ms();
        self.harness.set_time(now);

        let outcome = self
            .scheduler
            .tick(now, &self.clock, &mut self.core, &mut self.harness);

        if !was_halted && self.scheduler.is_halted() {
            info!("{}", HALT_MESSAGE);
            self.harness.display_mut().show_error(HALT_MESSAGE);
        }
        outcome
    }

    /// Present a frame: poll input, draw text memory, tell the core.
    pub fn frame(&mut self) {
        input::apply_gamepads(&mut self.core, &self.gamepads);

        let vram = self
            .core
            .ram()
            .get(TEXT_VRAM..TEXT_VRAM + TEXT_VRAM_LEN)
            .unwrap_or_default();
        self.harness
            .display
            .render(vram, self.core.video_mode(), self.harness.time_ms);

        self.core.mark_frame();
        self.scheduler.frame_rendered();
    }

    /// A render has been requested and not yet presented.
    pub fn frame_queued(&self) -> bool {
        self.scheduler.frame_queued()
    }

    pub fn is_halted(&self) -> bool {
        self.scheduler.is_halted()
    }

    pub fn key_down(&mut self, key: &str, key_code: u32) -> bool {
        input::key_down(&mut self.core, key, key_code)
    }

    pub fn key_up(&mut self, key: &str) -> bool {
        input::key_up(&mut self.core, key)
    }

    pub fn mouse_motion(&mut self, dx: i32, dy: i32) {
        input::apply_mouse_motion(&mut self.core, dx, dy, self.mouse_sensitivity);
    }

    pub fn mouse_button(&mut self, button: u8, pressed: bool) {
        self.core.mouse_button(button, pressed);
    }

    /// Latest gamepad snapshot, fed to the core on the next frame.
    pub fn set_gamepads(&mut self, pads: Vec<GamepadState>) {
        self.gamepads = pads;
    }

    pub fn set_focus(&mut self, focused: bool) {
        debug!("focus: {}", focused);
        self.harness.set_focus(focused);
    }

    pub fn core(&self) -> &C {
        &self.core
    }

    pub fn harness(&self) -> &Harness<D, S> {
        &self.harness
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// End the session, committing any files the core left open.
    pub fn into_fs(self) -> DosFileSystem {
        let mut fs = self.harness.into_fs();
        fs.close_all();
        fs
    }
}
