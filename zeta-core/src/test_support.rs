//! Scripted core and host fixtures shared by unit tests.

use std::collections::VecDeque;

use crate::display::{HeadlessDisplay, HeadlessSpeaker};
use crate::dos::{open_mode, DosFileSystem};
use crate::host::{CoreHost, CoreState, EmulatorCore, TEXT_VRAM, TEXT_VRAM_LEN};
use crate::scheduler::ManualClock;
use crate::session::Harness;

pub(crate) fn null_harness() -> Harness<HeadlessDisplay, HeadlessSpeaker> {
    Harness::new(
        DosFileSystem::default(),
        HeadlessDisplay::new(),
        HeadlessSpeaker::default(),
    )
}

/// Core that replays queued states and records every call.
pub(crate) struct ScriptedCore {
    clock: ManualClock,
    script: VecDeque<CoreState>,
    /// State returned once the script runs out.
    pub fallback: CoreState,
    /// Wall time each execute call consumes.
    pub cost_ms: f64,
    /// Written through the host on the next execute.
    pub save_on_execute: Option<(String, Vec<u8>)>,
    ram: Vec<u8>,

    pub budgets: Vec<u32>,
    pub timer_ticks: usize,
    pub frames: usize,
    pub timer_offset: Option<u32>,
    pub memory: Option<(u32, Option<u32>)>,
    pub loaded: Option<Vec<u8>>,
    pub arg: String,
    pub keys: Vec<(u8, u8)>,
    pub mouse: Vec<(u8, i32)>,
    pub joy: Vec<(u8, i8)>,
}

impl ScriptedCore {
    pub fn new(clock: ManualClock) -> Self {
        let mut ram = vec![0u8; TEXT_VRAM + TEXT_VRAM_LEN];
        for cell in ram[TEXT_VRAM..].chunks_exact_mut(2) {
            cell[0] = b'Z';
            cell[1] = 0x1F;
        }
        Self {
            clock,
            script: VecDeque::new(),
            fallback: CoreState::Running,
            cost_ms: 0.0,
            save_on_execute: None,
            ram,
            budgets: Vec::new(),
            timer_ticks: 0,
            frames: 0,
            timer_offset: None,
            memory: None,
            loaded: None,
            arg: String::new(),
            keys: Vec::new(),
            mouse: Vec::new(),
            joy: Vec::new(),
        }
    }

    pub fn push(&mut self, state: CoreState) {
        self.script.push_back(state);
    }
}

impl EmulatorCore for ScriptedCore {
    fn init(&mut self, memory_limit: u32) {
        self.memory = Some((memory_limit, None));
    }

    fn set_extended_memory_limit(&mut self, limit: u32) {
        if let Some((_, extended)) = &mut self.memory {
            *extended = Some(limit);
        }
    }

    fn load_binary(&mut self, host: &mut dyn CoreHost, handle: i32, arg: &str) {
        let mut image = Vec::new();
        let mut buf = [0u8; 4];
        loop {
            let n = host.read(handle, &mut buf);
            if n <= 0 {
                break;
            }
            image.extend_from_slice(&buf[..n as usize]);
        }
        self.loaded = Some(image);
        self.arg = arg.to_string();
    }

    fn execute(&mut self, host: &mut dyn CoreHost, budget: u32) -> CoreState {
        self.budgets.push(budget);
        self.clock.advance(self.cost_ms);
        if let Some((name, data)) = self.save_on_execute.take() {
            let handle = host.open(&name, open_mode::WRITE);
            host.write(handle, &data);
            host.close(handle);
        }
        self.script.pop_front().unwrap_or(self.fallback)
    }

    fn mark_frame(&mut self) {
        self.frames += 1;
    }

    fn mark_timer_tick(&mut self) {
        self.timer_ticks += 1;
    }

    fn set_timer_offset(&mut self, ms_since_midnight: u32) {
        self.timer_offset = Some(ms_since_midnight);
    }

    fn video_mode(&self) -> u8 {
        3
    }

    fn ram(&self) -> &[u8] {
        &self.ram
    }

    fn key_down(&mut self, chr: u8, scancode: u8) {
        self.keys.push((chr, scancode));
    }

    fn key_up(&mut self, _scancode: u8) {}

    fn modifier_set(&mut self, _bits: u8) {}

    fn modifier_clear(&mut self, _bits: u8) {}

    fn joy_axis(&mut self, axis: u8, value: i8) {
        self.joy.push((axis, value));
    }

    fn mouse_axis(&mut self, axis: u8, delta: i32) {
        self.mouse.push((axis, delta));
    }
}
