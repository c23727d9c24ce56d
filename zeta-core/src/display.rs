//! Display and speaker collaborators.
//!
//! The `Display` and `Speaker` traits let the same session run against a
//! real canvas/audio backend or the headless versions used in tests.

/// Text-mode renderer.
pub trait Display {
    fn set_charset(&mut self, width: u32, height: u32, bitmap: &[u8]);
    fn set_palette(&mut self, palette: &[u32]);
    fn set_blink(&mut self, _blink: bool) {}

    /// Draw one frame of text memory.
    fn render(&mut self, vram: &[u8], video_mode: u8, time_ms: f64);

    /// Replace the screen with an error message.
    fn show_error(&mut self, message: &str);
}

/// PC speaker.
pub trait Speaker {
    fn on(&mut self, cycles: i32, freq: f64);
    fn off(&mut self);
}

/// Headless display for testing - counts frames and keeps the last state.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    pub frames: usize,
    pub last_frame: Vec<u8>,
    pub video_mode: u8,
    pub charset: Option<(u32, u32, Vec<u8>)>,
    pub palette: Vec<u32>,
    pub blink: bool,
    pub error: Option<String>,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Display for HeadlessDisplay {
    fn set_charset(&mut self, width: u32, height: u32, bitmap: &[u8]) {
        self.charset = Some((width, height, bitmap.to_vec()));
    }

    fn set_palette(&mut self, palette: &[u32]) {
        self.palette = palette.to_vec();
    }

    fn set_blink(&mut self, blink: bool) {
        self.blink = blink;
    }

    fn render(&mut self, vram: &[u8], video_mode: u8, _time_ms: f64) {
        self.frames += 1;
        self.last_frame.clear();
        self.last_frame.extend_from_slice(vram);
        self.video_mode = video_mode;
    }

    fn show_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }
}

/// Headless speaker for testing - records the current tone.
#[derive(Debug, Default)]
pub struct HeadlessSpeaker {
    pub tone: Option<f64>,
    pub notes: usize,
}

impl Speaker for HeadlessSpeaker {
    fn on(&mut self, _cycles: i32, freq: f64) {
        self.tone = Some(freq);
        self.notes += 1;
    }

    fn off(&mut self) {
        self.tone = None;
    }
}
