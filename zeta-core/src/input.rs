//! Host input translation: key names to scan codes, modifiers, gamepad and
//! mouse scaling.
//!
//! Keys are identified by their DOM-style names (`"ArrowUp"`, `"F1"`,
//! `"a"`, `" "`), which is also what the CLI derives from terminal events.

use crate::host::EmulatorCore;

/// Modifier bits understood by the core.
pub mod modifier {
    pub const SHIFT: u8 = 0x01;
    pub const CTRL: u8 = 0x04;
    pub const ALT: u8 = 0x08;
}

/// Keypad scan codes. The core expects no character code with these.
const KEYPAD: std::ops::RangeInclusive<u8> = 0x46..=0x53;

/// Character rows of the PC keyboard, with the scan code of their first key.
const ROWS: [(&str, u8); 7] = [
    ("1234567890", 2),
    ("QWERTYUIOP{}", 16),
    ("qwertyuiop[]", 16),
    ("asdfghjkl;'", 30),
    ("ASDFGHJKL:\"", 30),
    ("zxcvbnm,./", 44),
    ("ZXCVBNM<>?", 44),
];

/// Gamepad axis range after scaling.
pub const AXIS_MAX: f64 = 127.0;

/// Default multiplier applied to relative mouse motion.
pub const DEFAULT_MOUSE_SENSITIVITY: i32 = 4;

/// Scan code for a named key, if the keyboard has one.
pub fn scancode(key: &str) -> Option<u8> {
    let code = match key {
        "ArrowUp" => 0x48,
        "ArrowLeft" => 0x4B,
        "ArrowRight" => 0x4D,
        "ArrowDown" => 0x50,
        "Home" => 0x47,
        "End" => 0x4F,
        "Insert" => 0x52,
        "Delete" => 0x53,
        "PageUp" => 0x49,
        "PageDown" => 0x51,
        "Enter" => 0x1C,
        "Escape" => 0x01,
        "Backspace" => 0x0E,
        "Tab" => 0x0F,
        "-" | "_" => 12,
        "=" | "+" => 13,
        "`" | "~" => 41,
        "\\" | "|" => 43,
        "*" => 55,
        " " => 57,
        _ => return function_key(key).or_else(|| row_key(key)),
    };
    Some(code)
}

fn function_key(key: &str) -> Option<u8> {
    let n: u8 = key.strip_prefix('F')?.parse().ok()?;
    (1..=10).contains(&n).then(|| 0x3A + n)
}

fn row_key(key: &str) -> Option<u8> {
    let mut chars = key.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    ROWS.iter().find_map(|(row, first)| {
        row.chars()
            .position(|r| r == c)
            .map(|i| first + i as u8)
    })
}

/// Modifier bit for a modifier key name.
pub fn modifier_bit(key: &str) -> Option<u8> {
    match key {
        "Shift" => Some(modifier::SHIFT),
        "Control" => Some(modifier::CTRL),
        "Alt" | "AltGraph" => Some(modifier::ALT),
        _ => None,
    }
}

/// Character code for a key press.
///
/// Single-character keys report their own code, control keys report their
/// legacy key code when it is below 32, everything else reports 0.
pub fn char_code(key: &str, key_code: u32) -> u8 {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => u8::try_from(u32::from(c)).unwrap_or(0),
        _ if key_code < 32 => key_code as u8,
        _ => 0,
    }
}

/// The `(chr, scancode)` pair sent to the core for a key press, or None if
/// the key means nothing to the guest.
pub fn translate_key(key: &str, key_code: u32) -> Option<(u8, u8)> {
    let scan = scancode(key).unwrap_or(0);
    let chr = if KEYPAD.contains(&scan) {
        0
    } else {
        char_code(key, key_code)
    };
    (chr > 0 || scan > 0).then_some((chr, scan))
}

/// Apply a key press. Returns true if the core received anything.
pub fn key_down(core: &mut dyn EmulatorCore, key: &str, key_code: u32) -> bool {
    let mut handled = false;
    if let Some(bit) = modifier_bit(key) {
        core.modifier_set(bit);
        handled = true;
    }
    if let Some((chr, scan)) = translate_key(key, key_code) {
        core.key_down(chr, scan);
        handled = true;
    }
    handled
}

/// Apply a key release. Returns true if the core received anything.
pub fn key_up(core: &mut dyn EmulatorCore, key: &str) -> bool {
    let mut handled = false;
    if let Some(bit) = modifier_bit(key) {
        core.modifier_clear(bit);
        handled = true;
    }
    if let Some(scan) = scancode(key) {
        core.key_up(scan);
        handled = true;
    }
    handled
}

/// Set or clear every modifier from a full modifier state.
pub fn sync_modifiers(core: &mut dyn EmulatorCore, shift: bool, ctrl: bool, alt: bool) {
    for (bit, held) in [
        (modifier::SHIFT, shift),
        (modifier::CTRL, ctrl),
        (modifier::ALT, alt),
    ] {
        if held {
            core.modifier_set(bit);
        } else {
            core.modifier_clear(bit);
        }
    }
}

/// Snapshot of one host gamepad.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamepadState {
    /// Axis positions in `-1.0..=1.0`.
    pub axes: Vec<f64>,
    pub buttons: Vec<bool>,
}

/// Scale a normalized axis to the core's range.
pub fn scale_axis(value: f64) -> i8 {
    (value * AXIS_MAX).round().clamp(-AXIS_MAX, AXIS_MAX) as i8
}

/// Feed polled gamepads to the core's joystick.
///
/// Pads with fewer than two axes or no buttons are ignored. Any pressed
/// button counts as joystick button 0.
pub fn apply_gamepads(core: &mut dyn EmulatorCore, pads: &[GamepadState]) {
    for pad in pads {
        if pad.axes.len() < 2 || pad.buttons.is_empty() {
            continue;
        }
        core.joy_axis(0, scale_axis(pad.axes[0]));
        core.joy_axis(1, scale_axis(pad.axes[1]));
        let pressed = pad.buttons.iter().any(|&b| b);
        core.joy_button(0, pressed);
    }
}

/// Feed relative mouse motion, scaled by `sensitivity`.
pub fn apply_mouse_motion(core: &mut dyn EmulatorCore, dx: i32, dy: i32, sensitivity: i32) {
    core.mouse_axis(0, dx.saturating_mul(sensitivity));
    core.mouse_axis(1, dy.saturating_mul(sensitivity));
}
