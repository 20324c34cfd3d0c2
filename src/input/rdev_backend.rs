//! rdev-based action port
//! Synthesizes key chords with rdev and reads results from the clipboard.
//! Works on Windows, macOS, and Linux (X11)

use std::thread;
use std::time::Duration;

use rdev::{EventType, Key};
use tracing::{debug, warn};

use super::clipboard::ClipboardReader;
use super::{ActionError, ActionPort, CaptureError, KeyCode};

/// Delay between synthesized events. Some platforms drop events sent back to back.
const EVENT_DELAY: Duration = Duration::from_millis(20);

/// Desktop action port backed by rdev and the system clipboard
pub struct RdevActionPort {
    clipboard: ClipboardReader,
}

impl RdevActionPort {
    pub fn new(clipboard: ClipboardReader) -> Self {
        Self { clipboard }
    }

    fn send(key: KeyCode, event: EventType) -> Result<(), ActionError> {
        let result = rdev::simulate(&event).map_err(|e| ActionError::Simulate {
            key,
            reason: format!("{:?}", e),
        });
        thread::sleep(EVENT_DELAY);
        result
    }
}

impl ActionPort for RdevActionPort {
    fn trigger(&self, keys: &[KeyCode]) -> Result<(), ActionError> {
        if keys.is_empty() {
            return Err(ActionError::NoKeys);
        }

        let mut pressed = Vec::with_capacity(keys.len());
        let mut result = Ok(());

        for &key in keys {
            match Self::send(key, EventType::KeyPress(to_rdev_key(key))) {
                Ok(()) => pressed.push(key),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        // Always release whatever went down, even after a failed press
        for &key in pressed.iter().rev() {
            if let Err(e) = Self::send(key, EventType::KeyRelease(to_rdev_key(key))) {
                warn!("Failed to release {}: {}", key, e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }

        if result.is_ok() {
            debug!("Triggered chord {:?}", keys);
        }
        result
    }

    fn capture(&self) -> Result<String, CaptureError> {
        self.clipboard.read()
    }
}

/// Map a key identifier onto rdev's physical key
fn to_rdev_key(key: KeyCode) -> Key {
    match key {
        KeyCode::Control => Key::ControlLeft,
        KeyCode::Alt => Key::Alt,
        KeyCode::Shift => Key::ShiftLeft,
        KeyCode::Meta => Key::MetaLeft,
        KeyCode::Letter(c) => letter_key(c),
        KeyCode::Digit(d) => digit_key(d),
        KeyCode::F(n) => function_key(n),
        KeyCode::Space => Key::Space,
        KeyCode::Enter => Key::Return,
        KeyCode::Tab => Key::Tab,
        KeyCode::Escape => Key::Escape,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Insert => Key::Insert,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Up => Key::UpArrow,
        KeyCode::Down => Key::DownArrow,
        KeyCode::Left => Key::LeftArrow,
        KeyCode::Right => Key::RightArrow,
        KeyCode::PrintScreen => Key::PrintScreen,
    }
}

fn letter_key(c: char) -> Key {
    match c {
        'a' => Key::KeyA,
        'b' => Key::KeyB,
        'c' => Key::KeyC,
        'd' => Key::KeyD,
        'e' => Key::KeyE,
        'f' => Key::KeyF,
        'g' => Key::KeyG,
        'h' => Key::KeyH,
        'i' => Key::KeyI,
        'j' => Key::KeyJ,
        'k' => Key::KeyK,
        'l' => Key::KeyL,
        'm' => Key::KeyM,
        'n' => Key::KeyN,
        'o' => Key::KeyO,
        'p' => Key::KeyP,
        'q' => Key::KeyQ,
        'r' => Key::KeyR,
        's' => Key::KeyS,
        't' => Key::KeyT,
        'u' => Key::KeyU,
        'v' => Key::KeyV,
        'w' => Key::KeyW,
        'x' => Key::KeyX,
        'y' => Key::KeyY,
        'z' => Key::KeyZ,
        other => Key::Unknown(other as u32),
    }
}

fn digit_key(d: u8) -> Key {
    match d {
        0 => Key::Num0,
        1 => Key::Num1,
        2 => Key::Num2,
        3 => Key::Num3,
        4 => Key::Num4,
        5 => Key::Num5,
        6 => Key::Num6,
        7 => Key::Num7,
        8 => Key::Num8,
        _ => Key::Num9,
    }
}

fn function_key(n: u8) -> Key {
    match n {
        1 => Key::F1,
        2 => Key::F2,
        3 => Key::F3,
        4 => Key::F4,
        5 => Key::F5,
        6 => Key::F6,
        7 => Key::F7,
        8 => Key::F8,
        9 => Key::F9,
        10 => Key::F10,
        11 => Key::F11,
        _ => Key::F12,
    }
}
