//! Key identifiers for trigger shortcuts

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A key that can be part of a trigger chord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Control,
    Alt,
    Shift,
    Meta,
    Letter(char),
    Digit(u8),
    F(u8),
    Space,
    Enter,
    Tab,
    Escape,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    PrintScreen,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    #[error("key list is empty")]
    Empty,
    #[error("unknown key name {0:?}")]
    Unknown(String),
}

impl FromStr for KeyCode {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();

        let key = match name.as_str() {
            "ctrl" | "control" => KeyCode::Control,
            "alt" | "option" => KeyCode::Alt,
            "shift" => KeyCode::Shift,
            "cmd" | "command" | "win" | "super" | "meta" => KeyCode::Meta,
            "space" => KeyCode::Space,
            "enter" | "return" => KeyCode::Enter,
            "tab" => KeyCode::Tab,
            "esc" | "escape" => KeyCode::Escape,
            "backspace" => KeyCode::Backspace,
            "delete" | "del" => KeyCode::Delete,
            "insert" | "ins" => KeyCode::Insert,
            "home" => KeyCode::Home,
            "end" => KeyCode::End,
            "pageup" | "pgup" => KeyCode::PageUp,
            "pagedown" | "pgdn" => KeyCode::PageDown,
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "printscreen" | "prtsc" => KeyCode::PrintScreen,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_lowercase() => KeyCode::Letter(c),
                    (Some(c), None) if c.is_ascii_digit() => KeyCode::Digit(c as u8 - b'0'),
                    (Some('f'), Some(_)) => match other[1..].parse::<u8>() {
                        Ok(n @ 1..=12) => KeyCode::F(n),
                        _ => return Err(KeyParseError::Unknown(s.trim().to_string())),
                    },
                    _ => return Err(KeyParseError::Unknown(s.trim().to_string())),
                }
            }
        };

        Ok(key)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyCode::Control => write!(f, "ctrl"),
            KeyCode::Alt => write!(f, "alt"),
            KeyCode::Shift => write!(f, "shift"),
            KeyCode::Meta => write!(f, "meta"),
            KeyCode::Letter(c) => write!(f, "{}", c),
            KeyCode::Digit(d) => write!(f, "{}", d),
            KeyCode::F(n) => write!(f, "f{}", n),
            KeyCode::Space => write!(f, "space"),
            KeyCode::Enter => write!(f, "enter"),
            KeyCode::Tab => write!(f, "tab"),
            KeyCode::Escape => write!(f, "esc"),
            KeyCode::Backspace => write!(f, "backspace"),
            KeyCode::Delete => write!(f, "delete"),
            KeyCode::Insert => write!(f, "insert"),
            KeyCode::Home => write!(f, "home"),
            KeyCode::End => write!(f, "end"),
            KeyCode::PageUp => write!(f, "pageup"),
            KeyCode::PageDown => write!(f, "pagedown"),
            KeyCode::Up => write!(f, "up"),
            KeyCode::Down => write!(f, "down"),
            KeyCode::Left => write!(f, "left"),
            KeyCode::Right => write!(f, "right"),
            KeyCode::PrintScreen => write!(f, "printscreen"),
        }
    }
}

/// Parse a comma separated chord such as `"ctrl,alt,z"`
pub fn parse_key_list(list: &str) -> Result<Vec<KeyCode>, KeyParseError> {
    let keys = list
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::parse)
        .collect::<Result<Vec<KeyCode>, _>>()?;

    if keys.is_empty() {
        return Err(KeyParseError::Empty);
    }
    Ok(keys)
}

/// Render a chord back to its comma separated form
pub fn format_key_list(keys: &[KeyCode]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_chord() {
        let keys = parse_key_list("ctrl,alt,z").unwrap();
        assert_eq!(keys, vec![KeyCode::Control, KeyCode::Alt, KeyCode::Letter('z')]);
    }

    #[test]
    fn test_parse_is_lenient_about_case_and_spacing() {
        let keys = parse_key_list(" Ctrl , SHIFT,F5 ,9").unwrap();
        assert_eq!(
            keys,
            vec![KeyCode::Control, KeyCode::Shift, KeyCode::F(5), KeyCode::Digit(9)]
        );
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("cmd".parse::<KeyCode>().unwrap(), KeyCode::Meta);
        assert_eq!("win".parse::<KeyCode>().unwrap(), KeyCode::Meta);
        assert_eq!("return".parse::<KeyCode>().unwrap(), KeyCode::Enter);
        assert_eq!("esc".parse::<KeyCode>().unwrap(), KeyCode::Escape);
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert_eq!(
            parse_key_list("ctrl,hyper"),
            Err(KeyParseError::Unknown("hyper".to_string()))
        );
        assert!("f13".parse::<KeyCode>().is_err());
        assert!("f".parse::<KeyCode>().is_ok()); // single letter f
        assert!("é".parse::<KeyCode>().is_err());
    }

    #[test]
    fn test_parse_rejects_empty_list() {
        assert_eq!(parse_key_list(""), Err(KeyParseError::Empty));
        assert_eq!(parse_key_list(" , ,"), Err(KeyParseError::Empty));
    }

    #[test]
    fn test_format_round_trip() {
        let keys = parse_key_list("control,option,F1").unwrap();
        assert_eq!(format_key_list(&keys), "ctrl,alt,f1");
        assert_eq!(parse_key_list(&format_key_list(&keys)).unwrap(), keys);
    }
}
