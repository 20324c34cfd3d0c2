//! External trigger and capture backends

mod backend;
mod clipboard;
mod keys;
pub(crate) mod rdev_backend;

pub use backend::*;
pub use clipboard::ClipboardReader;
pub use keys::{format_key_list, parse_key_list, KeyCode, KeyParseError};
