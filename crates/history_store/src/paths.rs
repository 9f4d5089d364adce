use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const STORE_DIR: [&str; 2] = ["scout_chat", "store"];

/// Serialized conversation history (JSON array of messages).
pub const HISTORY_KEY: &str = "chat.history";

/// Free-text strategy context.
pub const STRATEGY_KEY: &str = "chat.strategy";

#[must_use]
pub fn store_root(base: &Path) -> PathBuf {
    base.join(STORE_DIR[0]).join(STORE_DIR[1])
}

#[must_use]
pub fn counter_key(name: &str) -> String {
    format!("counter.{name}")
}

/// Maps a key onto a single file name.
///
/// ASCII alphanumerics, `.`, `-` and `_` pass through; every other byte is
/// written as `%XX`, so distinct keys never share a file.
#[must_use]
pub fn key_file_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 6);
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'-' | b'_') {
            name.push(char::from(byte));
        } else {
            let _ = write!(name, "%{byte:02X}");
        }
    }
    name.push_str(".value");
    name
}
