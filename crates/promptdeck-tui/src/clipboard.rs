//! Clipboard access via OSC 52.
//!
//! Terminal emulators that support OSC 52 accept a base64 payload and place
//! it on the system clipboard; this works over SSH where no display server
//! is reachable.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::io::{self, Write};

/// Copy text to the system clipboard through the terminal.
pub fn copy_to_clipboard(text: &str) -> io::Result<()> {
    let payload = STANDARD.encode(text.as_bytes());
    let mut stdout = io::stdout();
    write!(stdout, "\x1b]52;c;{payload}\x07")?;
    stdout.flush()
}
