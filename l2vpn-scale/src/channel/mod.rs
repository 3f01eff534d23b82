//! Channel layer: prompt-terminated reads over a PTY shell.
//!
//! Output is ANSI-stripped as it arrives and only the tail of the buffer is
//! searched for the device prompt.

mod buffer;
mod pty;

pub use buffer::PatternBuffer;
pub use pty::{PtyChannel, PtyConfig};
