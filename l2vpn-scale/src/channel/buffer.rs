//! Output buffer with tail-only prompt search.
//!
//! Only the last `search_depth` bytes are searched for a prompt, which keeps
//! prompt detection cheap however long a `show` output gets.

use bytes::BytesMut;
use regex::bytes::Regex;
use vte::{Parser, Perform};

/// Accumulates device output with terminal escape sequences removed.
pub struct PatternBuffer {
    buffer: BytesMut,
    search_depth: usize,
    /// Kept across chunks so an escape sequence split between two reads is
    /// still recognised.
    parser: Parser,
}

impl PatternBuffer {
    /// Create a buffer searching the last `search_depth` bytes.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            search_depth,
            parser: Parser::new(),
        }
    }

    /// Append raw channel data, dropping escape sequences and carriage returns.
    pub fn extend(&mut self, data: &[u8]) {
        let mut printable = Printable {
            out: &mut self.buffer,
        };
        self.parser.advance(&mut printable, data);
    }

    /// Whether the buffer currently ends with a match of `pattern`.
    ///
    /// Only trailing whitespace may follow the match; a prompt-like line in
    /// the middle of command output does not count.
    pub fn ends_with_match(&self, pattern: &Regex) -> bool {
        let tail = self.tail();
        pattern
            .find_iter(tail)
            .last()
            .is_some_and(|m| tail[m.end()..].iter().all(u8::is_ascii_whitespace))
    }

    /// The searched region.
    fn tail(&self) -> &[u8] {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        &self.buffer[start..]
    }

    /// Lossy text of the searched region, for error messages.
    pub fn tail_lossy(&self) -> String {
        String::from_utf8_lossy(self.tail()).into_owned()
    }

    /// Take the contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        self.buffer.split().to_vec()
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// vte performer keeping printable text, newlines and tabs.
struct Printable<'a> {
    out: &'a mut BytesMut,
}

impl Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if byte == b'\n' || byte == b'\t' {
            self.out.extend_from_slice(&[byte]);
        }
    }
}
