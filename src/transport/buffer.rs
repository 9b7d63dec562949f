//! Accumulating receive buffer.
//!
//! Responses are plain JSON with no framing, so the only way to know a
//! response is complete is to parse it. Reparsing the whole buffer after
//! every read is quadratic for large responses, so the buffer tracks
//! nesting depth and string state over newly appended bytes and hands the
//! buffer to `serde_json` once the top-level value can be complete.
//!
//! While the value is still open the buffer is also parsed each time its
//! length has doubled, which catches malformed input early and keeps the
//! total parsing work linear in the response size.

use serde_json::Value;

/// Outcome of a parse attempt.
#[derive(Debug)]
pub enum ParseState {
    /// More bytes are needed.
    Incomplete,
    /// A full JSON value was decoded.
    Complete(Value),
    /// No further bytes can turn what was received into a JSON document.
    Malformed(serde_json::Error),
}

#[derive(Debug, Default)]
pub struct ResponseBuffer {
    bytes: Vec<u8>,
    scanned: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
    in_scalar: bool,
    closed: bool,
    malformed: bool,
    /// Buffer length at which an open value is parsed next.
    next_attempt: usize,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Try to decode everything received so far as one JSON value.
    pub fn try_parse(&mut self) -> ParseState {
        self.scan();
        if self.closed || self.malformed {
            return self.parse();
        }
        if self.bytes.len() < self.next_attempt {
            return ParseState::Incomplete;
        }

        self.next_attempt = self.bytes.len().saturating_mul(2);
        match self.parse() {
            // Only a bare top-level scalar parses while open, and it may still grow.
            ParseState::Complete(_) => ParseState::Incomplete,
            other => other,
        }
    }

    /// Decode the buffer once the peer has closed and no more bytes will come.
    pub fn finish(&mut self) -> ParseState {
        self.scan();
        self.parse()
    }

    fn parse(&mut self) -> ParseState {
        match serde_json::from_slice(&self.bytes) {
            Ok(value) => ParseState::Complete(value),
            Err(e) if e.is_eof() => ParseState::Incomplete,
            Err(e) => {
                self.malformed = true;
                ParseState::Malformed(e)
            }
        }
    }

    /// Advance the structural scan over bytes not yet seen.
    ///
    /// Stops at the point where the top-level value closes. Everything after
    /// that is left to the parser, which reports trailing garbage.
    fn scan(&mut self) {
        while !self.closed && self.scanned < self.bytes.len() {
            let byte = self.bytes[self.scanned];
            self.scanned += 1;

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                    self.closed = self.depth == 0;
                }
                continue;
            }

            let structural = matches!(
                byte,
                b'"' | b'{' | b'[' | b'}' | b']' | b',' | b':' | b' ' | b'\t' | b'\n' | b'\r'
            );
            if self.in_scalar {
                // A bare top-level scalar ends at the first byte that cannot extend it.
                if structural {
                    self.closed = true;
                }
                continue;
            }

            match byte {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    // A stray closer at depth 0 still "closes": the parser rejects it.
                    self.depth = self.depth.saturating_sub(1);
                    self.closed = self.depth == 0;
                }
                _ if structural => {}
                _ if self.depth == 0 => self.in_scalar = true,
                _ => {}
            }
        }
    }
}
