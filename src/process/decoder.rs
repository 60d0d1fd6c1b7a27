//! Splitting a byte stream into text lines.
//!
//! [`LineDecoder`] reads at most `buffer_size` bytes per read call and
//! yields one `String` per `\n`-terminated line, with the terminator (and
//! a directly preceding `\r`) removed. At end of stream any unterminated
//! tail is yielded once as a final line.
//!
//! # Long lines
//!
//! `buffer_size` bounds each read, not the line length. A segment longer
//! than `buffer_size` without a terminator keeps accumulating across reads
//! and is delivered whole once its terminator (or end of stream) arrives.
//! Nothing is truncated or split.
//!
//! # Encoding
//!
//! Lines are cut on raw bytes and only then converted with lossy UTF-8
//! decoding, so a multi-byte character straddling two reads is never
//! corrupted.

use std::io::{self, Read};

/// Incremental line splitter over any [`Read`].
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use sketch_tasks::process::LineDecoder;
///
/// let mut decoder = LineDecoder::new(Cursor::new("one\r\ntwo\n\nthree"), 4);
/// assert_eq!(decoder.next_line().unwrap().as_deref(), Some("one"));
/// assert_eq!(decoder.next_line().unwrap().as_deref(), Some("two"));
/// assert_eq!(decoder.next_line().unwrap().as_deref(), Some(""));
/// assert_eq!(decoder.next_line().unwrap().as_deref(), Some("three"));
/// assert_eq!(decoder.next_line().unwrap(), None);
/// ```
#[derive(Debug)]
pub struct LineDecoder<R> {
    reader: R,
    chunk: Vec<u8>,
    pending: Vec<u8>,
    /// Bytes of `pending` already known to contain no `\n`.
    scanned: usize,
    eof: bool,
}

impl<R: Read> LineDecoder<R> {
    /// Wraps `reader`, reading `buffer_size` bytes at a time.
    ///
    /// A `buffer_size` of zero is treated as one.
    pub fn new(reader: R, buffer_size: usize) -> Self {
        Self {
            reader,
            chunk: vec![0; buffer_size.max(1)],
            pending: Vec::new(),
            scanned: 0,
            eof: false,
        }
    }

    /// Returns the next complete line, or `None` at end of stream.
    ///
    /// Blocks until a line terminator arrives or the stream closes.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of a failed read. Bytes already buffered are
    /// kept and can be recovered with [`take_partial`](Self::take_partial).
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(offset) = self.pending[self.scanned..]
                .iter()
                .position(|&b| b == b'\n')
            {
                let end = self.scanned + offset;
                let mut line: Vec<u8> = self.pending.drain(..=end).collect();
                self.scanned = 0;
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(Some(decode(line)));
            }
            self.scanned = self.pending.len();

            if self.eof {
                return Ok(self.take_partial());
            }

            match self.reader.read(&mut self.chunk) {
                Ok(0) => self.eof = true,
                Ok(n) => self.pending.extend_from_slice(&self.chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
                Err(e) => return Err(e),
            }
        }
    }

    /// Removes and returns any buffered bytes that do not yet form a
    /// complete line.
    pub fn take_partial(&mut self) -> Option<String> {
        self.scanned = 0;
        if self.pending.is_empty() {
            return None;
        }
        let mut line = std::mem::take(&mut self.pending);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(decode(line))
    }

    /// Returns `true` once the underlying reader reported end of stream.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Size of each read.
    pub fn buffer_size(&self) -> usize {
        self.chunk.len()
    }
}

fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}
