use std::io;

use widestring::U16String;

use crate::{
    error::storage_to_io,
    handles::{ClobId, LobSession},
};

use super::{ClosedFlag, LobStreamOptions, closed_stream};

/// A source of UTF-16 code units, e.g. the content of a character large object.
pub trait CharRead {
    /// Reads characters into `buf`.
    ///
    /// * `Ok(None)` indicates the end of the stream.
    /// * `Ok(Some(0))` with a non empty `buf` indicates that no characters are available right now.
    ///   This is not the end of the stream, the caller may try again.
    fn read_chars(&mut self, buf: &mut [u16]) -> io::Result<Option<usize>>;

    /// Releases the source. Idempotent.
    fn close(&mut self) -> io::Result<()>;
}

/// Reads a range of a character large object. The characters are fetched from the engine one
/// window at a time.
#[derive(Debug)]
pub struct ClobReader<'s, S> {
    session: &'s S,
    clob: ClobId,
    owner: ClosedFlag,
    /// Zero based position of the next character to fetch from the engine.
    fetch_position: u64,
    /// Zero based position one past the last character to read.
    end: u64,
    window: Vec<u16>,
    /// Number of characters in `window` already handed out to the caller.
    consumed: usize,
    window_size: usize,
    closed: bool,
}

impl<'s, S> ClobReader<'s, S>
where
    S: LobSession,
{
    /// Reader over `length` characters of `clob`, starting at the zero based position `start`.
    /// The range is not checked against the length of the object, the reader just ends early if
    /// the object is shorter.
    pub fn new(session: &'s S, clob: ClobId, start: u64, length: u64) -> Self {
        Self::with_options(
            session,
            clob,
            start,
            length,
            ClosedFlag::new(),
            LobStreamOptions::default(),
        )
    }

    /// Like [`Self::new`], but reports an error for every read once `owner` is closed and uses
    /// custom buffer sizes.
    pub fn with_options(
        session: &'s S,
        clob: ClobId,
        start: u64,
        length: u64,
        owner: ClosedFlag,
        options: LobStreamOptions,
    ) -> Self {
        Self {
            session,
            clob,
            owner,
            fetch_position: start,
            end: start.saturating_add(length),
            window: Vec::new(),
            consumed: 0,
            window_size: options.char_window.max(1),
            closed: false,
        }
    }

    /// Reads all remaining characters and converts them to UTF-8. Unpaired surrogates are
    /// replaced.
    pub fn read_to_string(&mut self) -> io::Result<String> {
        let mut chars = Vec::new();
        let mut buf = vec![0; self.window_size];
        while let Some(n) = self.read_chars(&mut buf)? {
            chars.extend_from_slice(&buf[..n]);
        }
        Ok(U16String::from_vec(chars).to_string_lossy())
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.closed || self.owner.is_closed() {
            Err(closed_stream())
        } else {
            Ok(())
        }
    }

    /// Fetches the next window from the engine. `false` if the range is exhausted.
    fn fetch_window(&mut self) -> io::Result<bool> {
        if self.fetch_position >= self.end {
            return Ok(false);
        }
        let count = (self.end - self.fetch_position).min(self.window_size as u64) as usize;
        self.window = self
            .session
            .clob_get_chars(self.clob, self.fetch_position, count)
            .map_err(storage_to_io)?;
        self.consumed = 0;
        if self.window.is_empty() {
            // The object is shorter than the range we have been asked to read.
            self.end = self.fetch_position;
            return Ok(false);
        }
        self.fetch_position += self.window.len() as u64;
        Ok(true)
    }
}

impl<S> CharRead for ClobReader<'_, S>
where
    S: LobSession,
{
    fn read_chars(&mut self, buf: &mut [u16]) -> io::Result<Option<usize>> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(Some(0));
        }
        if self.consumed == self.window.len() && !self.fetch_window()? {
            return Ok(None);
        }
        let available = &self.window[self.consumed..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consumed += n;
        Ok(Some(n))
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        self.window = Vec::new();
        self.consumed = 0;
        Ok(())
    }
}
