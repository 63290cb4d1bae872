use std::io::{self, ErrorKind, Read};

use log::{debug, error};

use crate::{
    charset::{Charset, CoderStatus, Encoder, UsAscii},
    handles::log_swallowed,
};

use super::{CharRead, ClosedFlag, LobStreamOptions, closed_stream};

/// Byte view on a character source. Characters are transcoded incrementally into the target
/// charset (US-ASCII by default). Characters without a representation in the charset are
/// substituted, so reading never fails due to the content.
///
/// The underlying source is closed as soon as its end is observed, not only once this stream is
/// closed.
#[derive(Debug)]
pub struct AsciiInputStream<R, C: Charset = UsAscii> {
    source: R,
    /// The source reported its end. Characters may still be left in `window`.
    source_exhausted: bool,
    source_released: bool,
    charset: C,
    encoder: C::Encoder,
    /// Characters fetched from the source, `window[start..end]` is not yet encoded.
    window: Vec<u16>,
    start: usize,
    end: usize,
    /// Encoded bytes, `staging[staged_start..staged_end]` are not yet handed out to the caller.
    staging: Vec<u8>,
    staged_start: usize,
    staged_end: usize,
    eof: bool,
    closed: bool,
    owner: ClosedFlag,
}

impl<R> AsciiInputStream<R, UsAscii>
where
    R: CharRead,
{
    /// US-ASCII view on `source` with default buffer sizes.
    pub fn new(source: R) -> Self {
        Self::with_options(source, UsAscii, ClosedFlag::new(), LobStreamOptions::default())
    }
}

impl<R, C> AsciiInputStream<R, C>
where
    R: CharRead,
    C: Charset,
{
    /// Byte view on `source` transcoding into `charset`. Every read fails once `owner` is closed.
    pub fn with_options(
        source: R,
        charset: C,
        owner: ClosedFlag,
        options: LobStreamOptions,
    ) -> Self {
        let encoder = charset.new_encoder();
        Self {
            source,
            source_exhausted: false,
            source_released: false,
            charset,
            encoder,
            window: vec![0; options.char_window.max(1)],
            start: 0,
            end: 0,
            staging: Vec::with_capacity(options.byte_buffer),
            staged_start: 0,
            staged_end: 0,
            eof: false,
            closed: false,
            owner,
        }
    }

    /// Reads encoded bytes into `buf`.
    ///
    /// * `Ok(None)`: End of stream.
    /// * `Ok(Some(0))`: The source had no characters available. Not the end of the stream.
    /// * `Ok(Some(n))`: `n` bytes have been written to the start of `buf`.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(Some(0));
        }
        if self.staged_start == self.staged_end {
            match self.encode_next(buf.len())? {
                None => return Ok(None),
                Some(0) => return Ok(Some(0)),
                Some(_) => (),
            }
        }
        let staged = &self.staging[self.staged_start..self.staged_end];
        let n = staged.len().min(buf.len());
        buf[..n].copy_from_slice(&staged[..n]);
        self.staged_start += n;
        Ok(Some(n))
    }

    /// Reads a single byte. `Ok(None)` at the end of the stream. If the source has no characters
    /// available right now, an error of kind [`ErrorKind::Interrupted`] is returned and the call
    /// may be repeated.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8];
        match self.read_bytes(&mut byte)? {
            None => Ok(None),
            Some(0) => Err(nothing_available()),
            Some(_) => Ok(Some(byte[0])),
        }
    }

    /// `true` once the end of the stream has been reached.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Closes the stream and the underlying source, releasing all buffers. Idempotent. Failures to
    /// close the source are logged, but not reported. Closing a stream whose owner has already
    /// been closed is fine, too.
    pub fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.release_source();
        self.window = Vec::new();
        self.staging = Vec::new();
        self.start = 0;
        self.end = 0;
        self.staged_start = 0;
        self.staged_end = 0;
        Ok(())
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.closed || self.owner.is_closed() {
            Err(closed_stream())
        } else {
            Ok(())
        }
    }

    fn available(&self) -> usize {
        self.end - self.start
    }

    /// Encodes the next chunk of characters into the staging buffer. Returns the number of bytes
    /// staged. At most enough characters to fill `requested` bytes are consumed.
    fn encode_next(&mut self, requested: usize) -> io::Result<Option<usize>> {
        if self.eof {
            return Ok(None);
        }
        if self.available() == 0 {
            if self.source_exhausted {
                self.reach_eof();
                return Ok(None);
            }
            match self.refill()? {
                None => {
                    self.reach_eof();
                    return Ok(None);
                }
                Some(0) => return Ok(Some(0)),
                Some(_) => (),
            }
        }

        let max_bytes = self.charset.max_bytes_per_char().max(1);
        let wanted = (requested / max_bytes).max(1);
        // One additional character for completing a split surrogate pair.
        let staging_len = (wanted + 1) * max_bytes;
        if self.staging.len() < staging_len {
            self.staging.resize(staging_len, 0);
        }

        let mut limit = self.available().min(wanted);
        loop {
            let available = self.available();
            let end_of_input = self.source_exhausted && limit == available;
            let outcome = self.encoder.encode(
                &self.window[self.start..self.start + limit],
                &mut self.staging[..staging_len],
                end_of_input,
            );
            if outcome.produced != 0 {
                self.start += outcome.consumed;
                self.staged_start = 0;
                self.staged_end = outcome.produced;
                return Ok(Some(outcome.produced));
            }
            if outcome.status == CoderStatus::Underflow && !end_of_input {
                // The window ends within a surrogate pair. Widen it by one character.
                if limit < available {
                    limit += 1;
                    continue;
                }
                match self.refill()? {
                    Some(0) => return Ok(Some(0)),
                    // The source is exhausted now, the next pass encodes with `end_of_input`.
                    None => (),
                    Some(_) => limit = (limit + 1).min(self.available()),
                }
                continue;
            }
            // Characters left, but nothing encoded. Only a broken encoder gets here.
            error!(
                "{} encoder produced no output for {available} pending characters.",
                self.charset.name()
            );
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!(
                    "{} encoder produced no output for {available} pending characters",
                    self.charset.name()
                ),
            ));
        }
    }

    /// Moves the unencoded rest of the window to its front and appends characters from the
    /// source.
    fn refill(&mut self) -> io::Result<Option<usize>> {
        if self.start != 0 {
            self.window.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
        if self.end == self.window.len() {
            self.window.push(0);
        }
        match self.source.read_chars(&mut self.window[self.end..])? {
            None => {
                self.source_exhausted = true;
                self.release_source();
                Ok(None)
            }
            Some(n) => {
                self.end += n;
                Ok(Some(n))
            }
        }
    }

    fn reach_eof(&mut self) {
        debug!("{} input stream reached its end.", self.charset.name());
        self.eof = true;
        self.release_source();
    }

    fn release_source(&mut self) {
        if self.source_released {
            return;
        }
        self.source_released = true;
        if let Err(error) = self.source.close() {
            log_swallowed("closing the character source of a byte stream", &error);
        }
    }
}

impl<R, C> Read for AsciiInputStream<R, C>
where
    R: CharRead,
    C: Charset,
{
    /// `Ok(0)` signals the end of the stream, as usual. If no characters are available right now
    /// an error of kind [`ErrorKind::Interrupted`] is returned, which [`Read::read_exact`] and
    /// [`Read::read_to_end`] retry transparently.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read_bytes(buf)? {
            None => Ok(0),
            Some(0) if !buf.is_empty() => Err(nothing_available()),
            Some(n) => Ok(n),
        }
    }
}

fn nothing_available() -> io::Error {
    io::Error::new(
        ErrorKind::Interrupted,
        "no characters available from the source yet",
    )
}
