use std::io::{self, Write};

use crate::{
    charset::{Charset, CoderStatus, Decoder, UsAscii},
    error::storage_to_io,
    handles::{ClobId, LobSession, log_swallowed},
};

use super::{ClosedFlag, EditLease, LobStreamOptions, closed_stream, edit_ended};

/// Writes bytes of a charset (US-ASCII by default) into a character large object. Decoded
/// characters are buffered and stored in batches. Bytes which are not valid in the charset are
/// substituted.
///
/// Pending characters are stored on [`Self::flush`], whenever the buffer is full, and on
/// [`Self::close`]. Dropping the stream closes it, but can only log failures.
#[derive(Debug)]
pub struct AsciiOutputStream<'s, S, C: Charset = UsAscii>
where
    S: LobSession,
{
    session: &'s S,
    clob: ClobId,
    /// Zero based position the pending characters are stored at.
    position: u64,
    decoder: C::Decoder,
    /// Undecoded input. Only ever non empty between calls if the charset has multi byte sequences.
    staging: Vec<u8>,
    pending: Vec<u16>,
    char_capacity: usize,
    closed: bool,
    owner: ClosedFlag,
    edit: Option<EditLease>,
}

impl<'s, S> AsciiOutputStream<'s, S, UsAscii>
where
    S: LobSession,
{
    /// Stream storing US-ASCII bytes into `clob`, starting at the zero based `position`.
    pub fn new(session: &'s S, clob: ClobId, position: u64) -> Self {
        Self::with_options(
            session,
            clob,
            position,
            &UsAscii,
            ClosedFlag::new(),
            LobStreamOptions::default(),
        )
    }
}

impl<'s, S, C> AsciiOutputStream<'s, S, C>
where
    S: LobSession,
    C: Charset,
{
    /// Like [`AsciiOutputStream::new`], but with a custom charset and buffer sizes. Every
    /// operation fails once `owner` is closed.
    pub fn with_options(
        session: &'s S,
        clob: ClobId,
        position: u64,
        charset: &C,
        owner: ClosedFlag,
        options: LobStreamOptions,
    ) -> Self {
        let char_capacity = options.char_window.max(1);
        Self {
            session,
            clob,
            position,
            decoder: charset.new_decoder(),
            staging: Vec::with_capacity(options.byte_buffer),
            pending: Vec::with_capacity(char_capacity),
            char_capacity,
            closed: false,
            owner,
            edit: None,
        }
    }

    /// Every operation fails once `edit` is over.
    pub(crate) fn within_edit(mut self, edit: Option<EditLease>) -> Self {
        self.edit = edit;
        self
    }

    /// Decodes and buffers all of `buf`.
    pub fn write_bytes(&mut self, buf: &[u8]) -> io::Result<()> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(());
        }
        if !self.pending.is_empty() && self.pending.len() + buf.len() > self.char_capacity {
            self.flush_pending()?;
        }
        self.staging.extend_from_slice(buf);
        self.decode_staged(false)
    }

    /// Stores all pending characters.
    pub fn flush(&mut self) -> io::Result<()> {
        self.ensure_open()?;
        self.flush_pending()
    }

    /// Stores all pending characters and releases the buffers. Idempotent.
    ///
    /// If the owner has been closed, or the edit session of the owner is over, pending characters
    /// can no longer be stored. They are discarded and an error is returned.
    pub fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        let result = if self.owner.is_closed() || edit_ended(&self.edit) {
            if self.pending.is_empty() && self.staging.is_empty() {
                Ok(())
            } else {
                Err(closed_stream())
            }
        } else {
            self.decode_staged(true).and_then(|()| self.flush_pending())
        };
        self.closed = true;
        self.staging = Vec::new();
        self.pending = Vec::new();
        result
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.closed || self.owner.is_closed() || edit_ended(&self.edit) {
            Err(closed_stream())
        } else {
            Ok(())
        }
    }

    /// Decodes the staged bytes into the pending characters, flushing whenever they fill up.
    fn decode_staged(&mut self, end_of_input: bool) -> io::Result<()> {
        let mut consumed = 0;
        while consumed < self.staging.len() {
            let filled = self.pending.len();
            self.pending.resize(self.char_capacity, 0);
            let outcome = self.decoder.decode(
                &self.staging[consumed..],
                &mut self.pending[filled..],
                end_of_input,
            );
            self.pending.truncate(filled + outcome.produced);
            consumed += outcome.consumed;
            if self.pending.len() == self.char_capacity {
                self.flush_pending()?;
            }
            if outcome.status == CoderStatus::Underflow && outcome.consumed == 0 {
                // Incomplete sequence, wait for more input.
                break;
            }
        }
        self.staging.drain(..consumed);
        Ok(())
    }

    fn flush_pending(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.session
            .clob_set_chars(self.clob, self.position, &self.pending)
            .map_err(storage_to_io)?;
        self.position += self.pending.len() as u64;
        self.pending.clear();
        Ok(())
    }
}

impl<S, C> Write for AsciiOutputStream<'_, S, C>
where
    S: LobSession,
    C: Charset,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        AsciiOutputStream::flush(self)
    }
}

impl<S, C> Drop for AsciiOutputStream<'_, S, C>
where
    S: LobSession,
    C: Charset,
{
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            log_swallowed("closing a byte stream writing to a large object", &error);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::{
        charset::UsAscii,
        handles::InMemoryLobs,
        lob::{ClosedFlag, LobStreamOptions},
    };

    use super::AsciiOutputStream;

    #[test]
    fn characters_are_stored_on_flush() {
        let lobs = InMemoryLobs::new();
        let id = lobs.create_clob("");
        let mut stream = AsciiOutputStream::new(&lobs, id, 0);

        stream.write_all(b"Hello").unwrap();
        assert_eq!("", lobs.clob_to_string(id).unwrap());

        stream.flush().unwrap();
        assert_eq!("Hello", lobs.clob_to_string(id).unwrap());
    }

    #[test]
    fn full_buffer_is_stored_eagerly() {
        let lobs = InMemoryLobs::new();
        let id = lobs.create_clob("");
        let options = LobStreamOptions {
            char_window: 4,
            byte_buffer: 1,
        };
        let mut stream =
            AsciiOutputStream::with_options(&lobs, id, 0, &UsAscii, ClosedFlag::new(), options);

        stream.write_all(b"abcdefghij").unwrap();

        // Two full batches of four characters, two still pending
        assert_eq!("abcdefgh", lobs.clob_to_string(id).unwrap());
        stream.close().unwrap();
        assert_eq!("abcdefghij", lobs.clob_to_string(id).unwrap());
    }

    #[test]
    fn overwrite_in_the_middle() {
        let lobs = InMemoryLobs::new();
        let id = lobs.create_clob("Hello, World!");
        let mut stream = AsciiOutputStream::new(&lobs, id, 7);

        stream.write_all(b"Rust!").unwrap();
        stream.close().unwrap();

        assert_eq!("Hello, Rust!!", lobs.clob_to_string(id).unwrap());
    }

    #[test]
    fn non_ascii_bytes_are_replaced() {
        let lobs = InMemoryLobs::new();
        let id = lobs.create_clob("");
        let mut stream = AsciiOutputStream::new(&lobs, id, 0);

        stream.write_all("aä".as_bytes()).unwrap();
        stream.close().unwrap();

        assert_eq!("a\u{FFFD}\u{FFFD}", lobs.clob_to_string(id).unwrap());
    }

    #[test]
    fn drop_stores_pending_characters() {
        let lobs = InMemoryLobs::new();
        let id = lobs.create_clob("");
        {
            let mut stream = AsciiOutputStream::new(&lobs, id, 0);
            stream.write_all(b"dropped").unwrap();
        }
        assert_eq!("dropped", lobs.clob_to_string(id).unwrap());
    }

    #[test]
    fn pending_characters_of_closed_owner_are_reported() {
        let lobs = InMemoryLobs::new();
        let id = lobs.create_clob("");
        let owner = ClosedFlag::new();
        let mut stream = AsciiOutputStream::with_options(
            &lobs,
            id,
            0,
            &UsAscii,
            owner.clone(),
            LobStreamOptions::default(),
        );
        stream.write_all(b"important").unwrap();

        owner.close();

        assert!(stream.close().is_err());
        assert_eq!("", lobs.clob_to_string(id).unwrap());
        // Reported once, afterwards the stream is closed
        stream.close().unwrap();
    }

    #[test]
    fn closing_without_pending_characters_after_owner_is_fine() {
        let lobs = InMemoryLobs::new();
        let id = lobs.create_clob("");
        let owner = ClosedFlag::new();
        let mut stream = AsciiOutputStream::with_options(
            &lobs,
            id,
            0,
            &UsAscii,
            owner.clone(),
            LobStreamOptions::default(),
        );
        stream.write_all(b"stored").unwrap();
        stream.flush().unwrap();

        owner.close();

        stream.close().unwrap();
        assert_eq!("stored", lobs.clob_to_string(id).unwrap());
    }

    #[test]
    fn flush_after_close_fails_but_close_does_not() {
        let lobs = InMemoryLobs::new();
        let id = lobs.create_clob("");
        let mut stream = AsciiOutputStream::new(&lobs, id, 0);

        stream.close().unwrap();

        assert!(Write::flush(&mut stream).is_err());
        assert!(stream.write_all(b"x").is_err());
        stream.close().unwrap();
    }
}
