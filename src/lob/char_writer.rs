use std::io;

use crate::{
    error::storage_to_io,
    handles::{ClobId, LobSession},
};

use super::{ClosedFlag, EditLease, closed_stream, edit_ended};

/// A sink for UTF-16 code units.
pub trait CharWrite {
    /// Writes all of `chars`.
    fn write_chars(&mut self, chars: &[u16]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Idempotent.
    fn close(&mut self) -> io::Result<()>;
}

/// Writes characters into a character large object. Every call to [`CharWrite::write_chars`]
/// is stored immediately, there is no buffering.
#[derive(Debug)]
pub struct ClobWriter<'s, S> {
    session: &'s S,
    clob: ClobId,
    /// Zero based position the next characters are stored at.
    position: u64,
    closed: bool,
    owner: ClosedFlag,
    edit: Option<EditLease>,
}

impl<'s, S> ClobWriter<'s, S>
where
    S: LobSession,
{
    /// Writer storing characters into `clob`, starting at the zero based `position`.
    pub fn new(session: &'s S, clob: ClobId, position: u64) -> Self {
        Self::with_owner(session, clob, position, ClosedFlag::new())
    }

    /// Like [`Self::new`], but every write fails once `owner` is closed.
    pub fn with_owner(session: &'s S, clob: ClobId, position: u64, owner: ClosedFlag) -> Self {
        Self {
            session,
            clob,
            position,
            closed: false,
            owner,
            edit: None,
        }
    }

    /// Every write fails once `edit` is over.
    pub(crate) fn within_edit(mut self, edit: Option<EditLease>) -> Self {
        self.edit = edit;
        self
    }

    /// Writes the UTF-16 representation of `text`.
    pub fn write_str(&mut self, text: &str) -> io::Result<()> {
        let chars: Vec<u16> = text.encode_utf16().collect();
        self.write_chars(&chars)
    }
}

impl<S> CharWrite for ClobWriter<'_, S>
where
    S: LobSession,
{
    fn write_chars(&mut self, chars: &[u16]) -> io::Result<()> {
        if self.closed || self.owner.is_closed() || edit_ended(&self.edit) {
            return Err(closed_stream());
        }
        if chars.is_empty() {
            return Ok(());
        }
        self.session
            .clob_set_chars(self.clob, self.position, chars)
            .map_err(storage_to_io)?;
        self.position += chars.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}
