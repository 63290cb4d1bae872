//! Streaming access to character large objects.
//!
//! [`ClobClient`] is the client facing value of a `CLOB`. It hands out blocking byte and character
//! streams over the object, which fetch (or store) the content window by window, so large texts
//! never need to be materialized in memory as a whole.
//!
//! | View                   | Direction | Type                  | Buffering                    |
//! |------------------------|-----------|-----------------------|------------------------------|
//! | `character_stream`     | read      | [`ClobReader`]        | character window             |
//! | `ascii_stream`         | read      | [`AsciiInputStream`]  | character window, byte stage |
//! | `set_character_stream` | write     | [`ClobWriter`]        | none                         |
//! | `set_ascii_stream`     | write     | [`AsciiOutputStream`] | pending characters           |

mod ascii_reader;
mod ascii_writer;
mod char_reader;
mod char_writer;
mod clob;

use std::{cell::Cell, io, rc::Rc};

use crate::{Error, row::UpdatableRow};

pub use self::{
    ascii_reader::AsciiInputStream,
    ascii_writer::AsciiOutputStream,
    char_reader::{CharRead, ClobReader},
    char_writer::{CharWrite, ClobWriter},
    clob::ClobClient,
};

/// Default number of characters fetched from, or buffered for, the engine in one go.
pub const DEFAULT_CHAR_WINDOW: usize = 64 * 1024;
/// Default initial size of the byte staging buffer. It grows on demand to the largest read
/// requested by the caller.
pub const DEFAULT_BYTE_BUFFER: usize = 1024;

/// Buffer sizes used by the streams of a large object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LobStreamOptions {
    /// Number of characters fetched from (or buffered for) the engine in one call.
    pub char_window: usize,
    /// Initial capacity of the byte staging buffer of the byte views.
    pub byte_buffer: usize,
}

impl Default for LobStreamOptions {
    fn default() -> Self {
        Self {
            char_window: DEFAULT_CHAR_WINDOW,
            byte_buffer: DEFAULT_BYTE_BUFFER,
        }
    }
}

impl LobStreamOptions {
    /// Rejects zero sized buffers, with which no stream could make progress.
    pub fn validate(&self) -> Result<(), Error> {
        if self.char_window == 0 {
            return Err(Error::InvalidArgument(
                "character window of a large object stream must not be empty".to_owned(),
            ));
        }
        if self.byte_buffer == 0 {
            return Err(Error::InvalidArgument(
                "byte buffer of a large object stream must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Shared view on whether the owner of a stream (usually a [`ClobClient`]) has been closed.
/// Streams query it before each operation, so closing the owner invalidates all streams opened
/// from it.
#[derive(Debug, Clone, Default)]
pub struct ClosedFlag(Rc<Cell<bool>>);

impl ClosedFlag {
    /// A flag which is not yet set. Use this for streams without an owner.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.0.get()
    }

    /// Sets the flag for every clone sharing it. Idempotent.
    pub fn close(&self) {
        self.0.set(true)
    }
}

/// Ties a write stream to the edit session its working copy has been created for. The session
/// ends if the row applies or cancels its updates, or if the client discards them.
#[derive(Debug, Clone)]
pub(crate) struct EditLease {
    row: UpdatableRow,
    edit_session: u64,
    discarded: ClosedFlag,
}

impl EditLease {
    fn is_live(&self) -> bool {
        !self.discarded.is_closed() && self.row.edit_session() == self.edit_session
    }
}

/// `true` if the stream has been bound to an edit session which is over by now.
fn edit_ended(edit: &Option<EditLease>) -> bool {
    edit.as_ref().is_some_and(|lease| !lease.is_live())
}

/// Validates the window `start..start + length` against `full_length`. All values are zero based
/// character counts. A zero length window directly at the end is valid.
///
/// ```
/// use engine_driver::lob::check_bounds;
///
/// assert!(check_bounds(10, 10, 0).is_ok());
/// assert!(check_bounds(10, 11, 0).is_err());
/// assert!(check_bounds(10, 4, 7).is_err());
/// ```
pub fn check_bounds(full_length: u64, start: u64, length: u64) -> Result<(), Error> {
    if length > full_length {
        return Err(Error::out_of_range("length", length));
    }
    if start > full_length - length {
        return Err(Error::out_of_range("pos", start.saturating_add(1)));
    }
    Ok(())
}

/// Converts a one based position into a zero based offset.
fn zero_based(pos: u64, argument: &'static str) -> Result<u64, Error> {
    pos.checked_sub(1)
        .ok_or_else(|| Error::out_of_range(argument, pos))
}

/// Error reported by streams used after they, or their owner, have been closed.
fn closed_stream() -> io::Error {
    io::Error::other(Error::LobClosed)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use crate::{Error, row::UpdatableRow};

    use super::{ClosedFlag, LobStreamOptions, check_bounds};

    #[test_case(10, 0, 10; "whole object")]
    #[test_case(10, 10, 0; "empty window at the end")]
    #[test_case(0, 0, 0; "empty object")]
    #[test_case(10, 3, 4; "inner window")]
    fn bounds_accepted(full: u64, start: u64, length: u64) {
        assert!(check_bounds(full, start, length).is_ok());
    }

    #[test_case(10, 11, 0; "start past the end")]
    #[test_case(10, 0, 11; "longer than the object")]
    #[test_case(10, 5, 6; "window past the end")]
    #[test_case(10, u64::MAX, 0; "huge start")]
    fn bounds_rejected(full: u64, start: u64, length: u64) {
        let error = check_bounds(full, start, length).unwrap_err();
        assert!(matches!(error, Error::OutOfRange { .. }));
    }

    #[test]
    fn closed_flag_is_shared() {
        let owner = ClosedFlag::new();
        let stream_view = owner.clone();

        owner.close();

        assert!(stream_view.is_closed());
    }

    #[test]
    fn zero_sized_window_is_rejected() {
        let options = LobStreamOptions {
            char_window: 0,
            ..LobStreamOptions::default()
        };
        assert!(options.validate().is_err());
    }
}
