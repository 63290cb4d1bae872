use log::debug;
use widestring::U16String;

use crate::{
    Error,
    charset::UsAscii,
    handles::{ClobId, LobSession},
    row::UpdatableRow,
    value::Value,
};

use super::{
    AsciiInputStream, AsciiOutputStream, ClobReader, ClobWriter, ClosedFlag, EditLease,
    LobStreamOptions, check_bounds, zero_based,
};

/// Client side value of a character large object (`CLOB`).
///
/// Reads go to the object the client has been created with. If the client is attached to a column
/// of an [`UpdatableRow`], it may also be modified. The first modification within an edit session
/// of the row duplicates the object and publishes the duplicate as the pending value of the
/// column. All further modifications in the same edit session go to the duplicate, so other
/// readers of the original object are not affected until the row applies its updates.
///
/// Positions are one based and measured in UTF-16 code units.
#[derive(Debug)]
pub struct ClobClient<'s, S> {
    session: &'s S,
    original: ClobId,
    edit: Option<Edit>,
    row: Option<RowBinding>,
    closed: ClosedFlag,
    options: LobStreamOptions,
}

/// Working copy created by the first modification of an edit session.
#[derive(Debug)]
struct Edit {
    working: ClobId,
    edit_session: u64,
    /// Set once the client discards the working copy. Ends the write streams opened on it.
    discarded: ClosedFlag,
}

#[derive(Debug)]
struct RowBinding {
    row: UpdatableRow,
    column: u16,
}

impl<'s, S> ClobClient<'s, S>
where
    S: LobSession,
{
    /// Read only client for `clob`.
    pub fn new(session: &'s S, clob: ClobId) -> Self {
        Self {
            session,
            original: clob,
            edit: None,
            row: None,
            closed: ClosedFlag::new(),
            options: LobStreamOptions::default(),
        }
    }

    /// Client for the `clob` held by the one based `column` of `row`. Writable if the row is.
    pub fn attached(session: &'s S, clob: ClobId, row: UpdatableRow, column: u16) -> Self {
        Self {
            row: Some(RowBinding { row, column }),
            ..Self::new(session, clob)
        }
    }

    /// Buffer sizes used by all streams opened from this client.
    pub fn with_options(mut self, options: LobStreamOptions) -> Result<Self, Error> {
        options.validate()?;
        self.options = options;
        Ok(self)
    }

    /// Number of characters in the object.
    pub fn length(&self) -> Result<u64, Error> {
        self.ensure_open()?;
        Ok(self.session.clob_length(self.current_clob())?)
    }

    /// `length` characters starting at the one based position `pos`. Unpaired surrogates are
    /// replaced.
    pub fn get_sub_string(&self, pos: u64, length: usize) -> Result<String, Error> {
        let chars = self.get_sub_chars(pos, length)?;
        Ok(chars.to_string_lossy())
    }

    /// Same as [`Self::get_sub_string`], but returns the UTF-16 code units as they are stored.
    pub fn get_sub_chars(&self, pos: u64, length: usize) -> Result<U16String, Error> {
        self.ensure_open()?;
        let start = zero_based(pos, "pos")?;
        check_bounds(self.length()?, start, length as u64)?;
        Ok(self
            .session
            .clob_get_sub_string(self.current_clob(), start, length)?)
    }

    /// One based position of the first occurrence of `pattern` at or after `start`. `None` if
    /// there is none.
    pub fn position(&self, pattern: &str, start: u64) -> Result<Option<u64>, Error> {
        self.position_of_chars(U16String::from_str(pattern), start)
    }

    /// Like [`Self::position`], but searches for the content of another large object.
    pub fn position_of<T>(
        &self,
        pattern: &ClobClient<'_, T>,
        start: u64,
    ) -> Result<Option<u64>, Error>
    where
        T: LobSession,
    {
        let length = pattern.length()?;
        let length = usize::try_from(length).map_err(|_| Error::out_of_range("length", length))?;
        let needle = pattern.get_sub_chars(1, length)?;
        self.position_of_chars(needle, start)
    }

    fn position_of_chars(&self, needle: U16String, start: u64) -> Result<Option<u64>, Error> {
        self.ensure_open()?;
        let from = zero_based(start, "start")?;
        let found = self
            .session
            .clob_position(self.current_clob(), &needle, from)?;
        Ok(found.map(|position| position + 1))
    }

    /// Overwrites the object with `text`, starting at the one based `pos`. Writing at
    /// `length + 1` appends. Returns the number of characters written.
    pub fn set_string(&mut self, pos: u64, text: &str) -> Result<usize, Error> {
        let chars: Vec<u16> = text.encode_utf16().collect();
        self.set_chars(pos, &chars)
    }

    /// Like [`Self::set_string`], but only writes `len` characters of `text` beginning with
    /// `offset`. Offset and length are measured in UTF-16 code units.
    pub fn set_string_range(
        &mut self,
        pos: u64,
        text: &str,
        offset: usize,
        len: usize,
    ) -> Result<usize, Error> {
        let chars: Vec<u16> = text.encode_utf16().collect();
        check_bounds(chars.len() as u64, offset as u64, len as u64)?;
        self.set_chars(pos, &chars[offset..offset + len])
    }

    fn set_chars(&mut self, pos: u64, chars: &[u16]) -> Result<usize, Error> {
        let start = self.writable_position(pos)?;
        let working = self.working_copy()?;
        self.session.clob_set_chars(working, start, chars)?;
        Ok(chars.len())
    }

    /// Cuts the object down to `len` characters.
    pub fn truncate(&mut self, len: u64) -> Result<(), Error> {
        self.ensure_writable()?;
        if len > self.length()? {
            return Err(Error::out_of_range("len", len));
        }
        let working = self.working_copy()?;
        self.session.clob_truncate(working, len)?;
        Ok(())
    }

    /// Character stream over the whole object.
    pub fn character_stream(&self) -> Result<ClobReader<'s, S>, Error> {
        self.ensure_open()?;
        let length = self.length()?;
        Ok(self.reader(0, length))
    }

    /// Character stream over `length` characters starting at the one based `pos`.
    pub fn character_stream_range(
        &self,
        pos: u64,
        length: u64,
    ) -> Result<ClobReader<'s, S>, Error> {
        self.ensure_open()?;
        let start = zero_based(pos, "pos")?;
        check_bounds(self.length()?, start, length)?;
        Ok(self.reader(start, length))
    }

    /// US-ASCII byte stream over the whole object. Characters outside of US-ASCII are read as `?`.
    pub fn ascii_stream(&self) -> Result<AsciiInputStream<ClobReader<'s, S>>, Error> {
        let reader = self.character_stream()?;
        Ok(AsciiInputStream::with_options(
            reader,
            UsAscii,
            self.closed.clone(),
            self.options,
        ))
    }

    /// Stream storing US-ASCII bytes into the object, beginning at the one based `pos`.
    pub fn set_ascii_stream(&mut self, pos: u64) -> Result<AsciiOutputStream<'s, S>, Error> {
        let start = self.writable_position(pos)?;
        let working = self.working_copy()?;
        Ok(AsciiOutputStream::with_options(
            self.session,
            working,
            start,
            &UsAscii,
            self.closed.clone(),
            self.options,
        )
        .within_edit(self.edit_lease()))
    }

    /// Stream storing characters into the object, beginning at the one based `pos`.
    pub fn set_character_stream(&mut self, pos: u64) -> Result<ClobWriter<'s, S>, Error> {
        let start = self.writable_position(pos)?;
        let working = self.working_copy()?;
        Ok(
            ClobWriter::with_owner(self.session, working, start, self.closed.clone())
                .within_edit(self.edit_lease()),
        )
    }

    /// Discards the working copy of the current edit session. The column reverts to the original
    /// object.
    pub fn clear_updates(&mut self) -> Result<(), Error> {
        self.ensure_open()?;
        let current = self.current_clob();
        if let (Some(edit), Some(binding)) = (self.edit.take(), &self.row) {
            edit.discarded.close();
            if edit.edit_session == binding.row.edit_session() {
                binding.row.clear_parameter(binding.column)?;
                debug!(
                    "Discarded {} for column {}. It is no longer referenced.",
                    edit.working, binding.column
                );
            } else {
                self.original = current;
            }
        }
        Ok(())
    }

    /// `true` if this client modified the object in the current edit session of its row.
    pub fn is_update_in_progress(&self) -> bool {
        self.live_edit().is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.row
            .as_ref()
            .is_some_and(|binding| binding.row.is_updatable())
    }

    /// The object reads and writes currently go to. This is the working copy while an edit session
    /// is in progress.
    pub fn current_clob(&self) -> ClobId {
        match (&self.edit, &self.row) {
            (Some(edit), Some(binding)) if edit.edit_session == binding.row.edit_session() => {
                edit.working
            }
            // The edit session has ended. If it has been applied, the working copy is the
            // committed value of the column now.
            (Some(_), Some(binding)) => binding
                .row
                .committed_clob(binding.column)
                .unwrap_or(self.original),
            _ => self.original,
        }
    }

    /// The object this client has been created with, or adopted after applied updates.
    pub fn original_clob(&self) -> ClobId {
        self.original
    }

    /// Closes the client and invalidates all streams opened from it. Idempotent.
    pub fn close(&mut self) {
        self.closed.close();
    }

    /// Alias for [`Self::close`].
    pub fn free(&mut self) {
        self.close()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_closed()
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.closed.is_closed() {
            Err(Error::LobClosed)
        } else {
            Ok(())
        }
    }

    fn ensure_writable(&self) -> Result<(), Error> {
        self.ensure_open()?;
        if self.is_writable() {
            Ok(())
        } else {
            Err(Error::NotWritable)
        }
    }

    /// Validates the one based `pos` for writing and converts it into a zero based offset.
    /// Writing may start at most directly after the last character.
    fn writable_position(&self, pos: u64) -> Result<u64, Error> {
        self.ensure_open()?;
        let start = zero_based(pos, "pos")?;
        self.ensure_writable()?;
        if start > self.length()? {
            return Err(Error::out_of_range("pos", pos));
        }
        Ok(start)
    }

    fn live_edit(&self) -> Option<&Edit> {
        match (&self.edit, &self.row) {
            (Some(edit), Some(binding)) if edit.edit_session == binding.row.edit_session() => {
                Some(edit)
            }
            _ => None,
        }
    }

    /// Binds write streams to the current edit session.
    fn edit_lease(&self) -> Option<EditLease> {
        match (&self.edit, &self.row) {
            (Some(edit), Some(binding)) => Some(EditLease {
                row: binding.row.clone(),
                edit_session: edit.edit_session,
                discarded: edit.discarded.clone(),
            }),
            _ => None,
        }
    }

    fn reader(&self, start: u64, length: u64) -> ClobReader<'s, S> {
        ClobReader::with_options(
            self.session,
            self.current_clob(),
            start,
            length,
            self.closed.clone(),
            self.options,
        )
    }

    /// The object modifications go to. Duplicates the original on the first modification of an
    /// edit session.
    fn working_copy(&mut self) -> Result<ClobId, Error> {
        if let Some(edit) = self.live_edit() {
            return Ok(edit.working);
        }
        // Adopt the outcome of an edit session which ended in the meantime.
        let current = self.current_clob();
        if let Some(edit) = self.edit.take() {
            if edit.working != current {
                debug!(
                    "Updates of {} have been cancelled. {} is no longer referenced.",
                    self.original, edit.working
                );
            }
        }
        self.original = current;

        let binding = self.row.as_ref().ok_or(Error::NotWritable)?;
        binding.row.start_update(binding.column)?;
        let working = self.session.clob_duplicate(self.original)?;
        binding
            .row
            .set_parameter(binding.column, Value::Clob(working))?;
        debug!(
            "Duplicated {} into {working} for updating column {}.",
            self.original, binding.column
        );
        self.edit = Some(Edit {
            working,
            edit_session: binding.row.edit_session(),
            discarded: ClosedFlag::new(),
        });
        Ok(working)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use crate::{Error, handles::InMemoryLobs, row::UpdatableRow, value::Value};

    use super::ClobClient;

    #[test]
    fn sub_string_and_position() {
        let lobs = InMemoryLobs::new();
        let id = lobs.create_clob("Hello, World!");
        let clob = ClobClient::new(&lobs, id);

        assert_eq!(13, clob.length().unwrap());
        assert_eq!("Hello", clob.get_sub_string(1, 5).unwrap());
        assert_eq!("", clob.get_sub_string(14, 0).unwrap());
        assert_eq!(Some(8), clob.position("World", 1).unwrap());
        assert_eq!(None, clob.position("World", 9).unwrap());
        assert_eq!(Some(5), clob.position("o", 1).unwrap());
        assert_eq!(Some(9), clob.position("o", 6).unwrap());
    }

    #[test]
    fn sub_string_out_of_range() {
        let lobs = InMemoryLobs::new();
        let id = lobs.create_clob("abc");
        let clob = ClobClient::new(&lobs, id);

        assert!(matches!(
            clob.get_sub_string(0, 1),
            Err(Error::OutOfRange { argument: "pos", .. })
        ));
        assert!(matches!(
            clob.get_sub_string(5, 0),
            Err(Error::OutOfRange { .. })
        ));
        assert!(matches!(
            clob.get_sub_string(1, 4),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn position_of_other_clob() {
        let lobs = InMemoryLobs::new();
        let haystack = lobs.create_clob("abcabc");
        let needle = lobs.create_clob("ca");
        let haystack = ClobClient::new(&lobs, haystack);
        let needle = ClobClient::new(&lobs, needle);

        assert_eq!(Some(3), haystack.position_of(&needle, 1).unwrap());
    }

    #[test]
    fn read_only_clob_is_not_writable() {
        let lobs = InMemoryLobs::new();
        let id = lobs.create_clob("abc");
        let mut clob = ClobClient::new(&lobs, id);

        assert!(matches!(clob.set_string(1, "x"), Err(Error::NotWritable)));
        assert!(matches!(clob.set_ascii_stream(1), Err(Error::NotWritable)));
        assert!(matches!(clob.set_character_stream(1), Err(Error::NotWritable)));
        assert!(matches!(clob.truncate(1), Err(Error::NotWritable)));
    }

    #[test]
    fn clob_of_read_only_row_is_not_writable() {
        let lobs = InMemoryLobs::new();
        let id = lobs.create_clob("abc");
        let row = UpdatableRow::read_only(vec![Value::Clob(id)]);
        let mut clob = ClobClient::attached(&lobs, id, row, 1);

        assert!(!clob.is_writable());
        assert!(matches!(clob.set_string(1, "x"), Err(Error::NotWritable)));
    }

    #[test]
    fn write_position_must_be_positive() {
        let lobs = InMemoryLobs::new();
        let id = lobs.create_clob("abc");
        let row = UpdatableRow::new(vec![Value::Clob(id)]);
        let mut clob = ClobClient::attached(&lobs, id, row, 1);

        assert!(matches!(
            clob.set_character_stream(0),
            Err(Error::OutOfRange { argument: "pos", .. })
        ));
        // Nothing has been duplicated
        assert_eq!(1, lobs.num_clobs());
    }

    #[test]
    fn one_duplicate_per_edit_session() {
        let lobs = InMemoryLobs::new();
        let id = lobs.create_clob("abc");
        let row = UpdatableRow::new(vec![Value::Clob(id)]);
        let mut clob = ClobClient::attached(&lobs, id, row.clone(), 1);

        clob.set_string(1, "x").unwrap();
        clob.set_string(2, "y").unwrap();
        let mut writer = clob.set_ascii_stream(3).unwrap();
        writer.write_all(b"z").unwrap();
        writer.close().unwrap();

        assert_eq!(2, lobs.num_clobs());
        assert!(clob.is_update_in_progress());
        assert_eq!(Value::Clob(clob.current_clob()), row.value(1).unwrap());
        assert_eq!("xyz", lobs.clob_to_string(clob.current_clob()).unwrap());
        assert_eq!("abc", lobs.clob_to_string(id).unwrap());
    }

    #[test]
    fn applied_updates_become_original() {
        let lobs = InMemoryLobs::new();
        let id = lobs.create_clob("abc");
        let row = UpdatableRow::new(vec![Value::Clob(id)]);
        let mut clob = ClobClient::attached(&lobs, id, row.clone(), 1);

        clob.set_string(1, "x").unwrap();
        let working = clob.current_clob();
        row.apply_updates();

        assert!(!clob.is_update_in_progress());
        assert_eq!(working, clob.current_clob());
        assert_eq!("xbc", clob.get_sub_string(1, 3).unwrap());

        // The next edit session duplicates the committed copy
        clob.set_string(2, "y").unwrap();
        assert_eq!(working, clob.original_clob());
        assert_ne!(working, clob.current_clob());
        assert_eq!("xyc", clob.get_sub_string(1, 3).unwrap());
        assert_eq!(3, lobs.num_clobs());
    }

    #[test]
    fn cancelled_updates_revert_to_original() {
        let lobs = InMemoryLobs::new();
        let id = lobs.create_clob("abc");
        let row = UpdatableRow::new(vec![Value::Clob(id)]);
        let mut clob = ClobClient::attached(&lobs, id, row.clone(), 1);

        clob.set_string(1, "x").unwrap();
        row.cancel_updates();

        assert_eq!(id, clob.current_clob());
        assert_eq!("abc", clob.get_sub_string(1, 3).unwrap());
    }

    #[test]
    fn truncate_working_copy() {
        let lobs = InMemoryLobs::new();
        let id = lobs.create_clob("abcdef");
        let row = UpdatableRow::new(vec![Value::Clob(id)]);
        let mut clob = ClobClient::attached(&lobs, id, row, 1);

        assert!(matches!(clob.truncate(7), Err(Error::OutOfRange { .. })));
        clob.truncate(2).unwrap();

        assert_eq!(2, clob.length().unwrap());
        assert_eq!("abcdef", lobs.clob_to_string(id).unwrap());
    }

    #[test]
    fn set_string_range_writes_slice() {
        let lobs = InMemoryLobs::new();
        let id = lobs.create_clob("....");
        let row = UpdatableRow::new(vec![Value::Clob(id)]);
        let mut clob = ClobClient::attached(&lobs, id, row, 1);

        assert_eq!(2, clob.set_string_range(2, "abcd", 1, 2).unwrap());
        assert_eq!(".bc.", clob.get_sub_string(1, 4).unwrap());
        assert!(matches!(
            clob.set_string_range(1, "abcd", 3, 2),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn operations_after_close_fail() {
        let lobs = InMemoryLobs::new();
        let id = lobs.create_clob("abc");
        let mut clob = ClobClient::new(&lobs, id);
        let mut stream = clob.ascii_stream().unwrap();

        clob.free();
        clob.close();

        assert!(clob.is_closed());
        assert!(matches!(clob.length(), Err(Error::LobClosed)));
        assert!(matches!(clob.character_stream(), Err(Error::LobClosed)));
        assert!(stream.read(&mut [0u8; 4]).is_err());
        // Closing a stream whose owner is closed is tolerated
        stream.close().unwrap();
    }
}
