use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use widestring::{U16Str, U16String};

use super::{ClobId, LobSession, StorageError};

/// Engine error code reported for handles unknown to the store.
const UNKNOWN_LOB: i32 = 3474;
/// Engine error code reported for positions outside of the stored object.
const POSITION_OUT_OF_RANGE: i32 = 3431;

/// Keeps character large objects in memory. Implements [`LobSession`] and is used to exercise the
/// adapters of this crate without an engine, e.g. in tests.
///
/// # Example
///
/// ```
/// use engine_driver::{handles::InMemoryLobs, ClobClient};
///
/// let lobs = InMemoryLobs::new();
/// let id = lobs.create_clob("Hello, World!");
/// let clob = ClobClient::new(&lobs, id);
/// assert_eq!("World", clob.get_sub_string(8, 5).unwrap());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryLobs {
    state: Mutex<Store>,
}

#[derive(Debug, Default)]
struct Store {
    next_id: u64,
    clobs: HashMap<ClobId, Vec<u16>>,
}

impl Store {
    fn clob(&self, clob: ClobId) -> Result<&Vec<u16>, StorageError> {
        self.clobs
            .get(&clob)
            .ok_or_else(|| StorageError::new(UNKNOWN_LOB, format!("{clob} does not exist")))
    }

    fn clob_mut(&mut self, clob: ClobId) -> Result<&mut Vec<u16>, StorageError> {
        self.clobs
            .get_mut(&clob)
            .ok_or_else(|| StorageError::new(UNKNOWN_LOB, format!("{clob} does not exist")))
    }

    fn insert(&mut self, content: Vec<u16>) -> ClobId {
        self.next_id += 1;
        let id = ClobId(self.next_id);
        self.clobs.insert(id, content);
        id
    }
}

impl InMemoryLobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `text` as a new character large object.
    pub fn create_clob(&self, text: &str) -> ClobId {
        self.create_clob_from_chars(text.encode_utf16().collect())
    }

    /// Store UTF-16 code units as a new character large object. The code units are not validated,
    /// so unpaired surrogates are stored as they are.
    pub fn create_clob_from_chars(&self, chars: Vec<u16>) -> ClobId {
        self.lock().insert(chars)
    }

    /// Complete content of `clob` as UTF-8. Unpaired surrogates are replaced.
    pub fn clob_to_string(&self, clob: ClobId) -> Result<String, StorageError> {
        let state = self.lock();
        let chars = state.clob(clob)?;
        Ok(U16Str::from_slice(chars).to_string_lossy())
    }

    /// Number of objects currently held by the store.
    pub fn num_clobs(&self) -> usize {
        self.lock().clobs.len()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        // The store holds no invariants which a panicking writer could break, so we carry on with
        // a poisoned lock.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LobSession for InMemoryLobs {
    fn clob_length(&self, clob: ClobId) -> Result<u64, StorageError> {
        Ok(self.lock().clob(clob)?.len() as u64)
    }

    fn clob_get_chars(
        &self,
        clob: ClobId,
        position: u64,
        count: usize,
    ) -> Result<Vec<u16>, StorageError> {
        let state = self.lock();
        let chars = state.clob(clob)?;
        let start = checked_position(position, chars.len())?;
        let end = start.saturating_add(count).min(chars.len());
        Ok(chars[start..end].to_vec())
    }

    fn clob_set_chars(
        &self,
        clob: ClobId,
        position: u64,
        chars: &[u16],
    ) -> Result<(), StorageError> {
        let mut state = self.lock();
        let content = state.clob_mut(clob)?;
        let start = checked_position(position, content.len())?;
        let overlap = chars.len().min(content.len() - start);
        content[start..start + overlap].copy_from_slice(&chars[..overlap]);
        content.extend_from_slice(&chars[overlap..]);
        Ok(())
    }

    fn clob_position(
        &self,
        clob: ClobId,
        needle: &U16Str,
        from: u64,
    ) -> Result<Option<u64>, StorageError> {
        let state = self.lock();
        let haystack = state.clob(clob)?;
        let needle = needle.as_slice();
        let Ok(from) = usize::try_from(from) else {
            return Ok(None);
        };
        if from > haystack.len() || needle.len() > haystack.len() - from {
            return Ok(None);
        }
        if needle.is_empty() {
            return Ok(Some(from as u64));
        }
        let found = haystack[from..]
            .windows(needle.len())
            .position(|window| window == needle)
            .map(|offset| (from + offset) as u64);
        Ok(found)
    }

    fn clob_truncate(&self, clob: ClobId, new_length: u64) -> Result<(), StorageError> {
        let mut state = self.lock();
        let content = state.clob_mut(clob)?;
        let new_length = checked_position(new_length, content.len())?;
        content.truncate(new_length);
        Ok(())
    }

    fn clob_duplicate(&self, clob: ClobId) -> Result<ClobId, StorageError> {
        let mut state = self.lock();
        let copy = state.clob(clob)?.clone();
        Ok(state.insert(copy))
    }
}

/// Converts `position` into an index which is at most `len`.
fn checked_position(position: u64, len: usize) -> Result<usize, StorageError> {
    usize::try_from(position)
        .ok()
        .filter(|&position| position <= len)
        .ok_or_else(|| {
            StorageError::new(
                POSITION_OUT_OF_RANGE,
                format!("position {position} is beyond the end of the object (length {len})"),
            )
        })
}
