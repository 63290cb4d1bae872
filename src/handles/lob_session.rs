use std::fmt;

use thiserror::Error as ThisError;
use widestring::{U16Str, U16String};

/// Opaque handle to a character large object living inside the engine. The handle is only
/// meaningful together with the session which issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClobId(pub u64);

impl fmt::Display for ClobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CLOB#{}", self.0)
    }
}

/// Failure reported by the engine while performing a large object operation.
///
/// This is the native error type of the collaborator. Within the database API it is wrapped into
/// [`crate::Error::Storage`], at stream boundaries it is translated into [`std::io::Error`].
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("{message} (engine error code {code})")]
pub struct StorageError {
    /// Engine specific error code. `0` if the engine did not provide one.
    pub code: i32,
    /// Human readable description of the failure.
    pub message: String,
}

impl StorageError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Large object primitives offered by an engine session.
///
/// All positions and counts are measured in characters, which are UTF-16 code units. Positions
/// are zero based. Implementations are expected to serialize access internally, so all methods
/// take `&self`.
pub trait LobSession {
    /// Number of characters currently stored in `clob`.
    fn clob_length(&self, clob: ClobId) -> Result<u64, StorageError>;

    /// Fetch up to `count` characters starting at `position`. Fewer characters are returned if the
    /// object ends earlier.
    fn clob_get_chars(
        &self,
        clob: ClobId,
        position: u64,
        count: usize,
    ) -> Result<Vec<u16>, StorageError>;

    /// Overwrite characters starting at `position`. Writing at the current length appends,
    /// writing beyond it is an error.
    fn clob_set_chars(&self, clob: ClobId, position: u64, chars: &[u16])
    -> Result<(), StorageError>;

    /// Same as [`Self::clob_get_chars`], but packaged as a wide string.
    fn clob_get_sub_string(
        &self,
        clob: ClobId,
        position: u64,
        count: usize,
    ) -> Result<U16String, StorageError> {
        self.clob_get_chars(clob, position, count)
            .map(U16String::from_vec)
    }

    /// Zero based position of the first occurrence of `needle` at or after `from`. `None` if there
    /// is no such occurrence.
    fn clob_position(
        &self,
        clob: ClobId,
        needle: &U16Str,
        from: u64,
    ) -> Result<Option<u64>, StorageError>;

    /// Cut the object down to `new_length` characters.
    fn clob_truncate(&self, clob: ClobId, new_length: u64) -> Result<(), StorageError>;

    /// Create an independent copy of `clob`. Mutations of either object are not visible through the
    /// other one.
    fn clob_duplicate(&self, clob: ClobId) -> Result<ClobId, StorageError>;
}
