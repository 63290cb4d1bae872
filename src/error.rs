use std::io;

use thiserror::Error as ThisError;

use crate::{
    ParameterMode,
    handles::{SqlType, State, StorageError},
};

/// Vendor error codes, following the numbering of the engine.
pub mod codes {
    /// Invalid argument in call. Also used for arguments out of range.
    pub const INVALID_ARGUMENT: i32 = 62;
    /// Column or parameter not found.
    pub const COLUMN_NOT_FOUND: i32 = 28;
    /// A parameter has not been set before execution.
    pub const PARAMETER_NOT_SET: i32 = 152;
    /// The statement is closed.
    pub const STATEMENT_CLOSED: i32 = 1251;
    /// The large object, or the stream over it, is closed.
    pub const LOB_CLOSED: i32 = 3475;
    /// Attempt to assign to a non updatable column.
    pub const NOT_UPDATABLE: i32 = 2500;
    /// Feature not supported.
    pub const NOT_SUPPORTED: i32 = 1500;
    /// Incompatible data type in conversion.
    pub const INCOMPATIBLE_CONVERSION: i32 = 5561;
    /// Numeric value out of range.
    pub const NUMERIC_OUT_OF_RANGE: i32 = 3403;
}

#[derive(Debug, ThisError)]
/// Error type returned by the database facing API of this crate. The stream adapters report
/// [`std::io::Error`] instead, as required by [`std::io::Read`] and [`std::io::Write`].
pub enum Error {
    /// A position, length or index lies outside of the range valid for the operation. Raised
    /// before the engine is called, so the operation has no side effects.
    #[error("Invalid argument in call: {argument}: {value}")]
    OutOfRange {
        /// Name of the offending argument.
        argument: &'static str,
        value: i64,
    },
    /// An argument is invalid for reasons other than its range.
    #[error("Invalid argument in call: {0}")]
    InvalidArgument(String),
    /// Attempt to open a writable view on, or modify, a large object which is not attached to an
    /// updatable row.
    #[error("Attempt to assign to a non-updatable column.")]
    NotWritable,
    /// The statement has been closed. Emitted by every operation on a closed
    /// [`crate::CallableStatement`], including lookups of parameter names which were valid before
    /// it has been closed.
    #[error("Statement is closed.")]
    StatementClosed,
    /// The large object wrapper has been closed (or freed).
    #[error("Large object is closed.")]
    LobClosed,
    /// No parameter is declared with the given name. Names are case sensitive.
    #[error("Column not found: {name}")]
    ParameterNotFound { name: String },
    /// An `IN` or `INOUT` parameter has not been set before execution.
    #[error("Parameter not set: {index}")]
    ParameterNotSet {
        /// One based parameter index.
        index: u16,
    },
    /// A parameter has been accessed in a direction its mode does not permit, e.g. reading the
    /// value of an `IN` parameter.
    #[error("Parameter {index} has mode {mode}, but {expected} is required.")]
    WrongParameterMode {
        /// One based parameter index.
        index: u16,
        mode: ParameterMode,
        /// Human readable description of the permitted modes, e.g. `"IN or INOUT"`.
        expected: &'static str,
    },
    /// A value can not be converted between the requested SQL types.
    #[error("Incompatible data type in conversion: from SQL type {from} to {to}, value: {value}")]
    IncompatibleConversion {
        from: SqlType,
        to: SqlType,
        /// Description of the value which failed to convert.
        value: String,
    },
    /// A numeric value does not fit into the target type.
    #[error("Numeric value out of range: {value} does not fit into {to}")]
    NumericOutOfRange { to: SqlType, value: String },
    #[error("Feature not supported: {0}")]
    NotSupported(&'static str),
    /// The engine reported a failure.
    #[error("The engine reported an error:\n{0}")]
    Storage(#[from] StorageError),
    /// Reading from, or writing to, a stream failed while transferring a value.
    #[error("Transferring data through a stream failed. IO error:\n{0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Vendor specific error code. See [`codes`].
    pub fn code(&self) -> i32 {
        match self {
            Error::OutOfRange { .. }
            | Error::InvalidArgument(_)
            | Error::WrongParameterMode { .. } => codes::INVALID_ARGUMENT,
            Error::NotWritable => codes::NOT_UPDATABLE,
            Error::StatementClosed => codes::STATEMENT_CLOSED,
            Error::LobClosed => codes::LOB_CLOSED,
            Error::ParameterNotFound { .. } => codes::COLUMN_NOT_FOUND,
            Error::ParameterNotSet { .. } => codes::PARAMETER_NOT_SET,
            Error::IncompatibleConversion { .. } => codes::INCOMPATIBLE_CONVERSION,
            Error::NumericOutOfRange { .. } => codes::NUMERIC_OUT_OF_RANGE,
            Error::NotSupported(_) => codes::NOT_SUPPORTED,
            Error::Storage(error) => error.code,
            Error::Io(_) => 0,
        }
    }

    /// SQLSTATE classifying this error.
    pub fn state(&self) -> State {
        match self {
            Error::OutOfRange { .. }
            | Error::InvalidArgument(_)
            | Error::WrongParameterMode { .. }
            | Error::ParameterNotFound { .. }
            | Error::ParameterNotSet { .. } => State::GENERAL_ERROR,
            Error::NotWritable => State::NOT_UPDATABLE,
            Error::StatementClosed => State::STATEMENT_CLOSED,
            Error::LobClosed => State::LOB_CLOSED,
            Error::IncompatibleConversion { .. } => State::INCOMPATIBLE_CONVERSION,
            Error::NumericOutOfRange { .. } => State::NUMERIC_OUT_OF_RANGE,
            Error::NotSupported(_) => State::FEATURE_NOT_SUPPORTED,
            Error::Storage(_) | Error::Io(_) => State::ENGINE_FAILURE,
        }
    }

    /// Shortcut for [`Error::OutOfRange`] which saturates values not representable as `i64`.
    pub(crate) fn out_of_range(argument: &'static str, value: impl TryInto<i64>) -> Self {
        Error::OutOfRange {
            argument,
            value: value.try_into().unwrap_or(i64::MAX),
        }
    }
}

/// Translates failures of the engine into failures of the stream API. Callers of
/// [`std::io::Read`] and [`std::io::Write`] never get to see [`StorageError`] directly, only its
/// description.
pub(crate) fn storage_to_io(error: StorageError) -> io::Error {
    io::Error::other(error.to_string())
}

#[cfg(test)]
mod tests {
    use std::io;

    use crate::handles::{State, StorageError};

    use super::{Error, codes, storage_to_io};

    #[test]
    fn closed_and_not_found_are_distinguishable() {
        let closed = Error::StatementClosed;
        let not_found = Error::ParameterNotFound {
            name: "@p1".to_owned(),
        };

        assert_eq!(codes::STATEMENT_CLOSED, closed.code());
        assert_eq!(codes::COLUMN_NOT_FOUND, not_found.code());
        assert_ne!(closed.state(), not_found.state());
    }

    #[test]
    fn storage_error_keeps_engine_code() {
        let error = Error::from(StorageError::new(4711, "disk full"));
        assert_eq!(4711, error.code());
        assert_eq!(State::ENGINE_FAILURE, error.state());
    }

    #[test]
    fn io_translation_carries_description() {
        let io_error = storage_to_io(StorageError::new(1, "lost connection"));
        assert_eq!(io::ErrorKind::Other, io_error.kind());
        assert!(io_error.to_string().contains("lost connection"));
    }

    #[test]
    fn out_of_range_saturates() {
        let error = Error::out_of_range("pos", u64::MAX);
        assert!(matches!(
            error,
            Error::OutOfRange {
                argument: "pos",
                value: i64::MAX
            }
        ));
    }
}
