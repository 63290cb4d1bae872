use std::fmt;

/// SQL type tags known to the engine. The set is closed, so conversions between them are
/// expressed as a plain `match` (see [`crate::convert`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SqlType {
    /// The type is not known.
    #[default]
    Other,
    /// `BOOLEAN`
    Boolean,
    /// `TINYINT`. 8 Bit Integer.
    TinyInt,
    /// `SMALLINT`. 16 Bit Integer.
    SmallInt,
    /// `INTEGER`. 32 Bit Integer.
    Integer,
    /// `BIGINT`. 64 Bit Integer.
    BigInt,
    /// `DOUBLE`. Approximate numeric value with a binary precision of 53.
    Double,
    /// `DECIMAL(p,s)`. Exact numeric value, transported in its text representation.
    Decimal {
        /// Total number of digits.
        precision: u8,
        /// Number of digits after the radix character.
        scale: u8,
    },
    /// `CHAR(n)`
    Char,
    /// `VARCHAR(n)`
    Varchar,
    /// `CLOB`. Character large object, transported as a handle.
    Clob,
    /// `BINARY(n)`
    Binary,
    /// `VARBINARY(n)`
    Varbinary,
    /// `BLOB`. Binary large objects are not supported by this crate beyond their type tag.
    Blob,
    /// `DATE`
    Date,
    /// `TIME`
    Time,
    /// `TIMESTAMP`
    Timestamp,
}

impl SqlType {
    /// `true` for the integer types.
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            SqlType::TinyInt | SqlType::SmallInt | SqlType::Integer | SqlType::BigInt
        )
    }

    /// `true` for `CHAR` and `VARCHAR`.
    pub fn is_text(self) -> bool {
        matches!(self, SqlType::Char | SqlType::Varchar)
    }

    /// `true` for `BINARY` and `VARBINARY`.
    pub fn is_binary(self) -> bool {
        matches!(self, SqlType::Binary | SqlType::Varbinary)
    }

    /// Inclusive range of values representable by an integral type. `None` for all other types.
    pub fn integral_range(self) -> Option<(i64, i64)> {
        match self {
            SqlType::TinyInt => Some((i8::MIN.into(), i8::MAX.into())),
            SqlType::SmallInt => Some((i16::MIN.into(), i16::MAX.into())),
            SqlType::Integer => Some((i32::MIN.into(), i32::MAX.into())),
            SqlType::BigInt => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Other => f.write_str("OTHER"),
            SqlType::Boolean => f.write_str("BOOLEAN"),
            SqlType::TinyInt => f.write_str("TINYINT"),
            SqlType::SmallInt => f.write_str("SMALLINT"),
            SqlType::Integer => f.write_str("INTEGER"),
            SqlType::BigInt => f.write_str("BIGINT"),
            SqlType::Double => f.write_str("DOUBLE"),
            SqlType::Decimal { precision, scale } => write!(f, "DECIMAL({precision},{scale})"),
            SqlType::Char => f.write_str("CHARACTER"),
            SqlType::Varchar => f.write_str("VARCHAR"),
            SqlType::Clob => f.write_str("CLOB"),
            SqlType::Binary => f.write_str("BINARY"),
            SqlType::Varbinary => f.write_str("VARBINARY"),
            SqlType::Blob => f.write_str("BLOB"),
            SqlType::Date => f.write_str("DATE"),
            SqlType::Time => f.write_str("TIME"),
            SqlType::Timestamp => f.write_str("TIMESTAMP"),
        }
    }
}
