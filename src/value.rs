use std::fmt;

use crate::handles::{ClobId, SqlType};

/// Year, month and day fields, conforming to the rules of the Gregorian calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Date {
    pub year: i16,
    pub month: u8,
    pub day: u8,
}

/// Hour, minute and second fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Date and time with nanosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp {
    pub date: Date,
    pub time: Time,
    /// Fractional seconds in nanoseconds.
    pub fraction: u32,
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.time)?;
        if self.fraction != 0 {
            let digits = format!("{:09}", self.fraction);
            write!(f, ".{}", digits.trim_end_matches('0'))?;
        }
        Ok(())
    }
}

/// A single value as it is exchanged with the engine, e.g. the value of a procedure parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// SQL `NULL`
    #[default]
    Null,
    Boolean(bool),
    /// Any of the integral types. The declared type of the parameter determines the valid range.
    Integer(i64),
    Double(f64),
    /// Exact numeric in its text representation, e.g. `"-123.45"`.
    Decimal(String),
    /// `CHAR` or `VARCHAR` data.
    Text(String),
    /// `BINARY` or `VARBINARY` data.
    Binary(Vec<u8>),
    Date(Date),
    Time(Time),
    Timestamp(Timestamp),
    /// Handle to a character large object stored in the engine.
    Clob(ClobId),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The type tag this value carries natively. `None` for `NULL`, which is valid for any type.
    pub fn natural_type(&self) -> Option<SqlType> {
        let sql_type = match self {
            Value::Null => return None,
            Value::Boolean(_) => SqlType::Boolean,
            Value::Integer(_) => SqlType::BigInt,
            Value::Double(_) => SqlType::Double,
            Value::Decimal(_) => SqlType::Decimal {
                precision: 0,
                scale: 0,
            },
            Value::Text(_) => SqlType::Varchar,
            Value::Binary(_) => SqlType::Varbinary,
            Value::Date(_) => SqlType::Date,
            Value::Time(_) => SqlType::Time,
            Value::Timestamp(_) => SqlType::Timestamp,
            Value::Clob(_) => SqlType::Clob,
        };
        Some(sql_type)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_owned())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Describes a value in error messages without dumping large payloads.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_owned(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Decimal(text) | Value::Text(text) => format!("'{text}'"),
        Value::Binary(bytes) => format!("{} bytes of binary data", bytes.len()),
        Value::Date(date) => date.to_string(),
        Value::Time(time) => time.to_string(),
        Value::Timestamp(timestamp) => timestamp.to_string(),
        Value::Clob(id) => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{Date, Time, Timestamp};

    #[test]
    fn display_timestamp_trims_fraction() {
        let timestamp = Timestamp {
            date: Date {
                year: 2009,
                month: 3,
                day: 21,
            },
            time: Time {
                hour: 22,
                minute: 53,
                second: 43,
            },
            fraction: 120_000_000,
        };
        assert_eq!("2009-03-21 22:53:43.12", timestamp.to_string());
    }

    #[test]
    fn display_timestamp_without_fraction() {
        let timestamp = Timestamp::default();
        assert_eq!("0000-00-00 00:00:00", timestamp.to_string());
    }
}
