//! Conversion of parameter values between SQL types.

use std::fmt::Write as _;

use atoi::{FromRadix10Checked, FromRadix10SignedChecked};

use crate::{
    Error,
    handles::SqlType,
    value::{Date, Time, Timestamp, Value, describe},
};

/// Converts `value` of type `source` into a value of type `target`.
///
/// `NULL` converts into any type. If source and target are the same, the value is returned as it
/// is. Otherwise the conversion follows the rules of the engine:
///
/// * Numbers convert into other numeric types if they fit their range. Fractions are truncated
///   when converting into integral types.
/// * Text converts into numbers, booleans, binary (hexadecimal), dates and times if it is a valid
///   representation of them. Leading and trailing whitespace is ignored.
/// * Everything except binary large objects converts into text.
/// * Timestamps project onto their date and time, dates extend to timestamps at midnight.
///
/// Every other combination fails with [`Error::IncompatibleConversion`].
///
/// ```
/// use engine_driver::{Value, convert, handles::SqlType};
///
/// let value = convert(SqlType::Varchar, SqlType::Integer, Value::from(" 42 ")).unwrap();
/// assert_eq!(Value::Integer(42), value);
/// ```
pub fn convert(source: SqlType, target: SqlType, value: Value) -> Result<Value, Error> {
    if value.is_null() || source == target || target == SqlType::Other {
        return Ok(value);
    }
    let converted = match target {
        SqlType::Boolean => to_boolean(&value),
        SqlType::TinyInt | SqlType::SmallInt | SqlType::Integer | SqlType::BigInt => {
            return to_integral(source, target, value);
        }
        SqlType::Double => to_double(&value),
        SqlType::Decimal { .. } => to_decimal(&value),
        SqlType::Char | SqlType::Varchar => to_text(&value),
        SqlType::Binary | SqlType::Varbinary | SqlType::Blob => to_binary(&value),
        SqlType::Date => to_date(&value),
        SqlType::Time => to_time(&value),
        SqlType::Timestamp => to_timestamp(&value),
        SqlType::Clob => match value {
            Value::Clob(_) => Some(value.clone()),
            _ => None,
        },
        SqlType::Other => Some(value.clone()),
    };
    converted.ok_or_else(|| incompatible(source, target, &value))
}

fn incompatible(from: SqlType, to: SqlType, value: &Value) -> Error {
    Error::IncompatibleConversion {
        from,
        to,
        value: describe(value),
    }
}

fn to_boolean(value: &Value) -> Option<Value> {
    let flag = match value {
        Value::Boolean(flag) => *flag,
        Value::Integer(i) => *i != 0,
        Value::Double(d) => *d != 0.,
        Value::Decimal(text) => decimal_text_to_i128(text.trim().as_bytes(), 0)? != 0,
        Value::Text(text) => {
            let text = text.trim();
            if text.eq_ignore_ascii_case("true") {
                true
            } else if text.eq_ignore_ascii_case("false") {
                false
            } else {
                return None;
            }
        }
        _ => return None,
    };
    Some(Value::Boolean(flag))
}

fn to_integral(source: SqlType, target: SqlType, value: Value) -> Result<Value, Error> {
    let integer: i128 = match &value {
        Value::Integer(i) => (*i).into(),
        Value::Boolean(flag) => (*flag).into(),
        Value::Double(d) => {
            if !d.is_finite() {
                return Err(out_of_range(target, &value));
            }
            // Saturating, anything beyond `i64` is caught by the range check below.
            d.trunc() as i128
        }
        Value::Decimal(text) | Value::Text(text) => decimal_text_to_i128(text.trim().as_bytes(), 0)
            .ok_or_else(|| {
                if is_numeric(text.trim().as_bytes()) {
                    out_of_range(target, &value)
                } else {
                    incompatible(source, target, &value)
                }
            })?,
        _ => return Err(incompatible(source, target, &value)),
    };
    let (min, max) = target.integral_range().unwrap_or((i64::MIN, i64::MAX));
    if integer < min.into() || integer > max.into() {
        return Err(out_of_range(target, &value));
    }
    // Range has been checked above
    Ok(Value::Integer(integer as i64))
}

fn out_of_range(to: SqlType, value: &Value) -> Error {
    Error::NumericOutOfRange {
        to,
        value: describe(value),
    }
}

fn to_double(value: &Value) -> Option<Value> {
    let number = match value {
        Value::Double(d) => *d,
        Value::Integer(i) => *i as f64,
        Value::Boolean(flag) => f64::from(u8::from(*flag)),
        Value::Decimal(text) | Value::Text(text) => text.trim().parse().ok()?,
        _ => return None,
    };
    Some(Value::Double(number))
}

fn to_decimal(value: &Value) -> Option<Value> {
    let text = match value {
        Value::Decimal(text) => text.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Boolean(flag) => u8::from(*flag).to_string(),
        Value::Double(d) if d.is_finite() => d.to_string(),
        Value::Text(text) => {
            let text = text.trim();
            if !is_numeric(text.as_bytes()) {
                return None;
            }
            text.to_owned()
        }
        _ => return None,
    };
    Some(Value::Decimal(text))
}

fn to_text(value: &Value) -> Option<Value> {
    let text = match value {
        Value::Text(text) | Value::Decimal(text) => text.clone(),
        Value::Boolean(true) => "TRUE".to_owned(),
        Value::Boolean(false) => "FALSE".to_owned(),
        Value::Integer(i) => i.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Binary(bytes) => to_hex(bytes),
        Value::Date(date) => date.to_string(),
        Value::Time(time) => time.to_string(),
        Value::Timestamp(timestamp) => timestamp.to_string(),
        Value::Null | Value::Clob(_) => return None,
    };
    Some(Value::Text(text))
}

fn to_binary(value: &Value) -> Option<Value> {
    match value {
        Value::Binary(bytes) => Some(Value::Binary(bytes.clone())),
        Value::Text(text) => from_hex(text.trim()).map(Value::Binary),
        _ => None,
    }
}

fn to_date(value: &Value) -> Option<Value> {
    match value {
        Value::Date(date) => Some(Value::Date(*date)),
        Value::Timestamp(timestamp) => Some(Value::Date(timestamp.date)),
        Value::Text(text) => parse_date(text.trim()).map(Value::Date),
        _ => None,
    }
}

fn to_time(value: &Value) -> Option<Value> {
    match value {
        Value::Time(time) => Some(Value::Time(*time)),
        Value::Timestamp(timestamp) => Some(Value::Time(timestamp.time)),
        Value::Text(text) => parse_time(text.trim()).map(Value::Time),
        _ => None,
    }
}

fn to_timestamp(value: &Value) -> Option<Value> {
    match value {
        Value::Timestamp(timestamp) => Some(Value::Timestamp(*timestamp)),
        Value::Date(date) => Some(Value::Timestamp(Timestamp {
            date: *date,
            ..Timestamp::default()
        })),
        Value::Text(text) => parse_timestamp(text.trim()).map(Value::Timestamp),
        _ => None,
    }
}

/// Convert the text representation of a decimal into an integer representation. The integer
/// representation is not truncating at the radix character, but is instead the value of the
/// decimal times 10 to the power of `scale`. E.g. 123.45 with scale 3 is thought of as 123.450 and
/// represented as 123450. Fraction digits beyond `scale` are truncated. Both `.` and `,` are
/// accepted as radix character.
///
/// `None` if the text is not a decimal, or if the result does not fit into an `i128`.
///
/// ```
/// use engine_driver::conversion::decimal_text_to_i128;
///
/// assert_eq!(Some(1_000_000), decimal_text_to_i128(b"10.0", 5));
/// assert_eq!(Some(-12), decimal_text_to_i128(b"-1.29", 1));
/// assert_eq!(None, decimal_text_to_i128(b"ten", 0));
/// ```
pub fn decimal_text_to_i128(text: &[u8], scale: usize) -> Option<i128> {
    // High is the number before the radix character
    let (high, num_digits_high) = i128::from_radix_10_signed_checked(text);
    let high = high?;
    let fraction = match &text[num_digits_high..] {
        [] => &[][..],
        [b'.' | b',', fraction @ ..] => fraction,
        _ => return None,
    };
    if !fraction.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let num_sign = usize::from(matches!(text.first(), Some(b'+' | b'-')));
    if num_digits_high == num_sign && fraction.is_empty() {
        return None;
    }

    let kept = &fraction[..fraction.len().min(scale)];
    let low = if kept.is_empty() {
        0
    } else {
        let (low, _) = i128::from_radix_10_checked(kept);
        low?
    };
    let shift = 10i128.checked_pow(u32::try_from(scale).ok()?)?;
    let low_shift = 10i128.checked_pow(u32::try_from(scale - kept.len()).ok()?)?;
    let low = low.checked_mul(low_shift)?;
    let high = high.checked_mul(shift)?;
    // Increase the absolute of high by low without changing the sign of high
    if high < 0 || (high == 0 && text.first() == Some(&b'-')) {
        high.checked_sub(low)
    } else {
        high.checked_add(low)
    }
}

/// `true` if `text` is a decimal, regardless of whether it fits into any integer.
fn is_numeric(text: &[u8]) -> bool {
    let digits = text.strip_prefix(b"-").or_else(|| text.strip_prefix(b"+")).unwrap_or(text);
    let mut parts = digits.splitn(2, |&c| c == b'.' || c == b',');
    let high = parts.next().unwrap_or_default();
    let low = parts.next().unwrap_or_default();
    (!high.is_empty() || !low.is_empty())
        && high.iter().chain(low).all(u8::is_ascii_digit)
}

fn to_hex(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // Writing into a string never fails
        let _ = write!(text, "{byte:02x}");
    }
    text
}

fn from_hex(text: &str) -> Option<Vec<u8>> {
    let text = text.as_bytes();
    if text.len() % 2 != 0 {
        return None;
    }
    text.chunks(2)
        .map(|pair| Some((hex_digit(pair[0])? << 4) | hex_digit(pair[1])?))
        .collect()
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Parses an unsigned number which must span all of `text`.
fn parse_field<T>(text: &str) -> Option<T>
where
    T: FromRadix10Checked,
{
    let (number, used) = T::from_radix_10_checked(text.as_bytes());
    if text.is_empty() || used != text.len() {
        return None;
    }
    number
}

/// Parses `YYYY-MM-DD`.
fn parse_date(text: &str) -> Option<Date> {
    let mut fields = text.splitn(3, '-');
    let year: u16 = parse_field(fields.next()?)?;
    let month: u8 = parse_field(fields.next()?)?;
    let day: u8 = parse_field(fields.next()?)?;
    let year = i16::try_from(year).ok()?;
    if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
        return None;
    }
    Some(Date { year, month, day })
}

fn days_in_month(year: i16, month: u8) -> u8 {
    match month {
        2 if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Parses `HH:MM:SS`.
fn parse_time(text: &str) -> Option<Time> {
    let mut fields = text.splitn(3, ':');
    let hour: u8 = parse_field(fields.next()?)?;
    let minute: u8 = parse_field(fields.next()?)?;
    let second: u8 = parse_field(fields.next()?)?;
    if hour > 23 || minute > 59 || second > 59 {
        return None;
    }
    Some(Time {
        hour,
        minute,
        second,
    })
}

/// Parses `YYYY-MM-DD HH:MM:SS[.fffffffff]`, or only the date part.
fn parse_timestamp(text: &str) -> Option<Timestamp> {
    let Some((date, time)) = text.split_once(' ') else {
        return parse_date(text).map(|date| Timestamp {
            date,
            ..Timestamp::default()
        });
    };
    let date = parse_date(date)?;
    let (time, fraction) = match time.trim_start().split_once('.') {
        Some((time, digits)) => {
            if digits.len() > 9 {
                return None;
            }
            let value: u32 = parse_field(digits)?;
            // Pad to nanoseconds
            (time, value * 10u32.pow(9 - digits.len() as u32))
        }
        None => (time.trim_start(), 0),
    };
    let time = parse_time(time)?;
    Some(Timestamp {
        date,
        time,
        fraction,
    })
}
