//! Untyped literal values plus helpers for converting them into native types.
//!
//! Partition-key expressions evaluate to literals before they are written into
//! a partition's template tuple. The literal carries no slot type; conversion
//! helpers here perform the coercion once the destination slot is known.

use std::iter;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Date32Array, Float32Array, Float64Array, Int8Array, Int16Array,
    Int32Array, Int64Array, StringArray, new_null_array,
};
use arrow::datatypes::DataType;

use splitscan_result::{Error, Result};
use time::{Date, Month};

/// A literal value that has not yet been coerced into a specific native
/// type.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Int128(i128),
    Float64(f64),
    String(String),
    Boolean(bool),
    /// Date literal stored as days since the Unix epoch (1970-01-01).
    Date32(i32),
}

macro_rules! impl_from_for_literal {
    ($variant:ident, $($t:ty),*) => {
        $(
            impl From<$t> for Literal {
                fn from(v: $t) -> Self {
                    Literal::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for_literal!(Int128, i8, i16, i32, i64, i128, u8, u16, u32, u64);
impl_from_for_literal!(Float64, f32, f64);
impl_from_for_literal!(String, String);
impl_from_for_literal!(Boolean, bool);

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::String(v.to_string())
    }
}

impl Literal {
    /// Human-friendly rendering used in diagnostics.
    pub fn format_display(&self) -> String {
        match self {
            Literal::Int128(i) => i.to_string(),
            Literal::Float64(f) => f.to_string(),
            Literal::Boolean(b) => b.to_string(),
            Literal::String(s) => format!("\"{}\"", escape_string(s)),
            Literal::Date32(days) => format!("DATE '{}'", format_date32(*days)),
            Literal::Null => "NULL".to_string(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    /// Build an array of `len` copies of this literal typed as `data_type`.
    ///
    /// Scanners use this to fill partition-key columns, whose value is the
    /// same for every row of a scan range.
    pub fn to_repeated_array(&self, data_type: &DataType, len: usize) -> Result<ArrayRef> {
        if self.is_null() {
            return Ok(new_null_array(data_type, len));
        }
        let cast_err = |err: LiteralCastError| {
            Error::InvalidArgumentError(format!(
                "cannot use literal {} as {data_type:?}: {err}",
                self.format_display()
            ))
        };
        let array: ArrayRef = match data_type {
            DataType::Boolean => {
                let value = self.to_native::<bool>().map_err(cast_err)?;
                Arc::new(BooleanArray::from(vec![value; len]))
            }
            DataType::Int8 => Arc::new(Int8Array::from_value(
                self.to_native::<i8>().map_err(cast_err)?,
                len,
            )),
            DataType::Int16 => Arc::new(Int16Array::from_value(
                self.to_native::<i16>().map_err(cast_err)?,
                len,
            )),
            DataType::Int32 => Arc::new(Int32Array::from_value(
                self.to_native::<i32>().map_err(cast_err)?,
                len,
            )),
            DataType::Int64 => Arc::new(Int64Array::from_value(
                self.to_native::<i64>().map_err(cast_err)?,
                len,
            )),
            DataType::Float32 => Arc::new(Float32Array::from_value(
                self.to_native::<f32>().map_err(cast_err)?,
                len,
            )),
            DataType::Float64 => Arc::new(Float64Array::from_value(
                self.to_native::<f64>().map_err(cast_err)?,
                len,
            )),
            DataType::Date32 => Arc::new(Date32Array::from_value(
                self.to_date32().map_err(cast_err)?,
                len,
            )),
            DataType::Utf8 => {
                let value = self.to_string_owned().map_err(cast_err)?;
                Arc::new(StringArray::from_iter_values(
                    iter::repeat(value.as_str()).take(len),
                ))
            }
            other => {
                return Err(Error::InvalidArgumentError(format!(
                    "unsupported slot type for literal: {other:?}"
                )));
            }
        };
        Ok(array)
    }

    /// Days since the epoch for date slots. Integers are accepted as raw day
    /// counts.
    pub fn to_date32(&self) -> std::result::Result<i32, LiteralCastError> {
        match self {
            Literal::Date32(days) => Ok(*days),
            Literal::Int128(i) => i32::try_from(*i).map_err(|_| LiteralCastError::OutOfRange {
                target: "date",
                value: *i,
            }),
            other => Err(LiteralCastError::TypeMismatch {
                expected: "date",
                got: other.type_name(),
            }),
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_display())
    }
}

fn format_date32(days: i32) -> String {
    let julian = match epoch_julian_day().checked_add(days) {
        Some(value) => value,
        None => return days.to_string(),
    };

    match Date::from_julian_day(julian) {
        Ok(date) => {
            let (year, month, day) = date.to_calendar_date();
            let month_number = month as u8;
            format!("{:04}-{:02}-{:02}", year, month_number, day)
        }
        Err(_) => days.to_string(),
    }
}

fn epoch_julian_day() -> i32 {
    match Date::from_calendar_date(1970, Month::January, 1) {
        Ok(date) => date.to_julian_day(),
        // Julian day number of 1970-01-01.
        Err(_) => 2_440_588,
    }
}

fn escape_string(value: &str) -> String {
    value.chars().flat_map(|c| c.escape_default()).collect()
}

/// Error converting a `Literal` into a concrete native type.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralCastError {
    /// Tried to coerce a literal of one kind into an incompatible native type.
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },
    /// Integer value does not fit in the destination type.
    OutOfRange { target: &'static str, value: i128 },
    /// Float value does not fit in the destination type.
    FloatOutOfRange { target: &'static str, value: f64 },
}

impl std::fmt::Display for LiteralCastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiteralCastError::TypeMismatch { expected, got } => {
                write!(f, "expected {}, got {}", expected, got)
            }
            LiteralCastError::OutOfRange { target, value } => {
                write!(f, "value {} out of range for {}", value, target)
            }
            LiteralCastError::FloatOutOfRange { target, value } => {
                write!(f, "value {} out of range for {}", value, target)
            }
        }
    }
}

impl std::error::Error for LiteralCastError {}

/// Extension methods for working with `Literal`.
pub trait LiteralExt {
    fn type_name(&self) -> &'static str;
    fn to_string_owned(&self) -> std::result::Result<String, LiteralCastError>;
    fn to_native<T>(&self) -> std::result::Result<T, LiteralCastError>
    where
        T: FromLiteral + Copy + 'static;
}

impl LiteralExt for Literal {
    fn type_name(&self) -> &'static str {
        match self {
            Literal::Int128(_) => "integer",
            Literal::Float64(_) => "float",
            Literal::String(_) => "string",
            Literal::Boolean(_) => "boolean",
            Literal::Date32(_) => "date",
            Literal::Null => "null",
        }
    }

    fn to_string_owned(&self) -> std::result::Result<String, LiteralCastError> {
        match self {
            Literal::String(s) => Ok(s.clone()),
            other => Err(LiteralCastError::TypeMismatch {
                expected: "string",
                got: other.type_name(),
            }),
        }
    }

    fn to_native<T>(&self) -> std::result::Result<T, LiteralCastError>
    where
        T: FromLiteral + Copy + 'static,
    {
        T::from_literal(self)
    }
}

/// Helper trait implemented for primitive types that can be produced from a `Literal`.
pub trait FromLiteral: Sized {
    fn from_literal(lit: &Literal) -> std::result::Result<Self, LiteralCastError>;
}

macro_rules! impl_from_literal_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromLiteral for $ty {
                fn from_literal(lit: &Literal) -> std::result::Result<Self, LiteralCastError> {
                    match lit {
                        Literal::Int128(i) => <$ty>::try_from(*i).map_err(|_| {
                            LiteralCastError::OutOfRange {
                                target: std::any::type_name::<$ty>(),
                                value: *i,
                            }
                        }),
                        other => Err(LiteralCastError::TypeMismatch {
                            expected: "integer",
                            got: other.type_name(),
                        }),
                    }
                }
            }
        )*
    };
}

impl_from_literal_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, usize);

impl FromLiteral for f32 {
    fn from_literal(lit: &Literal) -> std::result::Result<Self, LiteralCastError> {
        let value = f64::from_literal(lit)?;
        let casted = value as f32;
        if casted.is_finite() || !value.is_finite() {
            Ok(casted)
        } else {
            Err(LiteralCastError::FloatOutOfRange {
                target: "f32",
                value,
            })
        }
    }
}

impl FromLiteral for f64 {
    fn from_literal(lit: &Literal) -> std::result::Result<Self, LiteralCastError> {
        match lit {
            Literal::Float64(f) => Ok(*f),
            Literal::Int128(i) => Ok(*i as f64),
            other => Err(LiteralCastError::TypeMismatch {
                expected: "float",
                got: other.type_name(),
            }),
        }
    }
}

impl FromLiteral for bool {
    fn from_literal(lit: &Literal) -> std::result::Result<Self, LiteralCastError> {
        match lit {
            Literal::Boolean(b) => Ok(*b),
            Literal::Int128(i) => match *i {
                0 => Ok(false),
                1 => Ok(true),
                value => Err(LiteralCastError::OutOfRange {
                    target: "bool",
                    value,
                }),
            },
            Literal::String(s) => {
                let normalized = s.trim().to_ascii_lowercase();
                match normalized.as_str() {
                    "true" | "t" | "1" => Ok(true),
                    "false" | "f" | "0" => Ok(false),
                    _ => Err(LiteralCastError::TypeMismatch {
                        expected: "bool",
                        got: "string",
                    }),
                }
            }
            other => Err(LiteralCastError::TypeMismatch {
                expected: "bool",
                got: other.type_name(),
            }),
        }
    }
}
