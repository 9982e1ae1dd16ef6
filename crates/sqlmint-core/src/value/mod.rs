mod text;


use crate::types::DbType;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::fmt;
use ulid::Ulid;

// re-exports
pub use text::{DATE_FORMAT, DATETIME_FORMAT, parse_datetime};

///
/// Value
///
/// Scalar value bound to a command parameter or read from a result row.
///
/// Null → SQL NULL (the field is `Option::None`).
///

#[derive(Clone, Debug, PartialEq)]
#[remain::sorted]
pub enum Value {
    Blob(Vec<u8>),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Decimal(Decimal),
    Float(f64),
    Int(i64),
    Null,
    Text(String),
    Ulid(Ulid),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// The natural column type for this value, used when binding parameters
    /// that do not originate from a mapped column.
    #[must_use]
    pub const fn db_type(&self) -> DbType {
        match self {
            Self::Blob(_) => DbType::Binary,
            Self::Bool(_) => DbType::Boolean,
            Self::Date(_) => DbType::Date,
            Self::DateTime(_) => DbType::DateTime,
            Self::Decimal(_) => DbType::Decimal,
            Self::Float(_) => DbType::Double,
            Self::Int(_) => DbType::Int64,
            Self::Null | Self::Text(_) => DbType::String,
            Self::Ulid(_) => DbType::Guid,
        }
    }

    /// Whether this value counts as "not supplied" for generated keys and
    /// version numbers.
    #[must_use]
    pub fn is_empty_key(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Int(v) => *v == 0,
            Self::Text(v) => v.is_empty(),
            Self::Ulid(v) => v.is_nil(),
            _ => false,
        }
    }

    /// Lossless text form used by the audit trail. `None` for NULL.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        text::to_text(self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("NULL"),
        }
    }
}

macro_rules! impl_value_from {
    ( $( $ty:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_value_from! {
    bool => Bool,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    f64 => Float,
    String => Text,
    Vec<u8> => Blob,
    NaiveDate => Date,
    NaiveDateTime => DateTime,
    Decimal => Decimal,
    Ulid => Ulid,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
