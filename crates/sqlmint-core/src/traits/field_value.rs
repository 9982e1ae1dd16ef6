use crate::{
    types::DbType,
    value::{Value, parse_datetime},
};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, prelude::FromPrimitive};
use std::str::FromStr;
use ulid::Ulid;

///
/// FieldValue
///
/// Conversion boundary between a Rust field type and [`Value`].
///
/// `DB_TYPE` and `NULLABLE` feed column inference when a field does not
/// declare its type explicitly. `from_value` is lenient: drivers that store
/// dates or identifiers as text still round-trip.
///

pub trait FieldValue: Sized {
    const DB_TYPE: DbType;
    const NULLABLE: bool = false;

    fn to_value(&self) -> Value;

    #[must_use]
    fn from_value(value: &Value) -> Option<Self>;
}

impl<T: FieldValue> FieldValue for Option<T> {
    const DB_TYPE: DbType = T::DB_TYPE;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FieldValue for bool {
    const DB_TYPE: DbType = DbType::Boolean;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            Value::Int(v) => Some(*v != 0),
            Value::Text(v) => match v.as_str() {
                "1" | "true" | "TRUE" | "True" => Some(true),
                "0" | "false" | "FALSE" | "False" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

macro_rules! impl_field_value_int {
    ( $( $ty:ty => $db_type:ident ),* $(,)? ) => {
        $(
            impl FieldValue for $ty {
                const DB_TYPE: DbType = DbType::$db_type;

                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Int(v) => <$ty>::try_from(*v).ok(),
                        Value::Bool(v) => Some(<$ty>::from(*v)),
                        Value::Decimal(v) if v.fract().is_zero() => {
                            i64::try_from(*v).ok().and_then(|v| <$ty>::try_from(v).ok())
                        }
                        Value::Text(v) => v.trim().parse().ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_field_value_int! {
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
}

impl FieldValue for f64 {
    const DB_TYPE: DbType = DbType::Double;

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    #[expect(clippy::cast_precision_loss)]
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as Self),
            Value::Text(v) => v.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FieldValue for f32 {
    const DB_TYPE: DbType = DbType::Single;

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    #[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(*v as Self),
            Value::Int(v) => Some(*v as Self),
            Value::Text(v) => v.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FieldValue for Decimal {
    const DB_TYPE: DbType = DbType::Decimal;

    fn to_value(&self) -> Value {
        Value::Decimal(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Decimal(v) => Some(*v),
            Value::Int(v) => Some(Self::from(*v)),
            Value::Float(v) => Self::from_f64(*v),
            Value::Text(v) => Self::from_str(v.trim()).ok(),
            _ => None,
        }
    }
}

impl FieldValue for String {
    const DB_TYPE: DbType = DbType::String;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v.clone()),
            Value::Null | Value::Blob(_) => None,
            other => other.to_text(),
        }
    }
}

impl FieldValue for Vec<u8> {
    const DB_TYPE: DbType = DbType::Binary;

    fn to_value(&self) -> Value {
        Value::Blob(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Blob(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FieldValue for NaiveDate {
    const DB_TYPE: DbType = DbType::Date;

    fn to_value(&self) -> Value {
        Value::Date(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Date(v) => Some(*v),
            Value::DateTime(v) => Some(v.date()),
            Value::Text(v) => parse_datetime(v).map(|dt| dt.date()),
            _ => None,
        }
    }
}

impl FieldValue for NaiveDateTime {
    const DB_TYPE: DbType = DbType::DateTime;

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::DateTime(v) => Some(*v),
            Value::Date(v) => v.and_hms_opt(0, 0, 0),
            Value::Text(v) => parse_datetime(v),
            _ => None,
        }
    }
}

impl FieldValue for Ulid {
    const DB_TYPE: DbType = DbType::Guid;

    fn to_value(&self) -> Value {
        Value::Ulid(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Ulid(v) => Some(*v),
            Value::Text(v) => Self::from_string(v.trim()).ok(),
            Value::Blob(v) => <[u8; 16]>::try_from(v.as_slice())
                .ok()
                .map(Self::from_bytes),
            _ => None,
        }
    }
}
