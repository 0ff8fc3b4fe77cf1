//! Loosely-typed scalar carried by captured row images.

use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};

/// One cell of a row image, as handed over by the capture side.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
  #[default]
  Null,
  Bool(bool),
  I8(i8),
  I16(i16),
  I32(i32),
  I64(i64),
  U8(u8),
  U16(u16),
  U32(u32),
  U64(u64),
  F32(f32),
  F64(f64),
  Decimal(Decimal),
  Bytes(Bytes),
  String(String),
  Date(NaiveDate),
  Time(NaiveTime),
  DateTime(NaiveDateTime),
  Json(serde_json::Value),
}

impl Value {
  pub const fn is_null(&self) -> bool {
    matches!(self, Self::Null)
  }

  pub fn type_name(&self) -> &'static str {
    match self {
      Self::Null => "null",
      Self::Bool(_) => "bool",
      Self::I8(_) => "i8",
      Self::I16(_) => "i16",
      Self::I32(_) => "i32",
      Self::I64(_) => "i64",
      Self::U8(_) => "u8",
      Self::U16(_) => "u16",
      Self::U32(_) => "u32",
      Self::U64(_) => "u64",
      Self::F32(_) => "f32",
      Self::F64(_) => "f64",
      Self::Decimal(_) => "decimal",
      Self::Bytes(_) => "bytes",
      Self::String(_) => "string",
      Self::Date(_) => "date",
      Self::Time(_) => "time",
      Self::DateTime(_) => "datetime",
      Self::Json(_) => "json",
    }
  }
}

impl Serialize for Value {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Self::Null => serializer.serialize_none(),
      Self::Bool(v) => serializer.serialize_bool(*v),
      Self::I8(v) => serializer.serialize_i8(*v),
      Self::I16(v) => serializer.serialize_i16(*v),
      Self::I32(v) => serializer.serialize_i32(*v),
      Self::I64(v) => serializer.serialize_i64(*v),
      Self::U8(v) => serializer.serialize_u8(*v),
      Self::U16(v) => serializer.serialize_u16(*v),
      Self::U32(v) => serializer.serialize_u32(*v),
      Self::U64(v) => serializer.serialize_u64(*v),
      // JSON has no spelling for NaN or infinities.
      Self::F32(v) if !v.is_finite() => Err(ser::Error::custom(format!("unsupported float value {}", v))),
      Self::F64(v) if !v.is_finite() => Err(ser::Error::custom(format!("unsupported float value {}", v))),
      Self::F32(v) => serializer.serialize_f32(*v),
      Self::F64(v) => serializer.serialize_f64(*v),
      Self::Decimal(v) => serializer.collect_str(v),
      Self::Bytes(v) => serializer.serialize_str(&base64::encode(v)),
      Self::String(v) => serializer.serialize_str(v),
      Self::Date(v) => serializer.collect_str(v),
      Self::Time(v) => serializer.collect_str(v),
      Self::DateTime(v) => serializer.collect_str(&v.format("%Y-%m-%dT%H:%M:%S%.f")),
      Self::Json(v) => v.serialize(serializer),
    }
  }
}

impl<'de> Deserialize<'de> for Value {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    serde_json::Value::deserialize(deserializer)
      .map(Value::from)
      .map_err(de::Error::custom)
  }
}

impl From<serde_json::Value> for Value {
  fn from(v: serde_json::Value) -> Self {
    match v {
      serde_json::Value::Null => Self::Null,
      serde_json::Value::Bool(b) => Self::Bool(b),
      serde_json::Value::Number(n) => {
        if let Some(i) = n.as_i64() {
          Self::I64(i)
        } else if let Some(u) = n.as_u64() {
          Self::U64(u)
        } else {
          n.as_f64().map_or(Self::Null, Self::F64)
        }
      }
      serde_json::Value::String(s) => Self::String(s),
      other => Self::Json(other),
    }
  }
}

macro_rules! impl_from {
  ($($ty:ty => $variant:ident),* $(,)?) => {
    $(
      impl From<$ty> for Value {
        fn from(v: $ty) -> Self {
          Self::$variant(v)
        }
      }
    )*
  };
}

impl_from! {
  bool => Bool,
  i8 => I8,
  i16 => I16,
  i32 => I32,
  i64 => I64,
  u8 => U8,
  u16 => U16,
  u32 => U32,
  u64 => U64,
  f32 => F32,
  f64 => F64,
  Decimal => Decimal,
  Bytes => Bytes,
  String => String,
  NaiveDate => Date,
  NaiveTime => Time,
  NaiveDateTime => DateTime,
}

impl From<&str> for Value {
  fn from(v: &str) -> Self {
    Self::String(v.to_owned())
  }
}

impl From<Vec<u8>> for Value {
  fn from(v: Vec<u8>) -> Self {
    Self::Bytes(Bytes::from(v))
  }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(v: Option<T>) -> Self {
    v.map_or(Self::Null, Into::into)
  }
}
