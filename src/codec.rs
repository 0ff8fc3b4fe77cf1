//! String-or-null rendering of scalars, for wire formats whose columns only carry text.

use std::collections::BTreeMap;
use std::fmt::Display;

use crate::value::Value;

/// Positional row rendered through [`encode`], keyed by the decimal column position.
pub type EncodedRow = BTreeMap<String, Option<String>>;

/// Renders a scalar into its canonical string, or `None` for the null marker.
///
/// Text is hex encoded just like binary so consumers can tell the two apart. Types this codec does not know
/// (dates, times, json documents) are rendered as null rather than rejected.
pub fn encode(value: &Value) -> Option<String> {
  let encoded = match value {
    Value::Bool(v) => v.to_string(),
    Value::I8(v) => v.to_string(),
    Value::I16(v) => v.to_string(),
    Value::I32(v) => v.to_string(),
    Value::I64(v) => v.to_string(),
    Value::U8(v) => v.to_string(),
    Value::U16(v) => v.to_string(),
    Value::U32(v) => v.to_string(),
    Value::U64(v) => v.to_string(),
    Value::F32(v) => format_float(*v),
    Value::F64(v) => format_float(*v),
    // trailing fractional zeros are not significant: 12.50 renders as 12.5
    Value::Decimal(v) => v.normalize().to_string(),
    Value::Bytes(v) => hex::encode(v),
    Value::String(v) => hex::encode(v.as_bytes()),
    Value::Null | Value::Date(_) | Value::Time(_) | Value::DateTime(_) | Value::Json(_) => return None,
  };
  Some(encoded)
}

pub fn encode_row(values: &[Value]) -> EncodedRow {
  values
    .iter()
    .enumerate()
    .map(|(i, v)| (i.to_string(), encode(v)))
    .collect()
}

// Display already picks the shortest digits that round-trip at the value's own width, without an exponent.
fn format_float<T: Copy + Display + Into<f64>>(v: T) -> String {
  let wide: f64 = v.into();
  if wide.is_nan() {
    "NaN".to_string()
  } else if wide.is_infinite() && wide > 0.0 {
    "+Inf".to_string()
  } else if wide.is_infinite() {
    "-Inf".to_string()
  } else {
    v.to_string()
  }
}
