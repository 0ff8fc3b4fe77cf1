use std::str::FromStr;

use super::Transformer;
use crate::error::BoxError;
use crate::row::Record;
use crate::value::Value;

/// Replaces one column with a fixed value, e.g. to redact it.
///
/// Rows that do not carry the column (including empty rows) are reported as unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
  column: String,
  value: Value,
}

impl Constant {
  pub fn new(column: impl Into<String>, value: impl Into<Value>) -> Self {
    Self {
      column: column.into(),
      value: value.into(),
    }
  }

  pub fn column(&self) -> &str {
    &self.column
  }

  pub fn value(&self) -> &Value {
    &self.value
  }
}

impl Transformer for Constant {
  fn transform(&self, record: &Record) -> Result<Record, BoxError> {
    let mut changed = Record::new();
    if record.contains_key(&self.column) {
      changed.insert(self.column.clone(), self.value.clone());
    }
    Ok(changed)
  }
}

/// Parses `column=value`. The value is read as json when it is valid json and taken as a plain string otherwise, so
/// `id=0` substitutes a number and `email=REDACTED` a string.
impl FromStr for Constant {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (column, value) = s
      .split_once('=')
      .ok_or_else(|| format!("expected column=value, got {:?}", s))?;
    if column.is_empty() {
      return Err(format!("missing column name in {:?}", s));
    }
    let value = serde_json::from_str::<serde_json::Value>(value)
      .map(Value::from)
      .unwrap_or_else(|_| Value::from(value));
    Ok(Self::new(column, value))
  }
}

#[cfg(test)]
mod test {
  use super::Constant;
  use crate::row::Record;
  use crate::transform::Transformer;
  use crate::value::Value;

  #[test]
  fn replaces_only_the_target_column() {
    let constant = Constant::new("email", "REDACTED");
    let record = Record::from([
      ("email".to_string(), Value::from("a@b.com")),
      ("id".to_string(), Value::I64(5)),
    ]);
    let changed = constant.transform(&record).unwrap();
    assert_eq!(changed, Record::from([("email".to_string(), Value::from("REDACTED"))]));
  }

  #[test]
  fn unchanged_without_the_column() {
    let constant = Constant::new("email", "REDACTED");
    assert!(constant.transform(&Record::new()).unwrap().is_empty());
    let record = Record::from([("id".to_string(), Value::I64(5))]);
    assert!(constant.transform(&record).unwrap().is_empty());
  }

  #[test]
  fn parses_column_and_value() {
    assert_eq!("id=0".parse::<Constant>().unwrap(), Constant::new("id", Value::I64(0)));
    assert_eq!("email=REDACTED".parse::<Constant>().unwrap(), Constant::new("email", "REDACTED"));
    assert_eq!("note=\"1\"".parse::<Constant>().unwrap(), Constant::new("note", "1"));
    assert_eq!("note=".parse::<Constant>().unwrap(), Constant::new("note", ""));
    assert!("email".parse::<Constant>().is_err());
    assert!("=x".parse::<Constant>().is_err());
  }
}
