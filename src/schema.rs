use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Raw type given to columns that showed up in row data without being declared by the source schema.
pub const GENERATED_COLUMN_TYPE: &str = "plugin-generated";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
  pub name: String,
  #[serde(rename = "type")]
  pub raw_type: String,
  #[serde(default)]
  pub nullable: bool,
}

impl Column {
  pub fn new(name: impl Into<String>, raw_type: impl Into<String>, nullable: bool) -> Self {
    Self {
      name: name.into(),
      raw_type: raw_type.into(),
      nullable,
    }
  }

  pub fn generated(name: impl Into<String>) -> Self {
    Self::new(name, GENERATED_COLUMN_TYPE, false)
  }

  pub fn is_generated(&self) -> bool {
    self.raw_type == GENERATED_COLUMN_TYPE
  }
}

/// What kind of execution a sheet stems from. Travels as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SqlKind {
  #[default]
  Null = 0,
  Insert = 1,
  Update = 2,
  Delete = 3,
  Ddl = 4,
  Batch = 5,
  InitSchema = 6,
  Other = 7,
}

impl SqlKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Null => "null",
      Self::Insert => "insert",
      Self::Update => "update",
      Self::Delete => "delete",
      Self::Ddl => "ddl",
      Self::Batch => "batch",
      Self::InitSchema => "init_schema",
      Self::Other => "other",
    }
  }
}

impl fmt::Display for SqlKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl TryFrom<u8> for SqlKind {
  type Error = Error;

  fn try_from(code: u8) -> Result<Self, Self::Error> {
    match code {
      0 => Ok(Self::Null),
      1 => Ok(Self::Insert),
      2 => Ok(Self::Update),
      3 => Ok(Self::Delete),
      4 => Ok(Self::Ddl),
      5 => Ok(Self::Batch),
      6 => Ok(Self::InitSchema),
      7 => Ok(Self::Other),
      code => Err(Error::InvalidSqlKind(code)),
    }
  }
}

impl Serialize for SqlKind {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(*self as u8)
  }
}

impl<'de> Deserialize<'de> for SqlKind {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let code = u8::deserialize(deserializer)?;
    SqlKind::try_from(code).map_err(de::Error::custom)
  }
}

/// A statement execution. Only the sql text goes over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Statement {
  pub sql: String,
  // downstream may act on the size of the affected table
  #[serde(skip)]
  pub table_size: u64,
  #[serde(skip)]
  pub kind: SqlKind,
}

impl Statement {
  pub fn new(sql: impl Into<String>, kind: SqlKind) -> Self {
    Self {
      sql: sql.into(),
      table_size: 0,
      kind,
    }
  }

  pub fn with_table_size(mut self, table_size: u64) -> Self {
    self.table_size = table_size;
    self
  }
}
