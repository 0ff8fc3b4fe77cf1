//! Table scoped unit of change, and the reconciliation between positional row images and their keyed view.

use std::cell::OnceCell;
use std::collections::{BTreeSet, HashMap};

use serde::ser::{self, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::row::{ChangeRow, Image, Record, RowData};
use crate::schema::{Column, SqlKind, Statement};
use crate::value::Value;

/// One table scoped unit of change: either row changes, or a single statement.
///
/// The sheet owns its column list. Row images only refer to it by position, and the list only ever grows: columns
/// discovered in keyed data are appended, existing entries are never moved or rewritten.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
  pub db_name: String,
  pub table_name: String,
  pub kind: SqlKind,
  pub event_time: u64,
  pub receive_time: u64,
  pub statement: Option<Statement>,
  pub primary_keys: BTreeSet<String>,
  columns: Vec<Column>,
  rows: Vec<ChangeRow>,
  // name -> position, built on first use and kept current by `push_column`
  index: OnceCell<HashMap<String, usize>>,
}

impl Sheet {
  pub fn new(db_name: impl Into<String>, table_name: impl Into<String>, kind: SqlKind) -> Self {
    Self {
      db_name: db_name.into(),
      table_name: table_name.into(),
      kind,
      ..Default::default()
    }
  }

  pub fn with_times(mut self, event_time: u64, receive_time: u64) -> Self {
    self.event_time = event_time;
    self.receive_time = receive_time;
    self
  }

  pub fn with_statement(mut self, statement: Statement) -> Self {
    self.statement = Some(statement);
    self
  }

  pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
    self.columns = columns;
    self.index = OnceCell::new();
    self
  }

  pub fn with_primary_keys<I, S>(mut self, names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.primary_keys = names.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_rows(mut self, rows: Vec<ChangeRow>) -> Self {
    self.rows = rows;
    self
  }

  pub fn push_row(&mut self, row: ChangeRow) {
    self.rows.push(row);
  }

  pub fn columns(&self) -> &[Column] {
    &self.columns
  }

  pub fn rows(&self) -> &[ChangeRow] {
    &self.rows
  }

  pub fn full_name(&self) -> String {
    format!("{}.{}", self.db_name, self.table_name)
  }

  pub fn column_position(&self, name: &str) -> Option<usize> {
    self.index().get(name).copied()
  }

  /// Builds the name index and checks that every row image spans the column list.
  ///
  /// A row with a different number of values than there are columns means the capture side handed over an
  /// inconsistent sheet, and is reported rather than padded or truncated.
  pub fn index_rows(&self) -> Result<()> {
    self.index();
    for (row, change) in self.rows.iter().enumerate() {
      for image in change.images() {
        self.check_width(row, image)?;
      }
    }
    Ok(())
  }

  /// Keyed view of one image of a row, or `None` when the change has no such image.
  pub fn record(&self, row: usize, image: Image) -> Result<Option<Record>> {
    let change = self.rows.get(row).ok_or_else(|| self.row_not_found(row))?;
    change.image(image).map(|data| self.keyed(row, data)).transpose()
  }

  /// Folds a keyed record back into the positional values of one image of a row.
  ///
  /// Names the sheet does not know yet become generated columns, appended in key order; every other image of the
  /// sheet gains a null slot for each of them so that all images keep spanning the column list.
  pub fn merge_record(&mut self, row: usize, image: Image, record: Record) -> Result<()> {
    let width = self.columns.len();
    let target = self.rows.get(row).ok_or_else(|| self.row_not_found(row))?;
    if let Some(data) = target.image(image) {
      if data.len() != width {
        return Err(self.mismatch(row, data));
      }
    } else {
      // nothing to align against
      return Ok(());
    }

    let mut slots = Vec::with_capacity(record.len());
    for (name, value) in record {
      let position = match self.column_position(&name) {
        Some(position) => position,
        None => self.push_column(Column::generated(name)),
      };
      slots.push((position, value));
    }

    if let Some(data) = self.rows[row].image_mut(image) {
      for (position, value) in slots {
        data.values[position] = value;
      }
    }
    Ok(())
  }

  /// Copies the primary key values of every image into its `pk_values`, in column order.
  pub fn fill_primary_keys(&mut self) {
    if self.primary_keys.is_empty() {
      return;
    }

    let positions = self
      .columns
      .iter()
      .enumerate()
      .filter(|(_, column)| self.primary_keys.contains(&column.name))
      .map(|(i, _)| i)
      .collect::<Vec<_>>();

    for change in &mut self.rows {
      for data in change.images_mut() {
        data.pk_values = positions.iter().filter_map(|&i| data.values.get(i).cloned()).collect();
      }
    }
  }

  pub(crate) fn keyed(&self, row: usize, data: &RowData) -> Result<Record> {
    self.check_width(row, data)?;
    let mut record = Record::new();
    for (column, value) in self.columns.iter().zip(&data.values) {
      record.entry(column.name.clone()).or_insert_with(|| value.clone());
    }
    Ok(record)
  }

  fn push_column(&mut self, column: Column) -> usize {
    let position = self.columns.len();
    log::info!(
      "{}.{}: appending generated column {} at position {}",
      self.db_name,
      self.table_name,
      column.name,
      position
    );

    if let Some(index) = self.index.get_mut() {
      index.entry(column.name.clone()).or_insert(position);
    }
    self.columns.push(column);

    for change in &mut self.rows {
      for data in change.images_mut() {
        data.values.push(Value::Null);
      }
    }
    position
  }

  fn index(&self) -> &HashMap<String, usize> {
    self.index.get_or_init(|| {
      let mut index = HashMap::with_capacity(self.columns.len());
      for (position, column) in self.columns.iter().enumerate() {
        index.entry(column.name.clone()).or_insert(position);
      }
      index
    })
  }

  fn check_width(&self, row: usize, data: &RowData) -> Result<()> {
    if data.len() == self.columns.len() {
      Ok(())
    } else {
      Err(self.mismatch(row, data))
    }
  }

  fn mismatch(&self, row: usize, data: &RowData) -> Error {
    Error::ReconciliationMismatch {
      database: self.db_name.clone(),
      table: self.table_name.clone(),
      row,
      expected: self.columns.len(),
      actual: data.len(),
    }
  }

  fn row_not_found(&self, row: usize) -> Error {
    Error::RowNotFound {
      database: self.db_name.clone(),
      table: self.table_name.clone(),
      row,
    }
  }
}

impl Serialize for Sheet {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let mut state = serializer.serialize_struct("Sheet", 9)?;
    state.serialize_field("db", &self.db_name)?;
    state.serialize_field("tbl", &self.table_name)?;
    state.serialize_field("st", &self.kind)?;
    state.serialize_field("et", &self.event_time)?;
    state.serialize_field("rt", &self.receive_time)?;
    match &self.statement {
      Some(statement) => state.serialize_field("sql", statement)?,
      None => state.skip_field("sql")?,
    }
    if self.columns.is_empty() {
      state.skip_field("cols")?;
    } else {
      state.serialize_field("cols", &self.columns)?;
    }
    if self.rows.is_empty() {
      state.skip_field("rows")?;
    } else {
      let rows = self
        .rows
        .iter()
        .enumerate()
        .map(|(row, change)| ChangeView::new(self, row, change))
        .collect::<Result<Vec<_>>>()
        .map_err(ser::Error::custom)?;
      state.serialize_field("rows", &rows)?;
    }
    if self.primary_keys.is_empty() {
      state.skip_field("PKNames")?;
    } else {
      state.serialize_field("PKNames", &self.primary_keys)?;
    }
    state.end()
  }
}

#[derive(Serialize)]
struct ChangeView<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  before: Option<ImageView<'a>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  after: Option<ImageView<'a>>,
}

impl<'a> ChangeView<'a> {
  fn new(sheet: &Sheet, row: usize, change: &'a ChangeRow) -> Result<Self> {
    Ok(Self {
      before: change.before().map(|data| ImageView::new(sheet, row, data)).transpose()?,
      after: change.after().map(|data| ImageView::new(sheet, row, data)).transpose()?,
    })
  }
}

#[derive(Serialize)]
struct ImageView<'a> {
  #[serde(rename = "pk_vals", skip_serializing_if = "is_empty")]
  pk_values: &'a [Value],
  #[serde(rename = "vals")]
  values: &'a [Value],
  kv_pairs: Record,
}

impl<'a> ImageView<'a> {
  fn new(sheet: &Sheet, row: usize, data: &'a RowData) -> Result<Self> {
    Ok(Self {
      pk_values: &data.pk_values,
      values: &data.values,
      kv_pairs: sheet.keyed(row, data)?,
    })
  }
}

fn is_empty(values: &&[Value]) -> bool {
  values.is_empty()
}

// Wire shape of a sheet. Keyed views are derived, so `kv_pairs` is not read back.
#[derive(Deserialize)]
struct SheetFields {
  #[serde(rename = "db")]
  db_name: String,
  #[serde(rename = "tbl")]
  table_name: String,
  #[serde(rename = "st", default)]
  kind: SqlKind,
  #[serde(rename = "et", default)]
  event_time: u64,
  #[serde(rename = "rt", default)]
  receive_time: u64,
  #[serde(rename = "sql", default)]
  statement: Option<Statement>,
  #[serde(rename = "cols", default)]
  columns: Vec<Column>,
  #[serde(default)]
  rows: Vec<ChangeRow>,
  // capture side sends null when the table has no primary key
  #[serde(rename = "PKNames", default)]
  primary_keys: Option<BTreeSet<String>>,
}

impl From<SheetFields> for Sheet {
  fn from(fields: SheetFields) -> Self {
    Self {
      db_name: fields.db_name,
      table_name: fields.table_name,
      kind: fields.kind,
      event_time: fields.event_time,
      receive_time: fields.receive_time,
      statement: fields.statement,
      primary_keys: fields.primary_keys.unwrap_or_default(),
      columns: fields.columns,
      rows: fields.rows,
      index: OnceCell::new(),
    }
  }
}

impl<'de> Deserialize<'de> for Sheet {
  fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
    SheetFields::deserialize(deserializer).map(Sheet::from)
  }
}
