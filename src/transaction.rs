use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::id::IdGenerator;
use crate::message::{compact, record, CompactMessage, Message, RecordMessage, SerializedCache};
use crate::sheet::Sheet;
use crate::transform::{self, Transformer};

/// One captured transaction, the unit handed over by the capture side.
///
/// `change_position`, `xid` and `batch_number` identify the transaction for downstream deduplication and are carried
/// through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "TransactionFields")]
pub struct Transaction {
  #[serde(rename = "cp")]
  change_position: String,
  xid: String,
  #[serde(rename = "lc")]
  last_committed: i64,
  #[serde(rename = "bn")]
  batch_number: i64,
  #[serde(rename = "et")]
  event_time: u64,
  #[serde(rename = "rt")]
  receive_time: u64,
  #[serde(rename = "ts")]
  sheets: Vec<Sheet>,
  #[serde(skip)]
  size: u64,
  #[serde(skip)]
  cache: SerializedCache,
}

impl Transaction {
  pub fn new(xid: impl Into<String>, change_position: impl Into<String>) -> Self {
    Self {
      xid: xid.into(),
      change_position: change_position.into(),
      ..Default::default()
    }
  }

  pub fn with_batch_number(mut self, batch_number: i64) -> Self {
    self.batch_number = batch_number;
    self
  }

  pub fn with_last_committed(mut self, last_committed: i64) -> Self {
    self.last_committed = last_committed;
    self
  }

  pub fn with_times(mut self, event_time: u64, receive_time: u64) -> Self {
    self.event_time = event_time;
    self.receive_time = receive_time;
    self
  }

  pub fn with_size_hint(mut self, size: u64) -> Self {
    self.size = size;
    self
  }

  pub fn with_sheet(mut self, sheet: Sheet) -> Self {
    self.push_sheet(sheet);
    self
  }

  pub fn push_sheet(&mut self, sheet: Sheet) {
    self.sheets.push(sheet);
    self.cache.clear();
  }

  pub fn change_position(&self) -> &str {
    &self.change_position
  }

  pub fn xid(&self) -> &str {
    &self.xid
  }

  pub fn last_committed(&self) -> i64 {
    self.last_committed
  }

  pub fn batch_number(&self) -> i64 {
    self.batch_number
  }

  pub fn event_time(&self) -> u64 {
    self.event_time
  }

  pub fn receive_time(&self) -> u64 {
    self.receive_time
  }

  pub fn row_count(&self) -> usize {
    self.sheets.iter().map(|sheet| sheet.rows().len()).sum()
  }

  pub fn size_hint(&self) -> u64 {
    self.size
  }

  pub fn sheets(&self) -> &[Sheet] {
    &self.sheets
  }

  /// Mutable access to the sheets. Drops any serialized form taken so far.
  pub fn sheets_mut(&mut self) -> &mut [Sheet] {
    self.cache.clear();
    &mut self.sheets
  }

  /// Checks every sheet's rows against its column list, see [`Sheet::index_rows`].
  pub fn index_rows(&self) -> Result<()> {
    self.sheets.iter().try_for_each(Sheet::index_rows)
  }

  pub fn fill_primary_keys(&mut self) {
    self.sheets_mut().iter_mut().for_each(Sheet::fill_primary_keys);
  }

  /// Runs `transformer` over every row image in place, see [`transform::apply`].
  pub fn transform<T: Transformer + ?Sized>(&mut self, transformer: &T) -> Result<()> {
    transform::apply(transformer, self)
  }

  pub fn to_record_messages(&self) -> Result<Vec<RecordMessage>> {
    record::project(self)
  }

  pub fn to_compact_messages<G: IdGenerator + ?Sized>(&self, ids: &mut G) -> Result<Vec<CompactMessage>> {
    compact::project(self, ids)
  }
}

impl Message for Transaction {
  const NAME: &'static str = "pack";

  fn cache(&self) -> &SerializedCache {
    &self.cache
  }
}

#[derive(Deserialize)]
struct TransactionFields {
  #[serde(rename = "cp", default)]
  change_position: String,
  xid: String,
  #[serde(rename = "lc", default)]
  last_committed: i64,
  #[serde(rename = "bn", default)]
  batch_number: i64,
  #[serde(rename = "et", default)]
  event_time: u64,
  #[serde(rename = "rt", default)]
  receive_time: u64,
  #[serde(rename = "ts", default)]
  sheets: Vec<Sheet>,
}

impl From<TransactionFields> for Transaction {
  fn from(fields: TransactionFields) -> Self {
    let mut transaction = Transaction::new(fields.xid, fields.change_position)
      .with_batch_number(fields.batch_number)
      .with_last_committed(fields.last_committed)
      .with_times(fields.event_time, fields.receive_time);
    for sheet in fields.sheets {
      transaction.push_sheet(sheet);
    }
    transaction
  }
}

#[cfg(test)]
mod test {
  use super::Transaction;
  use crate::message::Message;
  use crate::row::{ChangeRow, RowData};
  use crate::schema::{Column, SqlKind, Statement};
  use crate::sheet::Sheet;
  use crate::value::Value;

  fn sample() -> Transaction {
    Transaction::new("gtid:17", "mysql-bin.000002:4096")
      .with_batch_number(3)
      .with_last_committed(16)
      .with_times(1000, 2000)
      .with_sheet(
        Sheet::new("shop", "users", SqlKind::Insert)
          .with_times(1000, 2000)
          .with_statement(Statement::new("INSERT INTO users VALUES (1)", SqlKind::Insert))
          .with_columns(vec![Column::new("id", "int", false)])
          .with_rows(vec![ChangeRow::insert(RowData::new(vec![Value::I64(1)]))]),
      )
  }

  #[test]
  fn wire_form() {
    let transaction = sample();
    assert_eq!(transaction.row_count(), 1);
    assert_eq!(
      std::str::from_utf8(&transaction.bytes().unwrap()).unwrap(),
      r#"{"cp":"mysql-bin.000002:4096","xid":"gtid:17","lc":16,"bn":3,"et":1000,"rt":2000,"ts":[{"db":"shop","tbl":"users","st":1,"et":1000,"rt":2000,"sql":{"sql":"INSERT INTO users VALUES (1)"},"cols":[{"name":"id","type":"int","nullable":false}],"rows":[{"after":{"vals":[1],"kv_pairs":{"id":1}}}]}]}"#
    );
  }

  #[test]
  fn decodes_and_counts_rows() {
    let bytes = sample().bytes().unwrap();
    let decoded: Transaction = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(decoded.xid(), "gtid:17");
    assert_eq!(decoded.change_position(), "mysql-bin.000002:4096");
    assert_eq!(decoded.batch_number(), 3);
    assert_eq!(decoded.row_count(), 1);
    assert_eq!(decoded.bytes().unwrap(), bytes);
  }

  #[test]
  fn mutable_access_drops_cached_bytes() {
    let mut transaction = sample();
    transaction.bytes().unwrap();
    assert!(transaction.cache().get().is_some());
    transaction.sheets_mut()[0].db_name = "archive".to_string();
    assert!(transaction.cache().get().is_none());
    assert!(std::str::from_utf8(&transaction.bytes().unwrap()).unwrap().contains(r#""db":"archive""#));
  }
}
