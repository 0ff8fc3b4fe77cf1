use std::collections::BTreeMap;

use serde::Serialize;

use super::{units, Message, SerializedCache, Unit};
use crate::error::Result;
use crate::row::Record;
use crate::schema::SqlKind;
use crate::transaction::Transaction;
use crate::value::Value;

/// One statement or one row change, with row images keyed by column name.
#[derive(Debug, Clone, Serialize)]
pub struct RecordMessage {
  id: String,
  #[serde(rename = "st")]
  kind: SqlKind,
  #[serde(rename = "db")]
  db_name: String,
  #[serde(rename = "tbl_name")]
  table_name: String,
  #[serde(rename = "et")]
  event_time: u64,
  #[serde(rename = "rt")]
  receive_time: u64,
  #[serde(skip_serializing_if = "String::is_empty")]
  sql: String,
  #[serde(rename = "old", skip_serializing_if = "Option::is_none")]
  before: Option<Record>,
  #[serde(rename = "new", skip_serializing_if = "Option::is_none")]
  after: Option<Record>,
  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  extra: BTreeMap<String, Value>,
  #[serde(skip)]
  cache: SerializedCache,
}

impl RecordMessage {
  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn kind(&self) -> SqlKind {
    self.kind
  }

  pub fn db_name(&self) -> &str {
    &self.db_name
  }

  pub fn table_name(&self) -> &str {
    &self.table_name
  }

  pub fn event_time(&self) -> u64 {
    self.event_time
  }

  pub fn receive_time(&self) -> u64 {
    self.receive_time
  }

  pub fn sql(&self) -> &str {
    &self.sql
  }

  pub fn before(&self) -> Option<&Record> {
    self.before.as_ref()
  }

  pub fn after(&self) -> Option<&Record> {
    self.after.as_ref()
  }

  pub fn extra(&self) -> &BTreeMap<String, Value> {
    &self.extra
  }

  pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.extra.insert(key.into(), value.into());
    self.cache.clear();
    self
  }
}

impl Message for RecordMessage {
  const NAME: &'static str = "record";

  fn cache(&self) -> &SerializedCache {
    &self.cache
  }
}

/// Flattens a transaction into record messages, ids `{xid}#{batch number}#{sequence}`.
pub fn project(transaction: &Transaction) -> Result<Vec<RecordMessage>> {
  let units = units(transaction)?;
  let mut messages = Vec::with_capacity(units.len());
  for (sequence, unit) in units {
    let id = format!("{}#{}#{}", transaction.xid(), transaction.batch_number(), sequence);
    let message = match unit {
      Unit::Statement { sheet, statement } => RecordMessage {
        id,
        kind: sheet.kind,
        db_name: sheet.db_name.clone(),
        table_name: sheet.table_name.clone(),
        event_time: sheet.event_time,
        receive_time: sheet.receive_time,
        sql: statement.sql.clone(),
        before: None,
        after: None,
        extra: BTreeMap::new(),
        cache: SerializedCache::default(),
      },
      Unit::Change { sheet, row, change } => RecordMessage {
        id,
        kind: sheet.kind,
        db_name: sheet.db_name.clone(),
        table_name: sheet.table_name.clone(),
        event_time: sheet.event_time,
        receive_time: sheet.receive_time,
        // kept for traceability; the images are authoritative
        sql: sheet.statement.as_ref().map(|s| s.sql.clone()).unwrap_or_default(),
        before: change.before().map(|data| sheet.keyed(row, data)).transpose()?,
        after: change.after().map(|data| sheet.keyed(row, data)).transpose()?,
        extra: BTreeMap::new(),
        cache: SerializedCache::default(),
      },
    };
    messages.push(message);
  }
  log::trace!("projected {} record messages from {}", messages.len(), transaction.xid());
  Ok(messages)
}
