use std::collections::BTreeMap;

use serde::Serialize;

use super::{units, Message, SerializedCache, Unit};
use crate::codec::{self, EncodedRow};
use crate::error::Result;
use crate::id::IdGenerator;
use crate::schema::SqlKind;
use crate::sheet::Sheet;
use crate::transaction::Transaction;
use crate::value::Value;

/// Fixed schema event: string-or-null row values keyed by column position, timestamps in seconds.
#[derive(Debug, Clone, Serialize)]
pub struct CompactMessage {
  uuid: String,
  source: String,
  #[serde(rename = "command")]
  kind: SqlKind,
  table: String,
  timestamp: u64,
  timestamp_gds: u64,
  fieldnum: u16,
  newrow: Option<EncodedRow>,
  oldrow: Option<EncodedRow>,
  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  extra: BTreeMap<String, Value>,
  #[serde(skip)]
  cache: SerializedCache,
}

impl CompactMessage {
  pub fn uuid(&self) -> &str {
    &self.uuid
  }

  pub fn source(&self) -> &str {
    &self.source
  }

  pub fn kind(&self) -> SqlKind {
    self.kind
  }

  pub fn table(&self) -> &str {
    &self.table
  }

  pub fn timestamp(&self) -> u64 {
    self.timestamp
  }

  pub fn timestamp_gds(&self) -> u64 {
    self.timestamp_gds
  }

  pub fn field_count(&self) -> u16 {
    self.fieldnum
  }

  pub fn new_row(&self) -> Option<&EncodedRow> {
    self.newrow.as_ref()
  }

  pub fn old_row(&self) -> Option<&EncodedRow> {
    self.oldrow.as_ref()
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

impl Message for CompactMessage {
  const NAME: &'static str = "compact";

  fn cache(&self) -> &SerializedCache {
    &self.cache
  }
}

/// Flattens a transaction into compact messages. `ids` supplies the per message uuid.
pub fn project<G: IdGenerator + ?Sized>(transaction: &Transaction, ids: &mut G) -> Result<Vec<CompactMessage>> {
  let units = units(transaction)?;
  let mut messages = Vec::with_capacity(units.len());
  for (sequence, unit) in units {
    let (sheet, before, after) = match unit {
      Unit::Statement { sheet, .. } => (sheet, None, None),
      Unit::Change { sheet, change, .. } => (
        sheet,
        change.before().map(|data| codec::encode_row(&data.values)),
        change.after().map(|data| codec::encode_row(&data.values)),
      ),
    };
    messages.push(CompactMessage {
      uuid: ids.next_id(),
      source: source_id(transaction.xid(), sequence),
      kind: sheet.kind,
      table: sheet.full_name(),
      // the event time is taken from the transaction, the receive time from the sheet
      timestamp: transaction.event_time() / 1000,
      timestamp_gds: sheet.receive_time / 1000,
      fieldnum: field_count(sheet),
      newrow: after,
      oldrow: before,
      extra: BTreeMap::new(),
      cache: SerializedCache::default(),
    });
  }
  log::trace!("projected {} compact messages from {}", messages.len(), transaction.xid());
  Ok(messages)
}

fn source_id(xid: &str, sequence: u64) -> String {
  format!("{}.{}", xid.replace(':', "."), sequence)
}

fn field_count(sheet: &Sheet) -> u16 {
  u16::try_from(sheet.columns().len()).unwrap_or(u16::MAX)
}
