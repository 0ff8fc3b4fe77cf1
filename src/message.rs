//! Downstream message shapes, the traversal they share, and the memoized serialized form.

pub mod compact;
pub mod record;

use std::cell::OnceCell;

use bytes::Bytes;
use serde::Serialize;

use crate::error::{BoxError, Error, Result};
use crate::row::ChangeRow;
use crate::schema::Statement;
use crate::sheet::Sheet;
use crate::transaction::Transaction;

pub use compact::CompactMessage;
pub use record::RecordMessage;

/// Turns a message into the bytes handed to the transport.
pub trait Encoder {
  fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, BoxError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
  fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, BoxError> {
    Ok(serde_json::to_vec(value)?)
  }
}

/// Serialized form of a message, computed once.
///
/// Not synchronized; a message and its cache belong to a single worker.
#[derive(Debug, Default, Clone)]
pub struct SerializedCache(OnceCell<Bytes>);

impl SerializedCache {
  pub fn get(&self) -> Option<&Bytes> {
    self.0.get()
  }

  pub fn get_or_encode<F>(&self, encode: F) -> Result<Bytes, BoxError>
  where
    F: FnOnce() -> Result<Vec<u8>, BoxError>,
  {
    if let Some(bytes) = self.0.get() {
      return Ok(bytes.clone());
    }
    let bytes = Bytes::from(encode()?);
    Ok(self.0.get_or_init(|| bytes).clone())
  }

  pub fn clear(&mut self) {
    self.0 = OnceCell::new();
  }
}

pub trait Message: Serialize {
  /// Name used when reporting serialization failures.
  const NAME: &'static str;

  fn cache(&self) -> &SerializedCache;

  /// JSON form of the message. The first call encodes, later calls hand out the stored bytes.
  fn bytes(&self) -> Result<Bytes> {
    self.bytes_with(&JsonEncoder)
  }

  fn bytes_with<E: Encoder>(&self, encoder: &E) -> Result<Bytes> {
    self
      .cache()
      .get_or_encode(|| encoder.encode(self))
      .map_err(|source| Error::Serialization {
        message: Self::NAME,
        source,
      })
  }
}

/// One projected unit of a transaction: a bare statement, or one row change.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Unit<'a> {
  Statement {
    sheet: &'a Sheet,
    statement: &'a Statement,
  },
  Change {
    sheet: &'a Sheet,
    row: usize,
    change: &'a ChangeRow,
  },
}

/// Walks a transaction in the order both projections emit messages, numbering units from 1.
///
/// The sequence is transaction scoped. A sheet without rows always consumes a number, even when it has no statement
/// and produces no unit.
pub(crate) fn units(transaction: &Transaction) -> Result<Vec<(u64, Unit<'_>)>> {
  let mut units = Vec::with_capacity(transaction.row_count() + transaction.sheets().len());
  let mut sequence = 0;
  for sheet in transaction.sheets() {
    if sheet.rows().is_empty() {
      sequence += 1;
      if let Some(statement) = &sheet.statement {
        units.push((sequence, Unit::Statement { sheet, statement }));
      }
      continue;
    }

    sheet.index_rows()?;
    for (row, change) in sheet.rows().iter().enumerate() {
      sequence += 1;
      units.push((sequence, Unit::Change { sheet, row, change }));
    }
  }
  Ok(units)
}
