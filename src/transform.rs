//! Per column value rewriting over every row image of a transaction.

mod constant;

pub use constant::Constant;

use crate::error::{BoxError, Error, Result};
use crate::row::{Image, Record};
use crate::transaction::Transaction;

/// Rewrites a subset of a row's values.
///
/// Receives the keyed view of one row image and returns only the fields it changed. Names the row does not carry
/// become generated columns of the sheet once merged back.
pub trait Transformer {
  fn transform(&self, record: &Record) -> Result<Record, BoxError>;
}

impl<F> Transformer for F
where
  F: Fn(&Record) -> Result<Record, BoxError>,
{
  fn transform(&self, record: &Record) -> Result<Record, BoxError> {
    self(record)
  }
}

/// Runs `transformer` over the before and after image of every row, merging what it returns back into the rows.
///
/// Images whose keyed view is empty are not handed to the transformer. Stops at the first transformer error. Rows rewritten before it keep their new values; callers that need all or
/// nothing should keep a copy of the transaction.
pub fn apply<T: Transformer + ?Sized>(transformer: &T, transaction: &mut Transaction) -> Result<()> {
  for sheet in transaction.sheets_mut() {
    sheet.index_rows()?;
    log::debug!("transforming {} rows of {}", sheet.rows().len(), sheet.full_name());

    for row in 0..sheet.rows().len() {
      for image in [Image::Before, Image::After] {
        let record = match sheet.record(row, image)? {
          Some(record) if !record.is_empty() => record,
          // absent image, or a row without columns
          _ => continue,
        };
        let changed = transformer.transform(&record).map_err(|source| Error::Transform {
          database: sheet.db_name.clone(),
          table: sheet.table_name.clone(),
          row,
          source,
        })?;
        if !changed.is_empty() {
          sheet.merge_record(row, image, changed)?;
        }
      }
    }
  }
  Ok(())
}

#[cfg(test)]
mod test {
  use super::apply;
  use crate::error::{BoxError, Error};
  use crate::row::{ChangeRow, Record, RowData};
  use crate::schema::{Column, SqlKind};
  use crate::sheet::Sheet;
  use crate::transaction::Transaction;
  use crate::value::Value;
  use std::cell::Cell;

  fn transaction() -> Transaction {
    Transaction::new("xid", "cp").with_sheet(
      Sheet::new("shop", "users", SqlKind::Update)
        .with_columns(vec![Column::new("id", "int", false), Column::new("n", "int", false)])
        .with_rows(vec![
          ChangeRow::update(
            RowData::new(vec![Value::I64(1), Value::I64(10)]),
            RowData::new(vec![Value::I64(1), Value::I64(11)]),
          ),
          ChangeRow::insert(RowData::new(vec![Value::I64(2), Value::I64(20)])),
        ]),
    )
  }

  #[test]
  fn visits_every_present_image() {
    let mut transaction = transaction();
    let calls = Cell::new(0);
    let double = |record: &Record| -> Result<Record, BoxError> {
      calls.set(calls.get() + 1);
      let n = match record.get("n") {
        Some(Value::I64(n)) => *n,
        _ => return Err("n is not an integer".into()),
      };
      Ok(Record::from([("n".to_string(), Value::I64(n * 2))]))
    };

    apply(&double, &mut transaction).unwrap();
    assert_eq!(calls.get(), 3);

    let rows = transaction.sheets()[0].rows();
    assert_eq!(rows[0].before().unwrap().values[1], Value::I64(20));
    assert_eq!(rows[0].after().unwrap().values[1], Value::I64(22));
    assert_eq!(rows[1].after().unwrap().values[1], Value::I64(40));
  }

  #[test]
  fn error_aborts_without_rollback() {
    let mut transaction = transaction();
    let fail_on_second_row = |record: &Record| -> Result<Record, BoxError> {
      if record.get("id") == Some(&Value::I64(2)) {
        return Err("refused".into());
      }
      Ok(Record::from([("n".to_string(), Value::I64(0))]))
    };

    match apply(&fail_on_second_row, &mut transaction) {
      Err(Error::Transform { table, row, .. }) => {
        assert_eq!(table, "users");
        assert_eq!(row, 1);
      }
      unexpected => panic!("unexpected {:?}", unexpected),
    }

    let rows = transaction.sheets()[0].rows();
    assert_eq!(rows[0].after().unwrap().values[1], Value::I64(0));
    assert_eq!(rows[1].after().unwrap().values[1], Value::I64(20));
  }

  #[test]
  fn empty_rows_are_left_alone() {
    let mut transaction = Transaction::new("xid", "cp").with_sheet(
      Sheet::new("shop", "empty", SqlKind::Insert).with_rows(vec![ChangeRow::insert(RowData::default())]),
    );
    let calls = Cell::new(0);
    let stamp = |_: &Record| -> Result<Record, BoxError> {
      calls.set(calls.get() + 1);
      Ok(Record::from([("stamped".to_string(), Value::Bool(true))]))
    };

    apply(&stamp, &mut transaction).unwrap();
    let sheet = &transaction.sheets()[0];
    assert_eq!(calls.get(), 0);
    assert!(sheet.columns().is_empty());
    assert!(sheet.rows()[0].after().unwrap().values.is_empty());
  }

  #[test]
  fn mismatched_rows_fail_before_transforming() {
    let mut transaction = Transaction::new("xid", "cp").with_sheet(
      Sheet::new("shop", "users", SqlKind::Insert)
        .with_columns(vec![Column::new("id", "int", false)])
        .with_rows(vec![ChangeRow::insert(RowData::new(vec![]))]),
    );
    let untouched = |_: &Record| -> Result<Record, BoxError> { panic!("transformer must not run") };
    assert!(matches!(
      apply(&untouched, &mut transaction),
      Err(Error::ReconciliationMismatch { expected: 1, actual: 0, .. })
    ));
  }
}
