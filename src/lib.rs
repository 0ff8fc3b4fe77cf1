//! Reshapes one captured database transaction into downstream messages.
//!
//! A [`Transaction`] holds [`Sheet`]s of row changes or bare statements. Rows can be rewritten in place through a
//! [`Transformer`], then projected into [`RecordMessage`]s or [`CompactMessage`]s, or sent as is. Every message
//! serializes once and hands out the cached bytes afterwards, see [`Message::bytes`].

pub mod codec;
pub mod error;
pub mod id;
pub mod message;
pub mod row;
pub mod schema;
pub mod sheet;
pub mod transaction;
pub mod transform;
pub mod value;

pub use error::{BoxError, Error, Result};
pub use id::{IdGenerator, RandomIds, SequentialIds};
pub use message::{CompactMessage, Encoder, JsonEncoder, Message, RecordMessage};
pub use row::{ChangeRow, Image, Record, RowData};
pub use schema::{Column, SqlKind, Statement, GENERATED_COLUMN_TYPE};
pub use sheet::Sheet;
pub use transaction::Transaction;
pub use transform::{Constant, Transformer};
pub use value::Value;
