use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::SqlKind;
use crate::value::Value;

/// Keyed view of a row image: column name to value.
pub type Record = BTreeMap<String, Value>;

/// One row image. `values[i]` belongs to the column at position `i` of the owning sheet; the keyed view is
/// derived from that, see [`crate::sheet::Sheet::record`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RowData {
  #[serde(rename = "pk_vals", default, skip_serializing_if = "Vec::is_empty")]
  pub pk_values: Vec<Value>,
  #[serde(rename = "vals", default)]
  pub values: Vec<Value>,
}

impl RowData {
  pub fn new(values: Vec<Value>) -> Self {
    Self {
      pk_values: Vec::new(),
      values,
    }
  }

  pub fn get(&self, position: usize) -> Option<&Value> {
    self.values.get(position)
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

impl<V: Into<Value>> FromIterator<V> for RowData {
  fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
    Self::new(iter.into_iter().map(Into::into).collect())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Image {
  Before,
  After,
}

/// A single row change. Which images are present is fixed by the variant.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "ChangeImages")]
pub enum ChangeRow {
  Insert { after: RowData },
  Update { before: RowData, after: RowData },
  Delete { before: RowData },
}

impl ChangeRow {
  pub fn insert(after: RowData) -> Self {
    Self::Insert { after }
  }

  pub fn update(before: RowData, after: RowData) -> Self {
    Self::Update { before, after }
  }

  pub fn delete(before: RowData) -> Self {
    Self::Delete { before }
  }

  pub fn from_images(before: Option<RowData>, after: Option<RowData>) -> Option<Self> {
    match (before, after) {
      (Some(before), Some(after)) => Some(Self::Update { before, after }),
      (None, Some(after)) => Some(Self::Insert { after }),
      (Some(before), None) => Some(Self::Delete { before }),
      (None, None) => None,
    }
  }

  pub fn kind(&self) -> SqlKind {
    match self {
      Self::Insert { .. } => SqlKind::Insert,
      Self::Update { .. } => SqlKind::Update,
      Self::Delete { .. } => SqlKind::Delete,
    }
  }

  pub fn before(&self) -> Option<&RowData> {
    self.image(Image::Before)
  }

  pub fn after(&self) -> Option<&RowData> {
    self.image(Image::After)
  }

  pub fn image(&self, image: Image) -> Option<&RowData> {
    match (self, image) {
      (Self::Update { before, .. } | Self::Delete { before }, Image::Before) => Some(before),
      (Self::Update { after, .. } | Self::Insert { after }, Image::After) => Some(after),
      _ => None,
    }
  }

  pub fn image_mut(&mut self, image: Image) -> Option<&mut RowData> {
    match (self, image) {
      (Self::Update { before, .. } | Self::Delete { before }, Image::Before) => Some(before),
      (Self::Update { after, .. } | Self::Insert { after }, Image::After) => Some(after),
      _ => None,
    }
  }

  pub fn images(&self) -> impl Iterator<Item = &RowData> {
    self.before().into_iter().chain(self.after())
  }

  pub(crate) fn images_mut(&mut self) -> impl Iterator<Item = &mut RowData> {
    let (before, after) = match self {
      Self::Insert { after } => (None, Some(after)),
      Self::Update { before, after } => (Some(before), Some(after)),
      Self::Delete { before } => (Some(before), None),
    };
    before.into_iter().chain(after)
  }
}

// Wire shape of a change: two optional images.
#[derive(Deserialize)]
struct ChangeImages {
  #[serde(default)]
  before: Option<RowData>,
  #[serde(default)]
  after: Option<RowData>,
}

impl TryFrom<ChangeImages> for ChangeRow {
  type Error = &'static str;

  fn try_from(images: ChangeImages) -> Result<Self, Self::Error> {
    ChangeRow::from_images(images.before, images.after).ok_or("change row carries neither a before nor an after image")
  }
}

#[cfg(test)]
mod test {
  use super::{ChangeRow, Image, RowData};
  use crate::schema::SqlKind;
  use crate::value::Value;

  #[test]
  fn variant_decides_kind_and_images() {
    let insert = ChangeRow::insert(RowData::from_iter([1_i64]));
    assert_eq!(insert.kind(), SqlKind::Insert);
    assert!(insert.before().is_none());
    assert_eq!(insert.after().unwrap().get(0), Some(&Value::I64(1)));

    let delete = ChangeRow::delete(RowData::from_iter([2_i64]));
    assert_eq!(delete.kind(), SqlKind::Delete);
    assert!(delete.image(Image::After).is_none());

    let update = ChangeRow::update(RowData::from_iter([1_i64]), RowData::from_iter([2_i64]));
    assert_eq!(update.kind(), SqlKind::Update);
    assert_eq!(update.images().count(), 2);
  }

  #[test]
  fn deserializes_from_optional_images() {
    let change: ChangeRow = serde_json::from_str(r#"{"before":{"vals":[1,"a"]}}"#).unwrap();
    assert_eq!(change, ChangeRow::delete(RowData::new(vec![Value::I64(1), Value::from("a")])));

    let change: ChangeRow =
      serde_json::from_str(r#"{"before":{"vals":[1]},"after":{"pk_vals":[2],"vals":[2],"kv_pairs":{"id":2}}}"#)
        .unwrap();
    assert_eq!(change.kind(), SqlKind::Update);
    assert_eq!(change.after().unwrap().pk_values, vec![Value::I64(2)]);

    assert!(serde_json::from_str::<ChangeRow>("{}").is_err());
  }
}
