use uuid::Uuid;

/// Source of the per message unique token attached by the compact projection.
pub trait IdGenerator {
  fn next_id(&mut self) -> String;
}

/// Random (v4) uuids.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
  fn next_id(&mut self) -> String {
    Uuid::new_v4().to_string()
  }
}

/// `{prefix}1`, `{prefix}2`, ... for replays and tests that need stable output.
#[derive(Debug, Clone)]
pub struct SequentialIds {
  prefix: String,
  next: u64,
}

impl SequentialIds {
  pub fn new(prefix: impl Into<String>) -> Self {
    Self {
      prefix: prefix.into(),
      next: 1,
    }
  }
}

impl IdGenerator for SequentialIds {
  fn next_id(&mut self) -> String {
    let id = format!("{}{}", self.prefix, self.next);
    self.next += 1;
    id
  }
}
