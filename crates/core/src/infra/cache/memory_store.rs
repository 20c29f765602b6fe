//! Process-local cache store for dev runs
//! and tests. Mirrors the subset of Redis
//! semantics the gateway relies on.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::domain::model::CacheValue;
use crate::ports::cache::{
  CacheStore,
  StoreError
};

const WRONG_TYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

#[derive(Debug, Default)]

pub struct MemoryStore {
  entries: Mutex<BTreeMap<String, CacheValue>>
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn with_entries<T>(
    &self,
    f: impl FnOnce(
      &mut BTreeMap<String, CacheValue>
    ) -> Result<T, StoreError>
  ) -> Result<T, StoreError> {
    let mut entries =
      self.entries.lock().map_err(|_| {
        StoreError::Failed(
          "memory store lock poisoned"
            .to_string()
        )
      })?;

    f(&mut entries)
  }
}

#[async_trait::async_trait]
impl CacheStore for MemoryStore {
  async fn set(
    &self,
    key: &str,
    value: &str
  ) -> Result<(), StoreError> {
    self.with_entries(|e| {
      e.insert(
        key.to_string(),
        CacheValue::Text(value.to_string())
      );
      Ok(())
    })
  }

  async fn get(
    &self,
    key: &str
  ) -> Result<Option<String>, StoreError> {
    self.with_entries(|e| {
      match e.get(key) {
        | None => Ok(None),
        | Some(CacheValue::Text(v)) => {
          Ok(Some(v.clone()))
        }
        | Some(CacheValue::List(_)) => {
          Err(StoreError::Failed(
            WRONG_TYPE.to_string()
          ))
        }
      }
    })
  }

  async fn rpush(
    &self,
    key: &str,
    value: &str
  ) -> Result<u64, StoreError> {
    self.with_entries(|e| {
      let entry = e
        .entry(key.to_string())
        .or_insert_with(|| {
          CacheValue::List(Vec::new())
        });

      match entry {
        | CacheValue::List(items) => {
          items.push(value.to_string());
          Ok(items.len() as u64)
        }
        | CacheValue::Text(_) => {
          Err(StoreError::Failed(
            WRONG_TYPE.to_string()
          ))
        }
      }
    })
  }

  async fn keys(
    &self
  ) -> Result<Vec<Vec<u8>>, StoreError> {
    self.with_entries(|e| {
      Ok(
        e.keys()
          .map(|k| k.as_bytes().to_vec())
          .collect()
      )
    })
  }

  async fn value_of(
    &self,
    key: &[u8]
  ) -> Result<Option<CacheValue>, StoreError>
  {
    // Keys here are always UTF-8, so a
    // non-UTF-8 lookup can only miss.
    let Ok(key) = std::str::from_utf8(key)
    else {
      return Ok(None);
    };

    self.with_entries(|e| {
      Ok(e.get(key).cloned())
    })
  }

  async fn info(
    &self
  ) -> Result<BTreeMap<String, String>, StoreError>
  {
    self.with_entries(|e| {
      let mut info = BTreeMap::new();
      info.insert(
        "backend".to_string(),
        "memory".to_string()
      );
      info.insert(
        "db0".to_string(),
        format!("keys={}", e.len())
      );
      Ok(info)
    })
  }
}
