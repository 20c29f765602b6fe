//! Key-value store abstraction behind
//! the cache gateway.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::model::CacheValue;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
  /// The store could not be reached.
  #[error("{0}")]
  Unavailable(String),
  /// The store answered with an error.
  #[error("{0}")]
  Failed(String)
}

#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
  async fn set(
    &self,
    key: &str,
    value: &str
  ) -> Result<(), StoreError>;

  async fn get(
    &self,
    key: &str
  ) -> Result<Option<String>, StoreError>;

  /// Appends to the list at `key` and
  /// returns the new length.
  async fn rpush(
    &self,
    key: &str,
    value: &str
  ) -> Result<u64, StoreError>;

  /// Raw key bytes; other clients may
  /// write keys that are not UTF-8.
  async fn keys(
    &self
  ) -> Result<Vec<Vec<u8>>, StoreError>;

  /// Reads a key of any supported type.
  async fn value_of(
    &self,
    key: &[u8]
  ) -> Result<Option<CacheValue>, StoreError>;

  async fn info(
    &self
  ) -> Result<BTreeMap<String, String>, StoreError>;
}
