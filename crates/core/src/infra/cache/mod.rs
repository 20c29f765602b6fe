//! # Cache gateway
//!
//! One shared handle to the key-value
//! store plus a sticky error flag.
//!
//! Every call returns a `Result`. Backend
//! failures are also recorded on the
//! gateway and stay visible through
//! [`CacheGateway::check_error`] until
//! [`CacheGateway::reset_error`] runs, so a
//! handler can tell a previous request
//! failed before it issues a new write.

mod memory_store;
mod redis_store;

use std::future::Future;
use std::sync::{
  Arc,
  RwLock
};
use std::time::Duration;

pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;
use tracing::{
  info,
  warn
};

use crate::domain::error::{
  GatewayError,
  GatewayState
};
use crate::domain::model::{
  CacheEntry,
  ConnectionProfile
};
use crate::ports::cache::{
  CacheStore,
  StoreError
};

const CONNECT_ERROR: &str =
  "Connection error trying to access the cache.";

pub struct CacheGateway {
  state:   GatewayState,
  store:   RwLock<Option<Arc<dyn CacheStore>>>,
  timeout: Duration
}

impl CacheGateway {
  /// Connects to Redis and checks it with
  /// `INFO`. Failure leaves the gateway
  /// disconnected with the reason recorded.
  pub async fn connect(
    profile: &ConnectionProfile
  ) -> Self {
    let gateway = Self {
      state:   GatewayState::new(),
      store:   RwLock::new(None),
      timeout: profile.timeout()
    };
    gateway.reconnect(profile).await;
    gateway
  }

  pub fn with_store(
    store: Arc<dyn CacheStore>,
    timeout: Duration
  ) -> Self {
    let state = GatewayState::new();
    state.set_connected(true);
    Self {
      state,
      store: RwLock::new(Some(store)),
      timeout
    }
  }

  /// Replaces the current handle. Returns
  /// whether the new one answered.
  pub async fn reconnect(
    &self,
    profile: &ConnectionProfile
  ) -> bool {
    let connected = match tokio::time::timeout(
      self.timeout,
      RedisStore::connect(profile)
    )
    .await
    {
      | Ok(Ok(store)) => Ok(store),
      | Ok(Err(e)) => Err(e),
      | Err(_) => {
        Err(format!(
          "redis connect timed out after {} \
           ms",
          self.timeout.as_millis()
        ))
      }
    };

    let store: Arc<dyn CacheStore> =
      match connected {
        | Ok(store) => Arc::new(store),
        | Err(e) => {
          warn!(
            host = %profile.host,
            port = profile.port,
            error = %e,
            "cache connect failed"
          );
          self.install(None);
          self
            .state
            .record_disconnect(CONNECT_ERROR);
          return false;
        }
      };

    match tokio::time::timeout(
      self.timeout,
      store.info()
    )
    .await
    {
      | Ok(Ok(_)) => {
        info!(
          host = %profile.host,
          port = profile.port,
          "cache connected"
        );
        self.install(Some(store));
        self.state.set_connected(true);
        true
      }
      | Ok(Err(e)) => {
        warn!(
          error = %e,
          "cache info check failed"
        );
        self.install(Some(store));
        self
          .state
          .record_disconnect(CONNECT_ERROR);
        false
      }
      | Err(_) => {
        warn!("cache info check timed out");
        self.install(Some(store));
        self
          .state
          .record_disconnect(CONNECT_ERROR);
        false
      }
    }
  }

  fn install(
    &self,
    store: Option<Arc<dyn CacheStore>>
  ) {
    if let Ok(mut guard) = self.store.write()
    {
      *guard = store;
    }
  }

  fn store(
    &self
  ) -> Result<Arc<dyn CacheStore>, GatewayError>
  {
    let store = self
      .store
      .read()
      .ok()
      .and_then(|s| s.clone());

    store.ok_or_else(|| {
      let e = GatewayError::Connectivity(
        "no cache connection".to_string()
      );
      self.state.record_error(e.message());
      e
    })
  }

  /// Runs one store call under the timeout
  /// and records any failure as sticky.
  async fn run<T, Fut>(
    &self,
    context: String,
    call: Fut
  ) -> Result<T, GatewayError>
  where
    Fut: Future<Output = Result<T, StoreError>>
  {
    let err = match tokio::time::timeout(
      self.timeout,
      call
    )
    .await
    {
      | Ok(Ok(value)) => {
        self.state.set_connected(true);
        return Ok(value);
      }
      | Ok(Err(StoreError::Failed(e))) => {
        GatewayError::Operation(format!(
          "{context}: {e}"
        ))
      }
      | Ok(Err(StoreError::Unavailable(e))) => {
        self.state.set_connected(false);
        GatewayError::Connectivity(format!(
          "{context}: {e}"
        ))
      }
      | Err(_) => {
        self.state.set_connected(false);
        GatewayError::Connectivity(format!(
          "{context}: timed out after {} ms",
          self.timeout.as_millis()
        ))
      }
    };

    warn!(error = %err, "cache call failed");
    self.state.record_error(err.message());
    Err(err)
  }

  pub async fn set(
    &self,
    key: &str,
    value: &str
  ) -> Result<(), GatewayError> {
    let store = self.store()?;
    self
      .run(
        format!(
          "Failed to set value {value} to key \
           {key}"
        ),
        store.set(key, value)
      )
      .await
  }

  /// `Ok(None)` for a missing key. An empty
  /// key is rejected without touching the
  /// sticky flag.
  pub async fn get(
    &self,
    key: &str
  ) -> Result<Option<String>, GatewayError> {
    if key.trim().is_empty() {
      return Err(GatewayError::Validation(
        "can't read from the cache with an \
         empty key"
          .to_string()
      ));
    }
    let store = self.store()?;
    self
      .run(
        format!(
          "Failed to get value for key {key}"
        ),
        store.get(key)
      )
      .await
  }

  pub async fn append_to_list(
    &self,
    key: &str,
    value: &str
  ) -> Result<u64, GatewayError> {
    let store = self.store()?;
    self
      .run(
        format!(
          "Failed to append value {value} to \
           list with key {key}"
        ),
        store.rpush(key, value)
      )
      .await
  }

  /// Every key with its value, sorted by
  /// key. List values are concatenated and
  /// non-UTF-8 keys are shown lossily.
  pub async fn list_all(
    &self
  ) -> Result<Vec<CacheEntry>, GatewayError> {
    let store = self.store()?;
    let context =
      "Failed to obtain cache key/value info";

    let mut keys = self
      .run(context.to_string(), store.keys())
      .await?;
    keys.sort();

    let mut entries =
      Vec::with_capacity(keys.len());
    for key in keys {
      let value = self
        .run(
          context.to_string(),
          store.value_of(&key)
        )
        .await?;
      // Keys can expire between KEYS and
      // the read.
      if let Some(value) = value {
        entries.push(CacheEntry {
          key:   String::from_utf8_lossy(&key)
            .into_owned(),
          value: value.display()
        });
      }
    }
    Ok(entries)
  }

  /// Server metadata as pretty JSON with
  /// sorted keys.
  pub async fn info(
    &self
  ) -> Result<String, GatewayError> {
    let store = self.store()?;
    let context =
      "Error trying to read cache information";
    let info = self
      .run(context.to_string(), store.info())
      .await?;

    serde_json::to_string_pretty(&info).map_err(
      |e| {
        let err = GatewayError::Operation(
          format!("{context}: {e}")
        );
        self.state.record_error(err.message());
        err
      }
    )
  }

  pub fn check_error(&self) -> Option<String> {
    self.state.check_error()
  }

  pub fn reset_error(&self) {
    self.state.reset_error();
  }

  pub fn is_connected(&self) -> bool {
    self.state.is_connected()
  }
}
