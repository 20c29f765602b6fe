//! Redis-backed cache store over a
//! multiplexed connection manager.

use std::collections::BTreeMap;

use redis::aio::{
  ConnectionManager,
  ConnectionManagerConfig
};
use redis::{
  AsyncCommands,
  Client,
  RedisError
};

use crate::domain::model::{
  CacheValue,
  ConnectionProfile
};
use crate::ports::cache::{
  CacheStore,
  StoreError
};

#[derive(Clone)]

pub struct RedisStore {
  connection: ConnectionManager
}

impl RedisStore {
  pub async fn connect(
    profile: &ConnectionProfile
  ) -> Result<Self, String> {
    let config =
      ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(
          profile.timeout()
        );

    let client =
      Client::open(redis_url(profile))
        .map_err(|e| {
          format!(
            "invalid redis address: {e}"
          )
        })?;

    let connection = client
      .get_connection_manager_with_config(
        config
      )
      .await
      .map_err(|e| {
        format!("redis connect error: {e}")
      })?;

    Ok(Self {
      connection
    })
  }

  fn conn(&self) -> ConnectionManager {
    self.connection.clone()
  }
}

fn redis_url(
  profile: &ConnectionProfile
) -> String {
  let password = profile.password();

  if password.is_empty() {
    format!(
      "redis://{}:{}/",
      profile.host, profile.port
    )
  } else {
    format!(
      "redis://:{}@{}:{}/",
      urlencoding::encode(password),
      profile.host,
      profile.port
    )
  }
}

fn classify(e: RedisError) -> StoreError {
  if e.is_io_error()
    || e.is_connection_refusal()
    || e.is_connection_dropped()
    || e.is_timeout()
  {
    StoreError::Unavailable(e.to_string())
  } else {
    StoreError::Failed(e.to_string())
  }
}

/// Values written by other clients need
/// not be UTF-8; they are shown lossily
/// instead of failing the whole read.
fn lossy(bytes: Vec<u8>) -> String {
  String::from_utf8_lossy(&bytes)
    .into_owned()
}

/// `INFO` replies are `key:value` lines
/// grouped under `# Section` headers.
pub(crate) fn parse_info(
  raw: &str
) -> BTreeMap<String, String> {
  raw
    .lines()
    .map(str::trim)
    .filter(|l| {
      !l.is_empty() && !l.starts_with('#')
    })
    .filter_map(|l| l.split_once(':'))
    .map(|(k, v)| {
      (k.to_string(), v.to_string())
    })
    .collect()
}

#[async_trait::async_trait]
impl CacheStore for RedisStore {
  async fn set(
    &self,
    key: &str,
    value: &str
  ) -> Result<(), StoreError> {
    let mut conn = self.conn();

    conn
      .set::<_, _, ()>(key, value)
      .await
      .map_err(classify)
  }

  async fn get(
    &self,
    key: &str
  ) -> Result<Option<String>, StoreError> {
    let mut conn = self.conn();

    let value = conn
      .get::<_, Option<Vec<u8>>>(key)
      .await
      .map_err(classify)?;

    Ok(value.map(lossy))
  }

  async fn rpush(
    &self,
    key: &str,
    value: &str
  ) -> Result<u64, StoreError> {
    let mut conn = self.conn();

    conn
      .rpush::<_, _, u64>(key, value)
      .await
      .map_err(classify)
  }

  async fn keys(
    &self
  ) -> Result<Vec<Vec<u8>>, StoreError> {
    let mut conn = self.conn();

    conn
      .keys::<_, Vec<Vec<u8>>>("*")
      .await
      .map_err(classify)
  }

  async fn value_of(
    &self,
    key: &[u8]
  ) -> Result<Option<CacheValue>, StoreError>
  {
    let mut conn = self.conn();

    let kind: String = redis::cmd("TYPE")
      .arg(key)
      .query_async(&mut conn)
      .await
      .map_err(classify)?;

    match kind.as_str() {
      | "none" => Ok(None),
      | "list" => {
        let items: Vec<Vec<u8>> = conn
          .lrange(key, 0, -1)
          .await
          .map_err(classify)?;

        Ok(Some(CacheValue::List(
          items
            .into_iter()
            .map(lossy)
            .collect()
        )))
      }
      | "string" => {
        let value: Option<Vec<u8>> = conn
          .get(key)
          .await
          .map_err(classify)?;

        Ok(
          value
            .map(lossy)
            .map(CacheValue::Text)
        )
      }
      | other => {
        Ok(Some(CacheValue::Text(
          format!("<{other}>")
        )))
      }
    }
  }

  async fn info(
    &self
  ) -> Result<BTreeMap<String, String>, StoreError>
  {
    let mut conn = self.conn();

    let raw: String = redis::cmd("INFO")
      .query_async(&mut conn)
      .await
      .map_err(classify)?;

    Ok(parse_info(&raw))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::model::Secret;

  #[test]
  fn info_skips_section_headers() {
    let raw = "# Server\r\nredis_version:7.2.4\r\n\
               uptime_in_seconds:42\r\n\r\n\
               # Keyspace\r\n\
               db0:keys=3,expires=0\r\n";
    let info = parse_info(raw);

    assert_eq!(info.len(), 3);
    assert_eq!(info["redis_version"], "7.2.4");
    assert_eq!(info["db0"], "keys=3,expires=0");
  }

  #[test]
  fn password_is_url_encoded() {
    let profile =
      ConnectionProfile::new("cache.local", 6380)
        .with_credentials(Some(Secret::new(
          "p@ss/word"
        )));
    assert_eq!(
      redis_url(&profile),
      "redis://:p%40ss%2Fword@cache.local:6380/"
    );

    let open =
      ConnectionProfile::new("localhost", 6379);
    assert_eq!(
      redis_url(&open),
      "redis://localhost:6379/"
    );
  }

  #[test]
  fn non_utf8_values_decode_lossily() {
    assert_eq!(
      lossy(b"skywalker".to_vec()),
      "skywalker"
    );
    assert_eq!(
      lossy(vec![b'l', 0xff, b'k']),
      "l\u{fffd}k"
    );
  }
}
