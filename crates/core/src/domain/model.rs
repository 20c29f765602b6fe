//! Domain models: resolved connection
//! profiles, demo rows, and the value
//! shapes that flow through the gateways.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{
  Deserialize,
  Serialize
};

pub const DEFAULT_TIMEOUT_MS: u64 = 2_000;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash,
)]

pub enum ProfileKind {
  Http,
  Cache,
  Relational,
  Queue
}

impl fmt::Display for ProfileKind {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    let name = match self {
      | ProfileKind::Http => "http",
      | ProfileKind::Cache => "cache",
      | ProfileKind::Relational => {
        "relational"
      }
      | ProfileKind::Queue => "queue"
    };
    f.write_str(name)
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]

pub enum AppMode {
  #[default]
  Prod,
  Dev
}

impl FromStr for AppMode {
  type Err = String;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "prod" => Ok(AppMode::Prod),
      | "dev" => Ok(AppMode::Dev),
      | other => {
        Err(format!(
          "invalid mode '{other}', \
           expected 'dev' or 'prod'"
        ))
      }
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]

pub enum SqlDialect {
  Postgres,
  Sqlite
}

impl FromStr for SqlDialect {
  type Err = String;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "postgres" | "postgresql" => {
        Ok(SqlDialect::Postgres)
      }
      | "sqlite" => Ok(SqlDialect::Sqlite),
      | other => {
        Err(format!(
          "invalid database dialect \
           '{other}', expected 'sqlite' \
           or 'postgres'"
        ))
      }
    }
  }
}

/// A credential that never shows up in
/// `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]

pub struct Secret(String);

impl Secret {
  pub fn new(
    value: impl Into<String>
  ) -> Self {
    Self(value.into())
  }

  pub fn expose(&self) -> &str {
    &self.0
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl fmt::Debug for Secret {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str("Secret(***)")
  }
}

/// Connection parameters for one backend,
/// fixed once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]

pub struct ConnectionProfile {
  pub host:        String,
  pub port:        u16,
  pub credentials: Option<Secret>,
  pub extra:       BTreeMap<String, String>
}

impl ConnectionProfile {
  pub fn new(
    host: impl Into<String>,
    port: u16
  ) -> Self {
    Self {
      host: host.into(),
      port,
      credentials: None,
      extra: BTreeMap::new()
    }
  }

  pub fn with_credentials(
    mut self,
    secret: Option<Secret>
  ) -> Self {
    self.credentials = secret;
    self
  }

  pub fn with_extra(
    mut self,
    key: &str,
    value: impl Into<String>
  ) -> Self {
    self
      .extra
      .insert(key.to_string(), value.into());
    self
  }

  pub fn extra(
    &self,
    key: &str
  ) -> Option<&str> {
    self.extra.get(key).map(String::as_str)
  }

  pub fn password(&self) -> &str {
    self
      .credentials
      .as_ref()
      .map(Secret::expose)
      .unwrap_or("")
  }

  pub fn debug(&self) -> bool {
    matches!(
      self.extra("debug"),
      Some("true")
    )
  }

  pub fn dialect(&self) -> SqlDialect {
    self
      .extra("dialect")
      .and_then(|d| d.parse().ok())
      .unwrap_or(SqlDialect::Postgres)
  }

  pub fn timeout(&self) -> Duration {
    let ms = self
      .extra("timeout_ms")
      .and_then(|v| v.parse::<u64>().ok())
      .filter(|ms| *ms > 0)
      .unwrap_or(DEFAULT_TIMEOUT_MS);

    Duration::from_millis(ms)
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.host, self.port)
  }
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]

pub struct DemoRecord {
  pub id:       i64,
  pub username: String,
  pub email:    String
}

/// One cell of a statement binding or
/// result row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]

pub enum SqlValue {
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  Text(String)
}

impl SqlValue {
  pub fn as_i64(&self) -> Option<i64> {
    match self {
      | SqlValue::Int(v) => Some(*v),
      | _ => None
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      | SqlValue::Text(v) => Some(v),
      | _ => None
    }
  }
}

impl From<&str> for SqlValue {
  fn from(value: &str) -> Self {
    SqlValue::Text(value.to_string())
  }
}

impl From<String> for SqlValue {
  fn from(value: String) -> Self {
    SqlValue::Text(value)
  }
}

impl From<i64> for SqlValue {
  fn from(value: i64) -> Self {
    SqlValue::Int(value)
  }
}

impl From<bool> for SqlValue {
  fn from(value: bool) -> Self {
    SqlValue::Bool(value)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]

pub enum CacheValue {
  Text(String),
  List(Vec<String>)
}

impl CacheValue {
  /// Lists are flattened by plain
  /// concatenation.
  pub fn display(&self) -> String {
    match self {
      | CacheValue::Text(v) => v.clone(),
      | CacheValue::List(items) => {
        items.concat()
      }
    }
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]

pub struct CacheEntry {
  pub key:   String,
  pub value: String
}
