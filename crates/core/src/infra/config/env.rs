use std::collections::HashMap;

use tracing::warn;

/// Frozen copy of the process environment.
/// Resolution reads only from a snapshot so
/// it stays pure and testable.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
  vars: HashMap<String, String>
}

impl EnvSnapshot {
  pub fn from_process() -> Self {
    Self {
      vars: std::env::vars().collect()
    }
  }

  pub fn from_pairs<I, K, V>(
    pairs: I
  ) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>
  {
    Self {
      vars: pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
    }
  }

  /// Blank values count as unset.
  pub fn get(
    &self,
    key: &str
  ) -> Option<&str> {
    self
      .vars
      .get(key)
      .map(|v| v.trim())
      .filter(|v| !v.is_empty())
  }

  /// Like [`EnvSnapshot::get`] but keeps a
  /// blank value, for keys where "set to
  /// nothing" differs from unset.
  pub fn raw(
    &self,
    key: &str
  ) -> Option<&str> {
    self.vars.get(key).map(|v| v.trim())
  }

  pub(crate) fn string(
    &self,
    key: &str
  ) -> Option<String> {
    self.get(key).map(str::to_string)
  }

  pub(crate) fn port(
    &self,
    key: &str
  ) -> Option<u16> {
    let raw = self.get(key)?;

    match raw.parse::<u16>() {
      | Ok(p) => Some(p),
      | Err(e) => {
        warn!(
          key,
          value = raw,
          error = %e,
          "ignoring invalid port override"
        );
        None
      }
    }
  }

  pub(crate) fn number(
    &self,
    key: &str
  ) -> Option<u64> {
    let raw = self.get(key)?;

    match raw.parse::<u64>() {
      | Ok(n) => Some(n),
      | Err(e) => {
        warn!(
          key,
          value = raw,
          error = %e,
          "ignoring invalid numeric override"
        );
        None
      }
    }
  }

  pub(crate) fn flag(
    &self,
    key: &str
  ) -> Option<bool> {
    let raw = self.get(key)?;

    match raw
      .to_ascii_lowercase()
      .as_str()
    {
      | "1" | "true" | "yes" | "on" => {
        Some(true)
      }
      | "0" | "false" | "no" | "off" => {
        Some(false)
      }
      | _ => {
        warn!(
          key,
          value = raw,
          "ignoring invalid boolean override"
        );
        None
      }
    }
  }
}
