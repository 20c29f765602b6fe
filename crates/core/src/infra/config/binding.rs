//! Cloud platform service bindings
//! (`VCAP_SERVICES`): a JSON object keyed
//! by service label, each value an array
//! of bindings carrying `credentials`.

use serde_json::{
  Map,
  Value
};
use tracing::warn;

use super::env::EnvSnapshot;

pub const PLATFORM_BINDING_VAR: &str =
  "VCAP_SERVICES";

#[derive(Debug, Clone)]
pub(crate) struct PlatformBinding {
  services: Map<String, Value>
}

pub(crate) type Credentials =
  Map<String, Value>;

impl PlatformBinding {
  /// Malformed descriptors are logged and
  /// treated as absent.
  pub fn from_env(
    env: &EnvSnapshot
  ) -> Option<Self> {
    let raw =
      env.get(PLATFORM_BINDING_VAR)?;

    Self::parse(raw)
  }

  pub fn parse(raw: &str) -> Option<Self> {
    match serde_json::from_str::<Value>(raw)
    {
      | Ok(Value::Object(services)) => {
        Some(Self {
          services
        })
      }
      | Ok(_) => {
        warn!(
          var = PLATFORM_BINDING_VAR,
          "platform binding is not a JSON object, ignoring"
        );
        None
      }
      | Err(e) => {
        warn!(
          var = PLATFORM_BINDING_VAR,
          error = %e,
          "malformed platform binding, ignoring"
        );
        None
      }
    }
  }

  /// Credentials of the first binding for
  /// `label`.
  pub fn credentials(
    &self,
    label: &str
  ) -> Option<&Credentials> {
    self
      .services
      .get(label)?
      .as_array()?
      .first()?
      .get("credentials")?
      .as_object()
  }
}

/// First non-empty string among `keys`.
pub(crate) fn str_field(
  creds: &Credentials,
  keys: &[&str]
) -> Option<String> {
  keys.iter().find_map(|k| {
    creds
      .get(*k)
      .and_then(Value::as_str)
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(str::to_string)
  })
}

/// Ports may be encoded as numbers or as
/// numeric strings.
pub(crate) fn port_field(
  creds: &Credentials,
  key: &str
) -> Option<u16> {
  match creds.get(key)? {
    | Value::Number(n) => {
      n.as_u64()
        .and_then(|p| u16::try_from(p).ok())
    }
    | Value::String(s) => {
      s.trim().parse().ok()
    }
    | _ => None
  }
}

pub(crate) fn nested<'a>(
  creds: &'a Credentials,
  key: &str
) -> Option<&'a Credentials> {
  creds.get(key)?.as_object()
}
