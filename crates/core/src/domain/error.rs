//! Gateway error taxonomy and the sticky
//! per-gateway state.

use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]

pub enum GatewayError {
  /// Backend unreachable, at connect or
  /// at call time (timeouts included).
  #[error("connectivity error: {0}")]
  Connectivity(String),
  #[error("validation error: {0}")]
  Validation(String),
  /// The backend was reachable but the
  /// call itself failed.
  #[error("operation error: {0}")]
  Operation(String)
}

impl GatewayError {
  pub fn message(&self) -> &str {
    match self {
      | GatewayError::Connectivity(m)
      | GatewayError::Validation(m)
      | GatewayError::Operation(m) => m
    }
  }

  pub fn is_connectivity(&self) -> bool {
    matches!(
      self,
      GatewayError::Connectivity(_)
    )
  }
}

#[derive(Debug, Default)]

struct StateInner {
  connected:  bool,
  last_error: Option<String>
}

/// Connectivity flag plus a sticky error
/// message. The message stays until
/// `reset_error`, even across later
/// successful calls.
#[derive(Debug, Default)]

pub struct GatewayState {
  inner: Mutex<StateInner>
}

impl GatewayState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_connected(
    &self,
    connected: bool
  ) {
    if let Ok(mut inner) =
      self.inner.lock()
    {
      inner.connected = connected;
    }
  }

  pub fn is_connected(&self) -> bool {
    self
      .inner
      .lock()
      .map(|i| i.connected)
      .unwrap_or(false)
  }

  pub fn record_error(
    &self,
    message: impl Into<String>
  ) {
    if let Ok(mut inner) =
      self.inner.lock()
    {
      inner.last_error =
        Some(message.into());
    }
  }

  /// Marks the gateway disconnected and
  /// records the reason in one step.
  pub fn record_disconnect(
    &self,
    message: impl Into<String>
  ) {
    if let Ok(mut inner) =
      self.inner.lock()
    {
      inner.connected = false;
      inner.last_error =
        Some(message.into());
    }
  }

  pub fn check_error(
    &self
  ) -> Option<String> {
    self
      .inner
      .lock()
      .ok()
      .and_then(|i| i.last_error.clone())
  }

  pub fn reset_error(&self) {
    if let Ok(mut inner) =
      self.inner.lock()
    {
      inner.last_error = None;
    }
  }

  pub fn snapshot(
    &self
  ) -> (bool, Option<String>) {
    self
      .inner
      .lock()
      .map(|i| {
        (
          i.connected,
          i.last_error.clone()
        )
      })
      .unwrap_or((false, None))
  }
}
