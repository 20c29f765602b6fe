use serde::Deserialize;

/// Top-level shape of `config.json`.
/// Every key is optional; absent keys
/// fall through to the default tier.
#[derive(
  Debug, Clone, Default, Deserialize,
)]
pub(crate) struct RawConfigFile {
  pub port:       Option<RawPort>,
  pub debug:      Option<bool>,
  pub timeout_ms: Option<u64>,
  pub redis:      Option<RawRedis>,
  pub postgres:   Option<RawPostgres>,
  pub rabbitmq:   Option<RawRabbitMq>,
  pub database:   Option<RawDatabase>,
  pub sqlite:     Option<RawSqlite>,
  pub logging:    Option<RawLogging>,
  pub auth:       Option<RawAuth>
}

/// Ports show up as numbers or numeric
/// strings depending on who wrote the
/// file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawPort {
  Number(u64),
  Text(String)
}

impl RawPort {
  pub fn get(&self) -> Option<u16> {
    match self {
      | RawPort::Number(n) => {
        u16::try_from(*n).ok()
      }
      | RawPort::Text(s) => {
        s.trim().parse().ok()
      }
    }
  }
}

#[derive(
  Debug, Clone, Default, Deserialize,
)]
pub(crate) struct RawRedis {
  pub hostname: Option<String>,
  pub port:     Option<RawPort>,
  pub password: Option<String>
}

#[derive(
  Debug, Clone, Default, Deserialize,
)]
pub(crate) struct RawPostgres {
  pub database: Option<String>,
  pub user:     Option<String>,
  pub password: Option<String>,
  pub host:     Option<String>,
  pub port:     Option<RawPort>
}

#[derive(
  Debug, Clone, Default, Deserialize,
)]
pub(crate) struct RawRabbitMq {
  pub hostname:           Option<String>,
  pub port:               Option<RawPort>,
  pub message_queue_name: Option<String>
}

#[derive(
  Debug, Clone, Default, Deserialize,
)]
pub(crate) struct RawDatabase {
  pub dialect: Option<String>
}

#[derive(
  Debug, Clone, Default, Deserialize,
)]
pub(crate) struct RawSqlite {
  pub path: Option<String>
}

#[derive(
  Debug, Clone, Default, Deserialize,
)]
pub(crate) struct RawLogging {
  pub level: Option<String>
}

#[derive(
  Debug, Clone, Default, Deserialize,
)]
pub(crate) struct RawAuth {
  pub username:      Option<String>,
  pub password_hash: Option<String>
}
