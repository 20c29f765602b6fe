//! Connection profile resolution.
//!
//! Each value is taken from the first tier
//! that provides it:
//!
//! 1. environment overrides
//! 2. platform binding (`VCAP_SERVICES`)
//! 3. the local JSON config file
//! 4. built-in defaults
//!
//! Broken input in any tier is logged and
//! skipped; resolution itself never fails.

mod binding;
mod defaults;
mod env;
mod raw;
mod schema;

use std::path::{
  Path,
  PathBuf
};
use std::sync::Mutex;

use thiserror::Error;
use tracing::{
  debug,
  warn
};

pub use binding::PLATFORM_BINDING_VAR;
use binding::{
  PlatformBinding,
  nested,
  port_field,
  str_field
};
use defaults::*;
pub use env::EnvSnapshot;
use raw::RawConfigFile;
use schema::validate_config;

use crate::domain::model::{
  AppMode,
  ConnectionProfile,
  DEFAULT_TIMEOUT_MS,
  ProfileKind,
  Secret,
  SqlDialect
};

pub const DEFAULT_CONFIG_PATH: &str =
  "config/config.json";

#[derive(Debug, Error)]
pub enum ConfigParseError {
  #[error("config file not found at {0}")]
  Missing(String),
  #[error("config IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("config parse error: {0}")]
  Parse(#[from] serde_json::Error),
  #[error("config invalid: {0}")]
  Invalid(String)
}

/// Basic-auth credential pair. The hash is
/// an argon2 PHC string when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
  pub username:      String,
  pub password_hash: Option<String>
}

pub struct ConfigResolver {
  path:      PathBuf,
  last_good: Mutex<Option<RawConfigFile>>
}

impl ConfigResolver {
  pub fn new(
    path: impl Into<PathBuf>
  ) -> Self {
    Self {
      path:      path.into(),
      last_good: Mutex::new(None)
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn resolve(
    &self,
    kind: ProfileKind,
    mode: AppMode,
    env: &EnvSnapshot
  ) -> ConnectionProfile {
    let file = self.load_file();

    let binding =
      PlatformBinding::from_env(env);

    let mut profile = resolve_profile(
      kind,
      mode,
      file.as_ref(),
      binding.as_ref(),
      env
    );

    if kind == ProfileKind::Relational
      && let Some(path) =
        profile.extra.get_mut("path")
    {
      *path = anchor_sqlite_path(
        &self.path,
        path
      );
    }

    debug!(
      %kind,
      host = %profile.host,
      port = profile.port,
      "profile resolved"
    );

    profile
  }

  pub fn auth(
    &self,
    env: &EnvSnapshot
  ) -> AuthSettings {
    let file = self.load_file();

    let raw = file
      .as_ref()
      .and_then(|f| f.auth.as_ref());

    let username = env
      .string("AUTH_USERNAME")
      .or_else(|| {
        raw.and_then(|a| {
          non_empty(a.username.as_deref())
        })
      })
      .unwrap_or_else(|| {
        DEFAULT_AUTH_USERNAME.to_string()
      });

    let password_hash = env
      .string("AUTH_PASSWORD_HASH")
      .or_else(|| {
        raw.and_then(|a| {
          non_empty(
            a.password_hash.as_deref()
          )
        })
      });

    AuthSettings {
      username,
      password_hash
    }
  }

  pub fn log_level(&self) -> String {
    self
      .load_file()
      .and_then(|f| f.logging)
      .and_then(|l| non_empty(l.level.as_deref()))
      .unwrap_or_else(|| {
        DEFAULT_LOG_LEVEL.to_string()
      })
  }

  /// Reads the file fresh, falling back to
  /// the last snapshot that parsed cleanly.
  fn load_file(
    &self
  ) -> Option<RawConfigFile> {
    match read_config_file(&self.path) {
      | Ok(parsed) => {
        if let Ok(mut guard) =
          self.last_good.lock()
        {
          *guard = Some(parsed.clone());
        }
        Some(parsed)
      }
      | Err(e) => {
        let fallback = self
          .last_good
          .lock()
          .ok()
          .and_then(|g| g.clone());

        match &e {
          | ConfigParseError::Missing(_)
            if fallback.is_none() =>
          {
            debug!(error = %e, "no config file, using defaults");
          }
          | _ => {
            warn!(
              error = %e,
              using_last_good = fallback.is_some(),
              "config file unusable"
            );
          }
        }

        fallback
      }
    }
  }
}

fn read_config_file(
  path: &Path
) -> Result<RawConfigFile, ConfigParseError>
{
  if !path.is_file() {
    return Err(ConfigParseError::Missing(
      path.display().to_string()
    ));
  }

  let content =
    std::fs::read_to_string(path)?;

  let value: serde_json::Value =
    serde_json::from_str(&content)?;

  validate_config(
    &value,
    &path.display().to_string()
  )
  .map_err(ConfigParseError::Invalid)?;

  Ok(serde_json::from_value(value)?)
}

pub(crate) fn resolve_profile(
  kind: ProfileKind,
  mode: AppMode,
  file: Option<&RawConfigFile>,
  binding: Option<&PlatformBinding>,
  env: &EnvSnapshot
) -> ConnectionProfile {
  match kind {
    | ProfileKind::Http => {
      resolve_http(mode, file, env)
    }
    | ProfileKind::Cache => {
      resolve_cache(file, binding, env)
    }
    | ProfileKind::Relational => {
      resolve_relational(
        file, binding, env
      )
    }
    | ProfileKind::Queue => {
      resolve_queue(file, binding, env)
    }
  }
}

fn resolve_http(
  mode: AppMode,
  file: Option<&RawConfigFile>,
  env: &EnvSnapshot
) -> ConnectionProfile {
  let file_port = file
    .and_then(|f| f.port.as_ref())
    .and_then(|p| p.get());

  // Dev runs off the file alone; host and
  // port overrides are a deployment concern.
  let (host, port) = match mode {
    | AppMode::Prod => {
      (
        env
          .string("HOST_NAME")
          .unwrap_or_else(|| {
            DEFAULT_HTTP_HOST.to_string()
          }),
        env
          .port("PORT")
          .or(file_port)
          .unwrap_or(DEFAULT_HTTP_PORT)
      )
    }
    | AppMode::Dev => {
      (
        DEFAULT_HTTP_HOST.to_string(),
        file_port
          .unwrap_or(DEFAULT_HTTP_PORT)
      )
    }
  };

  let debug = env
    .flag("DEBUG")
    .or(file.and_then(|f| f.debug))
    .unwrap_or(mode == AppMode::Dev);

  ConnectionProfile::new(host, port)
    .with_extra(
      "debug",
      debug.to_string()
    )
}

fn resolve_cache(
  file: Option<&RawConfigFile>,
  binding: Option<&PlatformBinding>,
  env: &EnvSnapshot
) -> ConnectionProfile {
  let creds = binding.and_then(|b| {
    b.credentials(REDIS_SERVICE)
  });

  let raw = file
    .and_then(|f| f.redis.as_ref());

  let host = env
    .string("REDIS_HOST")
    .or_else(|| {
      creds.and_then(|c| {
        str_field(c, &["host", "hostname"])
      })
    })
    .or_else(|| {
      raw.and_then(|r| {
        non_empty(r.hostname.as_deref())
      })
    })
    .unwrap_or_else(|| {
      DEFAULT_REDIS_HOST.to_string()
    });

  let port = env
    .port("REDIS_PORT")
    .or_else(|| {
      creds.and_then(|c| {
        port_field(c, "port")
      })
    })
    .or_else(|| {
      raw.and_then(|r| {
        r.port.as_ref().and_then(|p| p.get())
      })
    })
    .unwrap_or(DEFAULT_REDIS_PORT);

  // An empty password at a higher tier
  // (`REDIS_PASSWORD=` included) means no
  // auth; only absence falls through.
  let password = env
    .raw("REDIS_PASSWORD")
    .map(str::to_string)
    .or_else(|| {
      creds.and_then(|c| {
        c.get("password")
          .and_then(|v| v.as_str())
          .map(str::to_string)
      })
    })
    .or_else(|| {
      raw.and_then(|r| r.password.clone())
    })
    .unwrap_or_default();

  ConnectionProfile::new(host, port)
    .with_credentials(secret(password))
    .with_extra(
      "timeout_ms",
      timeout_ms(file, env).to_string()
    )
}

fn resolve_relational(
  file: Option<&RawConfigFile>,
  binding: Option<&PlatformBinding>,
  env: &EnvSnapshot
) -> ConnectionProfile {
  let creds = binding.and_then(|b| {
    b.credentials(POSTGRES_SERVICE)
  });

  let raw = file
    .and_then(|f| f.postgres.as_ref());

  let pick = |env_key: &str,
              cred_keys: &[&str],
              file_value: Option<&str>,
              default: &str|
   -> String {
    env
      .string(env_key)
      .or_else(|| {
        creds.and_then(|c| {
          str_field(c, cred_keys)
        })
      })
      .or_else(|| non_empty(file_value))
      .unwrap_or_else(|| {
        default.to_string()
      })
  };

  let host = pick(
    "POSTGRES_HOST",
    &["host", "hostname"],
    raw.and_then(|r| r.host.as_deref()),
    DEFAULT_PG_HOST
  );

  let database = pick(
    "POSTGRES_DATABASE",
    &["database", "name"],
    raw.and_then(|r| r.database.as_deref()),
    DEFAULT_PG_DATABASE
  );

  let user = pick(
    "POSTGRES_USER",
    &["username", "user"],
    raw.and_then(|r| r.user.as_deref()),
    DEFAULT_PG_USER
  );

  let password = pick(
    "POSTGRES_PASSWORD",
    &["password"],
    raw.and_then(|r| {
      r.password.as_deref()
    }),
    DEFAULT_PG_PASSWORD
  );

  let port = env
    .port("POSTGRES_PORT")
    .or_else(|| {
      creds.and_then(|c| {
        port_field(c, "port")
      })
    })
    .or_else(|| {
      raw.and_then(|r| {
        r.port.as_ref().and_then(|p| p.get())
      })
    })
    .unwrap_or(DEFAULT_PG_PORT);

  let dialect = env
    .get("DATABASE_DIALECT")
    .or_else(|| {
      file
        .and_then(|f| f.database.as_ref())
        .and_then(|d| d.dialect.as_deref())
    })
    .and_then(|d| match d.parse::<SqlDialect>() {
      | Ok(dialect) => Some(dialect),
      | Err(e) => {
        warn!(error = %e, "ignoring database dialect");
        None
      }
    })
    .unwrap_or(SqlDialect::Postgres);

  let sqlite_path = env
    .string("SQLITE_PATH")
    .or_else(|| {
      file
        .and_then(|f| f.sqlite.as_ref())
        .and_then(|s| {
          non_empty(s.path.as_deref())
        })
    })
    .unwrap_or_else(|| {
      DEFAULT_SQLITE_PATH.to_string()
    });

  ConnectionProfile::new(host, port)
    .with_credentials(secret(password))
    .with_extra("database", database)
    .with_extra("user", user)
    .with_extra(
      "dialect",
      match dialect {
        | SqlDialect::Postgres => "postgres",
        | SqlDialect::Sqlite => "sqlite"
      }
    )
    .with_extra("path", sqlite_path)
    .with_extra(
      "timeout_ms",
      timeout_ms(file, env).to_string()
    )
}

fn resolve_queue(
  file: Option<&RawConfigFile>,
  binding: Option<&PlatformBinding>,
  env: &EnvSnapshot
) -> ConnectionProfile {
  let creds = binding.and_then(|b| {
    b.credentials(RABBIT_SERVICE)
  });

  // Bindings nest the broker under `amqp`
  // on some plans and flatten it on others.
  let amqp = creds.map(|c| {
    nested(c, "amqp").unwrap_or(c)
  });

  let raw = file
    .and_then(|f| f.rabbitmq.as_ref());

  let host = env
    .string("RABBITMQ_HOST")
    .or_else(|| {
      amqp.and_then(|c| {
        str_field(c, &["host", "hostname"])
      })
    })
    .or_else(|| {
      raw.and_then(|r| {
        non_empty(r.hostname.as_deref())
      })
    })
    .unwrap_or_else(|| {
      DEFAULT_RABBIT_HOST.to_string()
    });

  let port = amqp
    .and_then(|c| port_field(c, "port"))
    .or_else(|| {
      raw.and_then(|r| {
        r.port.as_ref().and_then(|p| p.get())
      })
    })
    .unwrap_or(DEFAULT_RABBIT_PORT);

  let queue = env
    .string("RABBITMQ_QUEUE")
    .or_else(|| {
      raw.and_then(|r| {
        non_empty(
          r.message_queue_name.as_deref()
        )
      })
    })
    .unwrap_or_else(|| {
      DEFAULT_RABBIT_QUEUE.to_string()
    });

  ConnectionProfile::new(host, port)
    .with_extra("queue", queue)
}

fn timeout_ms(
  file: Option<&RawConfigFile>,
  env: &EnvSnapshot
) -> u64 {
  env
    .number("BACKEND_TIMEOUT_MS")
    .or(file.and_then(|f| f.timeout_ms))
    .filter(|ms| *ms > 0)
    .unwrap_or(DEFAULT_TIMEOUT_MS)
}

fn secret(value: String) -> Option<Secret> {
  if value.is_empty() {
    None
  } else {
    Some(Secret::new(value))
  }
}

fn non_empty(
  value: Option<&str>
) -> Option<String> {
  value
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(str::to_string)
}

/// Relative SQLite paths live next to the
/// config file; `:memory:` stays as is.
fn anchor_sqlite_path(
  config_path: &Path,
  raw: &str
) -> String {
  let p = Path::new(raw);

  if raw == ":memory:" || p.is_absolute() {
    return raw.to_string();
  }

  config_path
    .parent()
    .filter(|d| !d.as_os_str().is_empty())
    .map(|d| d.join(p).display().to_string())
    .unwrap_or_else(|| raw.to_string())
}
