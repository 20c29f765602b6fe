//! Helpers to open the single relational
//! connection and prepare the demo table.

use std::str::FromStr;

use sqlx::postgres::PgConnectOptions;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{
  Connection,
  PgConnection,
  SqliteConnection
};

use crate::domain::model::{
  ConnectionProfile,
  SqlDialect
};

const PG_DEMO_TABLE: &str = "CREATE TABLE \
                             IF NOT EXISTS demo \
                             (id SERIAL PRIMARY KEY, \
                             username TEXT NOT NULL, \
                             email TEXT NOT NULL)";

const SQLITE_DEMO_TABLE: &str =
  "CREATE TABLE IF NOT EXISTS demo (id \
   INTEGER PRIMARY KEY AUTOINCREMENT, \
   username TEXT NOT NULL, email TEXT \
   NOT NULL)";

pub(crate) enum DbHandle {
  Postgres(PgConnection),
  Sqlite(SqliteConnection)
}

impl DbHandle {
  pub async fn close(self) {
    let res = match self {
      | DbHandle::Postgres(c) => c.close().await,
      | DbHandle::Sqlite(c) => c.close().await
    };

    if let Err(e) = res {
      tracing::debug!(error = %e, "relational close failed");
    }
  }
}

pub(crate) async fn open(
  profile: &ConnectionProfile
) -> Result<DbHandle, String> {
  match profile.dialect() {
    | SqlDialect::Postgres => {
      open_postgres(profile)
        .await
        .map(DbHandle::Postgres)
    }
    | SqlDialect::Sqlite => {
      open_sqlite(profile)
        .await
        .map(DbHandle::Sqlite)
    }
  }
}

pub(crate) async fn ensure_demo_table(
  handle: &mut DbHandle
) -> Result<(), String> {
  let res = match handle {
    | DbHandle::Postgres(conn) => {
      sqlx::query(PG_DEMO_TABLE)
        .execute(&mut *conn)
        .await
        .map(|_| ())
    }
    | DbHandle::Sqlite(conn) => {
      sqlx::query(SQLITE_DEMO_TABLE)
        .execute(&mut *conn)
        .await
        .map(|_| ())
    }
  };

  res.map_err(|e| {
    format!("demo table setup error: {e}")
  })
}

async fn open_postgres(
  profile: &ConnectionProfile
) -> Result<PgConnection, String> {
  let database = profile
    .extra("database")
    .unwrap_or("postgres");

  let opts =
    connect_options(profile, database);

  match PgConnection::connect_with(&opts)
    .await
  {
    | Ok(conn) => Ok(conn),
    | Err(e)
      if is_missing_database_error(&e) =>
    {
      ensure_database_exists(
        profile, database
      )
      .await?;

      PgConnection::connect_with(&opts)
        .await
        .map_err(|e| {
          format!(
            "postgres connect error \
             after create: {e}"
          )
        })
    }
    | Err(e) => {
      Err(format!(
        "postgres connect error: {e}"
      ))
    }
  }
}

/// An in-memory SQLite database lives and
/// dies with its connection.
pub(crate) fn is_ephemeral(
  profile: &ConnectionProfile
) -> bool {
  profile.dialect() == SqlDialect::Sqlite
    && sqlite_path(profile) == ":memory:"
}

fn sqlite_path(
  profile: &ConnectionProfile
) -> &str {
  profile.extra("path").unwrap_or(":memory:")
}

async fn open_sqlite(
  profile: &ConnectionProfile
) -> Result<SqliteConnection, String> {
  let path = sqlite_path(profile);

  let opts = if path == ":memory:" {
    SqliteConnectOptions::from_str(
      "sqlite::memory:"
    )
    .map_err(|e| {
      format!("sqlite options error: {e}")
    })?
  } else {
    SqliteConnectOptions::new()
      .filename(path)
      .create_if_missing(true)
  };

  SqliteConnection::connect_with(&opts)
    .await
    .map_err(|e| {
      format!("sqlite connect error: {e}")
    })
}

fn connect_options(
  profile: &ConnectionProfile,
  database: &str
) -> PgConnectOptions {
  let mut opts = PgConnectOptions::new()
    .host(&profile.host)
    .port(profile.port)
    .database(database);

  if let Some(user) = profile.extra("user")
  {
    opts = opts.username(user);
  }

  let password = profile.password();

  if !password.is_empty() {
    opts = opts.password(password);
  }

  opts
}

async fn ensure_database_exists(
  profile: &ConnectionProfile,
  database: &str
) -> Result<(), String> {
  validate_db_name(database)?;

  let admin_opts =
    connect_options(profile, "postgres");

  let mut admin =
    PgConnection::connect_with(
      &admin_opts
    )
    .await
    .map_err(|e| {
      format!(
        "postgres connect error \
         (admin db): {e}"
      )
    })?;

  let create_sql = format!(
    "CREATE DATABASE {}",
    quote_ident(database)
  );

  let res = sqlx::query(&create_sql)
    .execute(&mut admin)
    .await;

  let _ = admin.close().await;

  match res {
    | Ok(_) => {
      tracing::info!(
        database,
        "postgres database created"
      );
      Ok(())
    }
    | Err(e)
      if is_duplicate_db_error(&e) =>
    {
      Ok(())
    }
    | Err(e) => {
      Err(format!(
        "postgres create database \
         error: {e}"
      ))
    }
  }
}

fn quote_ident(name: &str) -> String {
  format!(
    "\"{}\"",
    name.replace('"', "\"\"")
  )
}

fn validate_db_name(
  name: &str
) -> Result<(), String> {
  if !name.is_empty()
    && name.chars().all(|c| {
      c.is_ascii_alphanumeric()
        || c == '_'
        || c == '-'
    })
  {
    Ok(())
  } else {
    Err(format!(
      "invalid postgres database name \
       '{name}': only alphanumeric, '_' \
       and '-' allowed"
    ))
  }
}

fn is_missing_database_error(
  e: &sqlx::Error
) -> bool {
  matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("3D000"))
}

fn is_duplicate_db_error(
  e: &sqlx::Error
) -> bool {
  matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("42P04"))
}
