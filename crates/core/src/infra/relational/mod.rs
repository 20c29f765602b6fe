//! # Relational gateway
//!
//! Exactly one connection (Postgres, or
//! SQLite for local runs) guarded by an
//! async mutex. Statements and
//! re-initialization are serialized on it.
//!
//! A failed write triggers one inline
//! re-initialization of the connection.
//! The statement itself is not replayed.
//! In-memory SQLite is the exception: a
//! new connection would be a new empty
//! database, so the handle is kept.

mod connection;
mod values;

use std::time::Duration;

use connection::{
  DbHandle,
  ensure_demo_table,
  is_ephemeral,
  open
};
use tokio::sync::Mutex;
use tracing::{
  info,
  warn
};
use values::{
  bind_pg,
  bind_sqlite,
  decode_pg_row,
  decode_sqlite_row
};

use crate::domain::error::{
  GatewayError,
  GatewayState
};
use crate::domain::model::{
  ConnectionProfile,
  DemoRecord,
  SqlValue
};

pub const INSERT_DEMO: &str =
  "INSERT INTO demo (username, email) \
   VALUES ($1, $2)";
pub const SELECT_DEMO: &str =
  "SELECT id, username, email FROM demo \
   ORDER BY id";

const UNKNOWN_STATUS: &str =
  "Unable to identify PostgreSQL connection \
   status.";

pub struct RelationalGateway {
  profile: ConnectionProfile,
  state:   GatewayState,
  handle:  Mutex<Option<DbHandle>>,
  timeout: Duration
}

impl RelationalGateway {
  /// Opens the connection and makes sure
  /// the demo table exists. Failures are
  /// recorded, never returned.
  pub async fn connect(
    profile: ConnectionProfile
  ) -> Self {
    let timeout = profile.timeout();
    let gateway = Self {
      profile,
      state: GatewayState::new(),
      handle: Mutex::new(None),
      timeout
    };
    {
      let mut slot =
        gateway.handle.lock().await;
      gateway.initialize(&mut slot).await;
    }
    gateway
  }

  /// Replaces whatever is in `slot` with a
  /// fresh connection.
  async fn initialize(
    &self,
    slot: &mut Option<DbHandle>
  ) -> bool {
    if let Some(old) = slot.take() {
      old.close().await;
    }

    let opened = match tokio::time::timeout(
      self.timeout,
      open(&self.profile)
    )
    .await
    {
      | Ok(res) => res,
      | Err(_) => {
        Err(format!(
          "connect timed out after {} ms",
          self.timeout.as_millis()
        ))
      }
    };

    let mut handle = match opened {
      | Ok(handle) => handle,
      | Err(e) => {
        warn!(
          host = %self.profile.host,
          port = self.profile.port,
          error = %e,
          "relational connect failed"
        );
        self.state.record_disconnect(format!(
          "Failed to create a connection \
           with PostgreSQL. {e}"
        ));
        return false;
      }
    };

    let prepared = match tokio::time::timeout(
      self.timeout,
      ensure_demo_table(&mut handle)
    )
    .await
    {
      | Ok(res) => res,
      | Err(_) => {
        Err(format!(
          "demo table setup timed out after \
           {} ms",
          self.timeout.as_millis()
        ))
      }
    };

    if let Err(e) = prepared {
      warn!(
        error = %e,
        "demo table setup failed"
      );
      handle.close().await;
      self.state.record_disconnect(format!(
        "Failed to set up demo database \
         table. {e}"
      ));
      return false;
    }

    info!(
      host = %self.profile.host,
      port = self.profile.port,
      dialect = ?self.profile.dialect(),
      "relational connected"
    );
    *slot = Some(handle);
    self.state.set_connected(true);
    true
  }

  /// Runs a write statement. `Connectivity`
  /// means there was never a usable
  /// connection; `Operation` means the
  /// statement failed (after one reconnect
  /// attempt).
  pub async fn execute(
    &self,
    statement: &str,
    bindings: &[SqlValue]
  ) -> Result<u64, GatewayError> {
    let mut slot = self.handle.lock().await;
    let Some(handle) = slot.as_mut() else {
      return Err(GatewayError::Connectivity(
        "PostgreSQL connection not \
         established"
          .to_string()
      ));
    };

    let outcome = tokio::time::timeout(
      self.timeout,
      run_execute(handle, statement, bindings)
    )
    .await;
    let message = match outcome {
      | Ok(Ok(rows)) => return Ok(rows),
      | Ok(Err(e)) => {
        format!(
          "Failed to execute the query. {e}"
        )
      }
      | Err(_) => {
        format!(
          "Failed to execute the query. \
           timed out after {} ms",
          self.timeout.as_millis()
        )
      }
    };

    if is_ephemeral(&self.profile) {
      warn!(
        error = %message,
        "relational write failed"
      );
    } else {
      warn!(
        error = %message,
        "relational write failed, \
         reinitializing"
      );
      self.initialize(&mut slot).await;
    }
    self.state.record_error(message.clone());
    Err(GatewayError::Operation(message))
  }

  /// Runs a read statement and returns the
  /// rows in result order.
  pub async fn query(
    &self,
    statement: &str
  ) -> Result<Vec<Vec<SqlValue>>, GatewayError>
  {
    let mut slot = self.handle.lock().await;
    let Some(handle) = slot.as_mut() else {
      return Err(GatewayError::Connectivity(
        "Failed to obtain data from \
         PostgreSQL: not connected"
          .to_string()
      ));
    };

    let outcome = tokio::time::timeout(
      self.timeout,
      run_query(handle, statement)
    )
    .await;
    let message = match outcome {
      | Ok(Ok(rows)) => return Ok(rows),
      | Ok(Err(e)) => {
        format!(
          "Failed to read from PostgreSQL. \
           {e}"
        )
      }
      | Err(_) => {
        format!(
          "Failed to read from PostgreSQL. \
           timed out after {} ms",
          self.timeout.as_millis()
        )
      }
    };

    warn!(
      error = %message,
      "relational read failed"
    );
    self.state.record_error(message.clone());
    Err(GatewayError::Operation(message))
  }

  pub async fn insert_demo(
    &self,
    username: &str,
    email: &str
  ) -> Result<u64, GatewayError> {
    self
      .execute(INSERT_DEMO, &[
        username.into(),
        email.into()
      ])
      .await
  }

  pub async fn demo_records(
    &self
  ) -> Result<Vec<DemoRecord>, GatewayError> {
    self
      .query(SELECT_DEMO)
      .await?
      .into_iter()
      .map(|row| {
        match row.as_slice() {
          | [id, username, email] => {
            Ok(DemoRecord {
              id:       id
                .as_i64()
                .unwrap_or_default(),
              username: username
                .as_str()
                .unwrap_or_default()
                .to_string(),
              email:    email
                .as_str()
                .unwrap_or_default()
                .to_string()
            })
          }
          | other => {
            Err(GatewayError::Operation(
              format!(
                "unexpected demo row width {}",
                other.len()
              )
            ))
          }
        }
      })
      .collect()
  }

  /// `(connected, message)`; the message is
  /// empty while connected.
  pub fn check_status(&self) -> (bool, String) {
    match self.state.snapshot() {
      | (true, _) => (true, String::new()),
      | (false, Some(error)) => (false, error),
      | (false, None) => {
        (false, UNKNOWN_STATUS.to_string())
      }
    }
  }

  pub fn is_connected(&self) -> bool {
    self.state.is_connected()
  }

  pub async fn close(&self) {
    let mut slot = self.handle.lock().await;
    if let Some(handle) = slot.take() {
      handle.close().await;
    }
    self.state.set_connected(false);
  }
}

async fn run_execute(
  handle: &mut DbHandle,
  statement: &str,
  bindings: &[SqlValue]
) -> Result<u64, sqlx::Error> {
  match handle {
    | DbHandle::Postgres(conn) => {
      bind_pg(sqlx::query(statement), bindings)
        .execute(&mut *conn)
        .await
        .map(|r| r.rows_affected())
    }
    | DbHandle::Sqlite(conn) => {
      bind_sqlite(
        sqlx::query(statement),
        bindings
      )
      .execute(&mut *conn)
      .await
      .map(|r| r.rows_affected())
    }
  }
}

async fn run_query(
  handle: &mut DbHandle,
  statement: &str
) -> Result<Vec<Vec<SqlValue>>, sqlx::Error> {
  match handle {
    | DbHandle::Postgres(conn) => {
      let rows = sqlx::query(statement)
        .fetch_all(&mut *conn)
        .await?;
      Ok(rows.iter().map(decode_pg_row).collect())
    }
    | DbHandle::Sqlite(conn) => {
      let rows = sqlx::query(statement)
        .fetch_all(&mut *conn)
        .await?;
      Ok(
        rows
          .iter()
          .map(decode_sqlite_row)
          .collect()
      )
    }
  }
}
