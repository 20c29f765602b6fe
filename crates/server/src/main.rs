use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use padawan_core::domain::model::{
  AppMode,
  ProfileKind
};
use padawan_core::infra::cache::CacheGateway;
use padawan_core::infra::config::{
  ConfigResolver,
  DEFAULT_CONFIG_PATH,
  EnvSnapshot
};
use padawan_core::infra::relational::RelationalGateway;
use padawan_server::auth::{
  Credentials,
  hash_password
};
use padawan_server::errors::BootError;
use padawan_server::{
  AppState,
  logging,
  router
};
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{
  SignalKind,
  signal
};
use tracing::{
  info,
  warn
};

const DEFAULT_PASSWORD: &str = "password";

#[derive(Parser)]
#[command(
  author,
  version,
  about = "padawan demo server"
)]

struct Args {
  /// Path to the JSON config file.
  #[arg(
    long,
    env = "PADAWAN_CONFIG",
    default_value = DEFAULT_CONFIG_PATH
  )]
  config: PathBuf,
  /// `prod` or `dev`.
  #[arg(
    long,
    env = "APP_MODE",
    default_value = "prod"
  )]
  mode:   AppMode
}

#[tokio::main]

async fn main() -> Result<(), BootError> {
  let args = Args::parse();
  let env = EnvSnapshot::from_process();
  let resolver = ConfigResolver::new(&args.config);

  let http = resolver.resolve(
    ProfileKind::Http,
    args.mode,
    &env
  );

  logging::init_tracing(
    &resolver.log_level(),
    http.debug()
  )?;

  info!(
    config = %resolver.path().display(),
    mode = ?args.mode,
    "padawan starting"
  );

  let cache_profile = resolver.resolve(
    ProfileKind::Cache,
    args.mode,
    &env
  );
  let relational_profile = resolver
    .resolve(
      ProfileKind::Relational,
      args.mode,
      &env
    );
  let queue = resolver.resolve(
    ProfileKind::Queue,
    args.mode,
    &env
  );

  info!(
    host = %queue.host,
    port = queue.port,
    queue = queue.extra("queue").unwrap_or_default(),
    "queue profile resolved (no client attached)"
  );

  let credentials = credentials(
    &resolver, &env
  )?;

  let cache = Arc::new(
    CacheGateway::connect(&cache_profile)
      .await
  );
  let relational = Arc::new(
    RelationalGateway::connect(
      relational_profile
    )
    .await
  );

  let state = AppState::new(
    cache,
    relational.clone(),
    credentials
  );
  let app = router(state);

  let addr = http.bind_address();
  let listener =
    tokio::net::TcpListener::bind(&addr)
      .await
      .map_err(|source| {
        BootError::Bind {
          addr: addr.clone(),
          source
        }
      })?;

  info!(addr = %addr, debug = http.debug(), "http listening");

  axum::serve(listener, app)
    .with_graceful_shutdown(
      shutdown_signal()
    )
    .await?;

  relational.close().await;
  info!("padawan stopped");

  Ok(())
}

fn credentials(
  resolver: &ConfigResolver,
  env: &EnvSnapshot
) -> Result<Credentials, BootError> {
  let settings = resolver.auth(env);

  let password_hash =
    match settings.password_hash {
      | Some(hash) => hash,
      | None => {
        warn!(
          username = %settings.username,
          "no auth password hash configured, using the default password"
        );
        hash_password(DEFAULT_PASSWORD)
          .map_err(BootError::Auth)?
      }
    };

  Ok(Credentials {
    username: settings.username,
    password_hash
  })
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = ctrl_c().await {
      warn!(error = %e, "ctrl+c handler failed");
      std::future::pending::<()>().await;
    }
    info!("received ctrl+c, shutting down");
  };

  #[cfg(unix)]
  let terminate = async {
    match signal(SignalKind::terminate()) {
      | Ok(mut stream) => {
        stream.recv().await;
        info!("received terminate signal, shutting down");
      }
      | Err(e) => {
        warn!(error = %e, "terminate handler failed");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
}
