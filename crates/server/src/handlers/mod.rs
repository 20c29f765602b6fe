mod backends;
mod health;
mod signup;

use axum::Router;
use axum::middleware;
use axum::routing::{
  get,
  post
};

use crate::app_state::AppState;
use crate::auth::require_basic_auth;

pub fn router(
  state: AppState
) -> Router {
  let gated = Router::new()
    .route("/redis-submit/", post(signup::redis_submit))
    .route("/authenticate/", get(signup::authenticate))
    .route_layer(middleware::from_fn_with_state(
      state.clone(),
      require_basic_auth
    ));

  Router::new()
    .route("/health", get(health::health))
    .route("/submit/", post(signup::submit))
    .route("/redis-rest-submit", post(signup::redis_rest_submit))
    .route("/get-redis", get(backends::get_redis))
    .route("/redis-status", get(backends::redis_status))
    .route("/postgres-status", get(backends::postgres_status))
    .route("/get-postgres", get(backends::get_postgres))
    .merge(gated)
    .with_state(state)
}
