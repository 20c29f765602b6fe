use axum::{extract::State, http::StatusCode, Json};
use padawan_core::domain::model::{CacheEntry, DemoRecord};
use serde_json::Value;

use crate::app_state::AppState;
use crate::errors::ServerError;
use crate::models::PostgresStatus;

const PG_OK: &str = "PostgreSQL Connection Successfully established.";

pub async fn get_redis(State(state): State<AppState>) -> Result<Json<Vec<CacheEntry>>, ServerError> {
    let entries = state.cache.list_all().await?;
    Ok(Json(entries))
}

pub async fn redis_status(State(state): State<AppState>) -> Result<Json<Value>, ServerError> {
    let info = state.cache.info().await?;
    let parsed = serde_json::from_str(&info)
        .map_err(|e| ServerError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(parsed))
}

pub async fn postgres_status(State(state): State<AppState>) -> Json<PostgresStatus> {
    let (connected, message) = state.relational.check_status();
    let message = if message.is_empty() {
        PG_OK.to_string()
    } else {
        message
    };
    Json(PostgresStatus {
        status: u8::from(connected),
        message,
    })
}

pub async fn get_postgres(State(state): State<AppState>) -> Result<Json<Vec<DemoRecord>>, ServerError> {
    let records = state.relational.demo_records().await?;
    Ok(Json(records))
}
