use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2,
    PasswordHash,
    PasswordHasher,
    PasswordVerifier,
};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::app_state::AppState;
use crate::errors::ServerError;

const REALM: &str = "Basic realm=\"padawan\"";

/// The one credential pair the gated routes
/// accept. The password is kept as an argon2
/// PHC string only.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password_hash: String,
}

impl Credentials {
    pub fn verify(&self, username: &str, password: &str) -> bool {
        username == self.username && verify_password(&self.password_hash, password).is_ok()
    }
}

pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| format!("password hash error: {e}"))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(hash: &str, password: &str) -> Result<(), String> {
    let parsed = PasswordHash::new(hash).map_err(|e| format!("password hash parse error: {e}"))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|e| format!("password verify error: {e}"))
}

/// `(username, password)` from an
/// `Authorization: Basic ...` header.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?.trim();
    let decoded = STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

pub async fn require_basic_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some((username, password)) = basic_credentials(request.headers()) else {
        return challenge("missing credentials");
    };

    if !state.credentials.verify(&username, &password) {
        tracing::warn!(username = %username, path = %request.uri().path(), "basic auth rejected");
        return challenge("invalid credentials");
    }

    next.run(request).await
}

fn challenge(message: &str) -> Response {
    let mut response = ServerError::new(StatusCode::UNAUTHORIZED, message).into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(REALM));
    response
}
