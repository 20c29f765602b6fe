use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub useremail: String,
    /// Any value, even empty, turns
    /// persistence on.
    pub persist: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RestSubmitRequest {
    pub payload: Option<Map<String, Value>>,
    #[serde(default)]
    pub redis: Value,
    #[serde(default)]
    pub persist: Value,
}

/// JSON truthiness for the `redis` and
/// `persist` switches.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[derive(Debug, Serialize)]
pub struct MessageEnvelope<T> {
    pub message: T,
}

#[derive(Debug, Default, Serialize)]
pub struct SubmitMessage {
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct AuthMessage {
    pub state: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SignupEcho {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct PostgresStatus {
    pub status: u8,
    pub message: String,
}
