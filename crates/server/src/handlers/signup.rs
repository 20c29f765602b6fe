use axum::{
    extract::{rejection::FormRejection, rejection::JsonRejection, State},
    Form,
    Json,
};
use padawan_core::domain::error::GatewayError;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::errors::SubmitRejection;
use crate::models::{
    is_truthy, AuthMessage, MessageEnvelope, RestSubmitRequest, SignupEcho, SignupForm, SubmitMessage,
};

const INSERTS_KEY: &str = "inserts";

type SubmitResponse = Result<Json<MessageEnvelope<SubmitMessage>>, SubmitRejection>;

pub async fn submit(form: Result<Form<SignupForm>, FormRejection>) -> Result<Json<SignupEcho>, SubmitRejection> {
    let Form(form) = form.map_err(|_| SubmitRejection::invalid("username & useremail are mandatory."))?;
    Ok(Json(SignupEcho {
        name: form.username,
        email: form.useremail,
    }))
}

pub async fn redis_rest_submit(
    State(state): State<AppState>,
    body: Result<Json<RestSubmitRequest>, JsonRejection>,
) -> SubmitResponse {
    let request = match body {
        Ok(Json(request)) => request,
        Err(e) => {
            warn!(error = %e, "unreadable submit body");
            return Err(SubmitRejection::invalid("payload key not found. Invalid Payload Data"));
        }
    };
    let Some(payload) = request.payload else {
        return Err(SubmitRejection::invalid("payload key not found. Invalid Payload Data"));
    };
    if !payload.contains_key("username") || !payload.contains_key("email") {
        return Err(SubmitRejection::invalid(
            "username & email are mandatory. Invalid Payload Data.",
        ));
    }
    let (Some(username), Some(email)) = (text_field(&payload, "username"), text_field(&payload, "email")) else {
        return Err(SubmitRejection::invalid(
            "Username & email can't be empty. Invalid payload data.",
        ));
    };

    let mut message = SubmitMessage {
        state: "successful",
        info: Some(format!(
            "Hello, young padawan {username}, the FORCE is strong with you. \n\
             You have a long way to go before you become a Jedi. \
             I will drop you a tutorial at {email}"
        )),
        ..SubmitMessage::default()
    };

    let mut writes = Vec::new();

    if is_truthy(&request.redis) {
        let stored = store_signup(&state, username, email).await;
        if stored.is_ok() {
            message.info = Some(format!(
                "Hello, master {username}, the ONE RING has been waiting for you all this time. \n\
                 Looks like we finally found each other. \
                 To claim the ONE RING, please check your email {email}"
            ));
        }
        message.redis_status = Some(write_status("stored", &stored));
        writes.push(stored);
    }

    if is_truthy(&request.persist) {
        let persisted = state.relational.insert_demo(username, email).await.map(|_| ());
        message.persist = Some(write_status("successful", &persisted));
        writes.push(persisted);
    }

    let message = settle(message, writes)?;
    info!(
        username,
        redis = ?message.redis_status,
        persist = ?message.persist,
        "signup accepted"
    );
    Ok(Json(MessageEnvelope { message }))
}

/// Form variant behind basic auth. A cache
/// error left over from an earlier request
/// is reported once as this request's cache
/// outcome, then cleared; the relational
/// insert still runs.
pub async fn redis_submit(
    State(state): State<AppState>,
    form: Result<Form<SignupForm>, FormRejection>,
) -> SubmitResponse {
    let Form(form) = form.map_err(|_| SubmitRejection::invalid("username & useremail are mandatory."))?;

    let stored = match state.cache.check_error() {
        Some(pending) => {
            state.cache.reset_error();
            Err(GatewayError::Connectivity(pending))
        }
        None => store_signup(&state, &form.username, &form.useremail).await,
    };
    let mut message = SubmitMessage {
        state: "successful",
        info: Some(format!("{} <{}>", form.username, form.useremail)),
        redis_status: Some(write_status("stored", &stored)),
        ..SubmitMessage::default()
    };
    let mut writes = vec![stored];

    if form.persist.is_some() {
        let persisted = state
            .relational
            .insert_demo(&form.username, &form.useremail)
            .await
            .map(|_| ());
        message.persist = Some(write_status("successful", &persisted));
        writes.push(persisted);
    }

    let message = settle(message, writes)?;
    Ok(Json(MessageEnvelope { message }))
}

pub async fn authenticate() -> Json<MessageEnvelope<AuthMessage>> {
    Json(MessageEnvelope {
        message: AuthMessage {
            state: "success",
            message: "Oh Captain, My Captain.",
        },
    })
}

/// Writes `username -> email`, then the
/// current counter value under `inserts`.
async fn store_signup(state: &AppState, username: &str, email: &str) -> Result<(), GatewayError> {
    state.cache.set(username, email).await?;
    let count = state.next_insert();
    state.cache.set(INSERTS_KEY, &count.to_string()).await
}

/// Per-backend label: `ok` on success,
/// `degraded` when unreachable, `failed` otherwise.
fn write_status(ok: &'static str, result: &Result<(), GatewayError>) -> &'static str {
    match result {
        Ok(()) => ok,
        Err(e) if e.is_connectivity() => "degraded",
        Err(_) => "failed",
    }
}

/// Cache and relational writes are
/// independent. The reply is a 200 while at
/// least one requested write landed, with the
/// other failures listed under `error`. Only
/// when every requested write failed does the
/// first failure become the response.
fn settle(
    mut message: SubmitMessage,
    writes: Vec<Result<(), GatewayError>>,
) -> Result<SubmitMessage, SubmitRejection> {
    let requested = writes.len();
    let failures: Vec<GatewayError> = writes.into_iter().filter_map(Result::err).collect();

    if failures.len() == requested {
        return match failures.into_iter().next() {
            Some(first) => Err(first.into()),
            None => Ok(message),
        };
    }

    if !failures.is_empty() {
        let errors: Vec<&str> = failures.iter().map(GatewayError::message).collect();
        message.error = Some(errors.join("; "));
    }
    Ok(message)
}

fn text_field<'a>(payload: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}
