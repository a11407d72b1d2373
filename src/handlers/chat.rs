use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::auth::bearer_token;
use crate::dispatcher::DispatchError;
use crate::error::GatewayError;
use crate::metrics::{CHAT_LATENCY, CHAT_REQUESTS};
use crate::models::{ChatRequest, ChatResponse, MAX_RESPONSE_CHARS};
use crate::state::AppState;

pub const UNKNOWN_ORIGIN: &str = "unknown";

/// Peer IP of the connection, when the server was started with connect info.
#[derive(Debug, Clone)]
pub struct ClientOrigin(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for ClientOrigin {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        Ok(ClientOrigin(ip))
    }
}

// Session id if given and non-empty, then peer IP, then "unknown"
pub fn identity_key(session_id: Option<&str>, origin: Option<&str>) -> String {
    session_id
        .filter(|s| !s.is_empty())
        .or(origin)
        .unwrap_or(UNKNOWN_ORIGIN)
        .to_string()
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    ClientOrigin(origin): ClientOrigin,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, GatewayError> {
    let result = run_chat(&state, origin.as_deref(), &headers, payload).await;

    let outcome = match &result {
        Ok(_) => "ok",
        Err(GatewayError::Unauthorized(_)) => "unauthorized",
        Err(GatewayError::ServiceUnavailable(_)) => "unavailable",
        Err(GatewayError::Validation(_)) => "invalid",
        Err(GatewayError::RateLimited) => "rate_limited",
        Err(GatewayError::Dispatch(_)) => "backend_error",
    };
    CHAT_REQUESTS.with_label_values(&[outcome]).inc();

    result.map(Json)
}

async fn run_chat(
    state: &AppState,
    origin: Option<&str>,
    headers: &HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<ChatResponse, GatewayError> {
    // claims are not used past the gate
    let _claims = state.auth.authenticate(bearer_token(headers)).await?;

    // body errors surface only once the caller is authenticated
    let Json(payload) =
        payload.map_err(|rejection| GatewayError::Validation(rejection.body_text()))?;
    payload.validate().map_err(GatewayError::Validation)?;

    let identity = identity_key(payload.session_id.as_deref(), origin);
    if !state.rate_limiter.allow(&identity) {
        tracing::info!(identity = %identity, "rate limit exceeded");
        return Err(GatewayError::RateLimited);
    }

    let start_time = Instant::now();
    let response = state
        .dispatcher
        .generate_response(&payload.message, payload.context.as_deref())
        .await?;
    CHAT_LATENCY.observe(start_time.elapsed().as_secs_f64());

    let len = response.chars().count();
    if len > MAX_RESPONSE_CHARS {
        return Err(DispatchError::ResponseTooLong(len).into());
    }

    Ok(ChatResponse {
        response,
        model: state.dispatcher.model().to_string(),
        offline: state.dispatcher.offline_mode(),
    })
}
