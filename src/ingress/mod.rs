//! HTTP server receiving GitHub webhook deliveries.
//!
//! # Endpoints
//!
//! - `POST /hook` - Accepts GitHub webhook deliveries and signals the [`Debouncer`] for
//!   requested pull request runs
//! - `GET /health` - Returns 200 if the server is running

#![cfg(feature = "ingress")]

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::framework::Debouncer;

mod event;
mod signature;

pub use event::*;
pub use signature::verify_signature;

/// Header name for GitHub event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub delivery ID.
const HEADER_DELIVERY: &str = "x-github-delivery";
/// Header name for GitHub signature.
const HEADER_SIGNATURE: &str = "x-hub-signature-256";

/// Shared application state, handed to handlers through Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    debouncer: Arc<Debouncer>,
    /// Deliveries are not authenticated when unset.
    webhook_secret: Option<Vec<u8>>,
}

impl std::fmt::Debug for AppStateInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppStateInner")
            .field("debouncer", &self.debouncer)
            .field("verifies_signatures", &self.webhook_secret.is_some())
            .finish()
    }
}

impl AppState {
    /// Creates a new [`AppState`] signalling the given [`Debouncer`].
    pub fn new<S>(debouncer: Arc<Debouncer>, webhook_secret: Option<S>) -> Self
    where
        S: Into<Vec<u8>>,
    {
        Self {
            inner: Arc::new(AppStateInner {
                debouncer,
                webhook_secret: webhook_secret.map(Into::into),
            }),
        }
    }

    /// Returns the debouncer that qualifying deliveries signal.
    pub fn debouncer(&self) -> &Debouncer {
        &self.inner.debouncer
    }

    /// Returns the webhook secret, if signatures are checked.
    pub fn webhook_secret(&self) -> Option<&[u8]> {
        self.inner.webhook_secret.as_deref()
    }
}

/// Errors that reject a webhook delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Missing required header.
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    /// Missing or invalid signature.
    #[error("invalid signature")]
    InvalidSignature,

    /// Invalid JSON body.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingHeader(_) | Self::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSignature => StatusCode::UNAUTHORIZED,
        };

        (status, self.to_string()).into_response()
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/hook", post(webhook_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}

/// Health check handler.
pub async fn health_handler() -> &'static str {
    "OK"
}

/// Webhook handler.
///
/// # Response
///
/// - 202 Accepted: a pull request run was requested and a reconciliation is scheduled
/// - 200 OK: the delivery is irrelevant or malformed and was ignored
/// - 400 Bad Request: missing event header or invalid JSON
/// - 401 Unauthorized: missing or invalid signature while a secret is configured
pub async fn webhook_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError> {
    let event_type = get_header(&headers, HEADER_EVENT)?;
    let delivery_id = get_header(&headers, HEADER_DELIVERY).unwrap_or("unknown");

    if let Some(secret) = app_state.webhook_secret() {
        let signature =
            get_header(&headers, HEADER_SIGNATURE).map_err(|_| WebhookError::InvalidSignature)?;
        if !verify_signature(&body, signature, secret) {
            warn!(delivery_id, event_type, "rejected delivery with invalid signature");
            return Err(WebhookError::InvalidSignature);
        }
    }

    match classify(event_type, &body)? {
        Delivery::RunRequested { run_id } => {
            info!(delivery_id, ?run_id, "pull request run requested, scheduling reconciliation");
            app_state.debouncer().signal();
            Ok((StatusCode::ACCEPTED, "Accepted"))
        }
        Delivery::Ignored(reason) => {
            debug!(delivery_id, event_type, "ignoring delivery: {reason}");
            Ok((StatusCode::OK, "Ignored"))
        }
        Delivery::Malformed(reason) => {
            warn!(delivery_id, event_type, "ignoring malformed delivery: {reason}");
            Ok((StatusCode::OK, "Ignored"))
        }
    }
}

fn get_header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, WebhookError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or(WebhookError::MissingHeader(name))
}
