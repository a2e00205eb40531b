use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chatbot_core::Matcher;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub records: usize,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

async fn handle_chatbot(
    State(matcher): State<Arc<Matcher>>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected chatbot request");
            return error_response(
                StatusCode::BAD_REQUEST,
                "expected a JSON body of the form {\"message\": string}",
            );
        }
    };

    // Scoring is CPU-bound; keep it off the async workers.
    match tokio::task::spawn_blocking(move || matcher.respond(&request.message)).await {
        Ok(Ok(response)) => Json(ChatResponse { response }).into_response(),
        Ok(Err(err)) => {
            error!(error = %err, "Matcher failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
        Err(err) => {
            error!(error = %err, "Matcher task panicked");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

async fn handle_health(State(matcher): State<Arc<Matcher>>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        records: matcher.corpus().len(),
    })
}

pub fn router(matcher: Arc<Matcher>) -> Router {
    Router::new()
        .route("/chatbot", post(handle_chatbot))
        .route("/health", get(handle_health))
        .with_state(matcher)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

pub async fn serve(matcher: Arc<Matcher>, bind: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    info!(
        policy = matcher.policy().name(),
        "Serving chatbot API on http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, router(matcher))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve chatbot API")
}
