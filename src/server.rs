// HTTP server for the terminal
//
// Routes:
// - GET  /             terminal page
// - POST /run_command  {"command": "..."} -> {"output": "...", "status": N}
// - GET  /health       liveness
// - GET  /metrics      Prometheus scrape endpoint (if enabled)

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Method, Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::config::Config;
use crate::metrics;
use crate::terminal::Terminal;
use crate::tools::CommandResponse;

const INDEX_HTML: &str = include_str!("../static/index.html");

pub const NO_COMMAND_MESSAGE: &str = "Error: No command provided";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    terminal: Arc<Terminal>,
}

impl AppState {
    pub fn new(terminal: Terminal) -> Self {
        Self {
            terminal: Arc::new(terminal),
        }
    }
}

/// Body of `POST /run_command`
#[derive(Debug, Deserialize)]
pub struct RunCommandRequest {
    pub command: String,
}

/// Build the application router
///
/// # Errors
///
/// Returns an error if an allowed origin is not a valid header value.
pub fn router(state: AppState, config: &Config) -> Result<Router> {
    let origins = config
        .server
        .allowed_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid CORS origin")?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let mut app = Router::new()
        .route("/", get(index_handler))
        .route("/run_command", post(run_command_handler))
        .route("/health", get(health_handler));

    if config.metrics.enabled {
        metrics::init().context("Failed to initialize metrics")?;
        app = app.route("/metrics", get(metrics_handler));
    }

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        tracing::info_span!(
            "request",
            id = %uuid::Uuid::new_v4(),
            method = %request.method(),
            uri = %request.uri(),
        )
    });

    Ok(app
        .fallback(not_found_handler)
        .with_state(state)
        .layer(cors)
        .layer(trace)
        .layer(CatchPanicLayer::custom(panic_handler)))
}

/// Bind and serve until Ctrl-C
pub async fn start_server(config: &Config, terminal: Terminal) -> Result<()> {
    let app = router(AppState::new(terminal), config)?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    info!("Starting terminal server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

fn into_http(response: CommandResponse) -> Response {
    let status =
        StatusCode::from_u16(response.http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response)).into_response()
}

async fn run_command_handler(
    State(state): State<AppState>,
    payload: Result<Json<RunCommandRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            info!("Bad run_command request: {}", rejection);
            return into_http(CommandResponse::error(400, NO_COMMAND_MESSAGE));
        }
    };

    into_http(state.terminal.handle(&request.command).await)
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_handler() -> impl IntoResponse {
    StatusCode::OK
}

async fn metrics_handler() -> Response {
    match metrics::gather_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text).into_response(),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error gathering metrics").into_response()
        }
    }
}

async fn not_found_handler() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Endpoint not found" }))).into_response()
}

fn panic_handler(_panic: Box<dyn Any + Send + 'static>) -> Response {
    error!("Handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}
