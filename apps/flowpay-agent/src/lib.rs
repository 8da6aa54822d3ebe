use std::any::Any;
use std::sync::Arc;
use std::time::SystemTime;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use flowpay_commands::{
    ActionDescriptor, ActionDispatcher, CommandGenerator, CommandPipeline, CompletionClient,
    OpenAiCompatClient, RecordStore, StoreStats, SystemClock, action_catalog,
};
use serde::Serialize;
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub mod api_envelope;
pub mod config;

use crate::api_envelope::{
    ApiErrorCode, CommandEnvelope, EnvelopeResponse, error_envelope, internal_error, ok_envelope,
    pipeline_error,
};
use crate::config::Config;

const SERVICE_NAME: &str = "flowpay-agent";
const SERVICE_TITLE: &str = "FlowPay AI Backend API";

pub const ROUTE_INDEX: &str = "/";
pub const ROUTE_HEALTH: &str = "/health";
pub const ROUTE_AGENT_COMMAND: &str = "/api/agent/command";
pub const ROUTE_AGENT_EXECUTE: &str = "/api/agent/execute";
pub const ROUTE_AGENT_ACTIONS: &str = "/api/agent/actions";

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pipeline: CommandPipeline,
    llm_model: String,
    started_at: SystemTime,
}

#[derive(Debug, Serialize)]
struct ServiceIndex {
    message: &'static str,
    version: &'static str,
    status: &'static str,
    endpoints: ServiceEndpoints,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceEndpoints {
    health: String,
    ai_command: String,
    execute_action: String,
    available_actions: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    environment: String,
    timestamp: DateTime<Utc>,
    uptime_seconds: u64,
    llm_model: String,
    records: StoreStats,
}

#[derive(Debug, Serialize)]
struct ActionsResponse {
    actions: Vec<ActionDescriptor>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotFoundResponse {
    error: &'static str,
    path: String,
    available_endpoints: [&'static str; 3],
}

/// Router wired to the configured OpenAI-compatible endpoint.
pub fn build_router(config: Config) -> Router {
    let client: Arc<dyn CompletionClient> = Arc::new(OpenAiCompatClient::new(config.llm.clone()));
    build_router_with_client(config, client)
}

pub fn build_router_with_client(config: Config, client: Arc<dyn CompletionClient>) -> Router {
    let store = if config.seed_sample_data {
        RecordStore::with_sample_data()
    } else {
        RecordStore::new()
    };
    build_router_with_store(config, client, store)
}

pub fn build_router_with_store(
    config: Config,
    client: Arc<dyn CompletionClient>,
    store: RecordStore,
) -> Router {
    let clock = Arc::new(SystemClock);
    let llm_model = client.model_name().to_string();
    let generator = CommandGenerator::new(client, clock.clone()).with_timeout(config.llm.timeout);
    let dispatcher = ActionDispatcher::new(store, clock);
    let expose_panic_detail = config.is_development();
    let cors = cors_layer(&config);

    let state = AppState {
        config: Arc::new(config),
        pipeline: CommandPipeline::new(generator, dispatcher),
        llm_model,
        started_at: SystemTime::now(),
    };

    Router::new()
        .route(ROUTE_INDEX, get(service_index))
        .route(ROUTE_HEALTH, get(health))
        .route(ROUTE_AGENT_COMMAND, post(agent_command))
        .route(ROUTE_AGENT_EXECUTE, post(agent_execute))
        .route(ROUTE_AGENT_ACTIONS, get(agent_actions))
        .fallback(not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(move |panic| {
            panic_response(panic, expose_panic_detail)
        }))
        .layer(cors)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http()),
        )
}

fn cors_layer(config: &Config) -> CorsLayer {
    let policy = config.clone();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request| {
                origin
                    .to_str()
                    .is_ok_and(|origin| policy.origin_allowed(origin))
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>, expose_detail: bool) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|detail| (*detail).to_string()));
    error!(
        detail = detail.as_deref().unwrap_or("<non-string panic>"),
        "request handler panicked"
    );
    internal_error(detail.filter(|_| expose_detail)).into_response()
}

async fn service_index() -> Json<ServiceIndex> {
    Json(ServiceIndex {
        message: SERVICE_TITLE,
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        endpoints: ServiceEndpoints {
            health: format!("GET {ROUTE_HEALTH}"),
            ai_command: format!("POST {ROUTE_AGENT_COMMAND}"),
            execute_action: format!("POST {ROUTE_AGENT_EXECUTE}"),
            available_actions: format!("GET {ROUTE_AGENT_ACTIONS}"),
        },
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = state
        .started_at
        .elapsed()
        .map_or(0, |duration| duration.as_secs());

    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        timestamp: Utc::now(),
        uptime_seconds,
        llm_model: state.llm_model.clone(),
        records: state.pipeline.dispatcher().store().stats().await,
    })
}

async fn agent_actions() -> Json<ActionsResponse> {
    Json(ActionsResponse {
        actions: action_catalog(),
    })
}

async fn agent_command(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> EnvelopeResponse {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!(%rejection, "unreadable prompt request body");
            Value::Null
        }
    };

    match state.pipeline.run_prompt_request(&body).await {
        Ok(outcome) => match outcome.output.to_value() {
            Ok(data) => {
                info!(action = %outcome.action, "prompt handled");
                let envelope = CommandEnvelope {
                    prompt: Some(outcome.prompt),
                    command: Some(outcome.command),
                    ..ok_envelope(outcome.action.as_str(), data)
                };
                (StatusCode::OK, Json(envelope))
            }
            Err(error) => serialization_failure(&error),
        },
        Err(error) => {
            warn!(status = error.status_code(), %error, "prompt request failed");
            let prompt = body
                .get("prompt")
                .and_then(Value::as_str)
                .map(str::to_string);
            let (status, Json(envelope)) = pipeline_error(&error);
            (status, Json(envelope.with_prompt(prompt)))
        }
    }
}

async fn agent_execute(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> EnvelopeResponse {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            let (status, Json(mut envelope)) =
                error_envelope(ApiErrorCode::InvalidRequest, "Invalid command");
            envelope.details = Some(vec![rejection.body_text()]);
            return (status, Json(envelope));
        }
    };

    match state.pipeline.run_command(&body).await {
        Ok(output) => match output.to_value() {
            Ok(data) => (
                StatusCode::OK,
                Json(ok_envelope(output.action().as_str(), data)),
            ),
            Err(error) => serialization_failure(&error),
        },
        Err(error) => {
            warn!(status = error.status_code(), %error, "command execution failed");
            let action = body
                .get("action")
                .and_then(Value::as_str)
                .map(str::to_string);
            let (status, Json(envelope)) = pipeline_error(&error);
            (status, Json(envelope.with_action(action)))
        }
    }
}

fn serialization_failure(error: &serde_json::Error) -> EnvelopeResponse {
    error!(%error, "failed to serialize action output");
    error_envelope(
        ApiErrorCode::InternalError,
        format!("failed to serialize action output: {error}"),
    )
}

async fn not_found(uri: Uri) -> (StatusCode, Json<NotFoundResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            error: "Endpoint not found",
            path: uri.path().to_string(),
            available_endpoints: [ROUTE_HEALTH, ROUTE_AGENT_COMMAND, ROUTE_AGENT_EXECUTE],
        }),
    )
}
