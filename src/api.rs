use std::sync::Arc;

use anyhow::{Error, Result};
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    auth::require_signature,
    clients::{
        health::HealthChecker, queue::MessagePublisher, rbmq::RabbitMqClient,
        template::HandlebarsRenderer,
    },
    config::Config,
    dispatcher::Dispatcher,
    models::{
        health::{HealthStatus, PingResponse},
        message::{SendRequest, SendRequestPayload},
        response::{ErrorResponse, SendResponse},
    },
    registry::TemplateRegistry,
    utils::retry_with_backoff,
    validator::RequestValidator,
};

pub const SENDING_APPLICATION_HEADER: &str = "x-sending-application";

pub struct AppState {
    pub app_env: String,
    pub send_secret: String,
    pub validator: RequestValidator,
    pub dispatcher: Dispatcher,
    pub health_checker: HealthChecker,
}

impl AppState {
    pub fn new(
        app_env: impl Into<String>,
        send_secret: impl Into<String>,
        validator: RequestValidator,
        publisher: Arc<dyn MessagePublisher>,
    ) -> Self {
        Self {
            app_env: app_env.into(),
            send_secret: send_secret.into(),
            validator,
            dispatcher: Dispatcher::new(publisher.clone()),
            health_checker: HealthChecker::new(publisher),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let v1 = Router::new()
        .route("/send", post(send))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_signature));

    Router::new()
        .route("/ping", get(ping))
        .nest("/v1", v1)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_api_server(config: Config) -> Result<(), Error> {
    let registry = Arc::new(TemplateRegistry::from_file(&config.email_config_path)?);
    let renderer = Arc::new(HandlebarsRenderer::new(config.template_path.clone()));
    let validator = RequestValidator::new(registry, renderer, config.app_env.clone());

    let rabbitmq = retry_with_backoff(&config.retry_config(), || RabbitMqClient::connect(&config)).await?;

    let state = Arc::new(AppState::new(
        config.app_env.clone(),
        config.send_secret.clone(),
        validator,
        Arc::new(rabbitmq),
    ));

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = TcpListener::bind(&addr).await?;

    info!(address = %addr, env = %config.app_env, "API server started");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

async fn ping(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.health_checker.check().await;

    let status_code = match status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status_code, Json(PingResponse { status }))
}

async fn send(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Response {
    let payload: SendRequestPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Non-deserialisable send request");
            return bad_request("Non-deserialisable data");
        }
    };

    let mut request = SendRequest::new(payload, state.app_env.clone());

    if let Err(rejection) = state.validator.validate(&request, false) {
        info!(
            request_id = %request.id,
            template_key = %request.template_key,
            reason = %rejection,
            "Send request rejected"
        );
        return bad_request(rejection.to_string());
    }

    if let Some(sender) = headers
        .get(SENDING_APPLICATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
    {
        request = request.with_sending_application(sender);
    }

    match state.dispatcher.dispatch(&request, &body).await {
        Ok(id) => (StatusCode::OK, Json(SendResponse::queued(id))).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

fn bad_request(description: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::bad_request(description)),
    )
        .into_response()
}
