use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use linker_ner::{
    config::AppConfig,
    linker::{BulkRecognizeEntitiesOutput, RecognizeEntitiesOutput},
    make_bulk_recognize_entities_output, make_recognize_entities_output, ModelKind,
    ModelRegistry, NerError,
};

// Application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
}

// API types
#[derive(Debug, Deserialize)]
pub struct RecognizeRequest {
    pub text: Option<String>,
    pub lang: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkRecognizeRequest {
    pub texts: Option<Vec<String>>,
    pub lang: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SpanTextQuery {
    /// "1" to include span text in the output
    pub with_span_text: Option<String>,
}

impl SpanTextQuery {
    fn enabled(&self) -> bool {
        self.with_span_text.as_deref() == Some("1")
    }
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn map_ner_error(error: NerError) -> ApiError {
    let status = match &error {
        // The caller named a (kind, lang) pair we don't serve
        NerError::ModelNotFound { .. } => StatusCode::BAD_REQUEST,
        // The model backend misbehaved, not us
        NerError::Http(_) | NerError::Inference(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": error.to_string() })))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "linker_ner_web_server=info,tower_http=debug".to_string()),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Load model config and build the registry up front
    let config = AppConfig::from_env()?;
    info!("Loading {} model(s)", config.models.len());
    let registry = Arc::new(ModelRegistry::from_config(&config).await?);

    let app_state = AppState { registry };
    let app = create_router(app_state);

    // Determine port
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .unwrap_or(3000);

    let addr = format!("0.0.0.0:{}", port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/recognize-entities", post(recognize_entities))
        .route("/bulk-recognize-entities", post(bulk_recognize_entities))
        .route("/api/health", get(health_check))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}

// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// POST /recognize-entities
async fn recognize_entities(
    State(state): State<AppState>,
    Query(query): Query<SpanTextQuery>,
    body: Option<Json<RecognizeRequest>>,
) -> Result<Json<RecognizeEntitiesOutput>, ApiError> {
    let Some(Json(request)) = body else {
        return Err(bad_request("Missing 'text' in request body."));
    };
    let Some(text) = request.text else {
        return Err(bad_request("Missing 'text' in request body."));
    };
    let Some(lang) = request.lang else {
        return Err(bad_request("Missing 'lang' in request body."));
    };

    let ner_model = state
        .registry
        .get(ModelKind::NamedEntity, &lang)
        .map_err(map_ner_error)?;
    let ref_part_model = state
        .registry
        .get(ModelKind::RefPart, &lang)
        .map_err(map_ner_error)?;

    let output = make_recognize_entities_output(
        &text,
        ner_model.as_ref(),
        ref_part_model.as_ref(),
        query.enabled(),
    )
    .await
    .map_err(map_ner_error)?;

    Ok(Json(output))
}

// POST /bulk-recognize-entities
async fn bulk_recognize_entities(
    State(state): State<AppState>,
    Query(query): Query<SpanTextQuery>,
    body: Option<Json<BulkRecognizeRequest>>,
) -> Result<Json<BulkRecognizeEntitiesOutput>, ApiError> {
    let Some(Json(request)) = body else {
        return Err(bad_request("Missing 'texts' in request body."));
    };
    let Some(texts) = request.texts else {
        return Err(bad_request("Missing 'texts' in request body."));
    };
    let Some(lang) = request.lang else {
        return Err(bad_request("Missing 'lang' in request body."));
    };

    let ner_model = state
        .registry
        .get(ModelKind::NamedEntity, &lang)
        .map_err(map_ner_error)?;
    let ref_part_model = state
        .registry
        .get(ModelKind::RefPart, &lang)
        .map_err(map_ner_error)?;

    let output = make_bulk_recognize_entities_output(
        &texts,
        ner_model.as_ref(),
        ref_part_model.as_ref(),
        query.enabled(),
    )
    .await
    .map_err(map_ner_error)?;

    Ok(Json(output))
}
