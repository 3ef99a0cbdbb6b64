use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::{HeaderName, HeaderValue, Method, StatusCode, Uri, header},
    response::IntoResponse,
    routing::{get, post},
};
use metrics::counter;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::Config;
use crate::error::AppError;
use crate::grader::Grader;
use crate::types::PredictResponse;
use crate::upload::UploadStore;

const ML_STATUS_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppState {
    grader: Arc<dyn Grader + Send + Sync>,
    uploads: UploadStore,
    environment: String,
    ml_service_url: String,
    http: reqwest::Client,
}

impl AppState {
    pub fn new(config: &Config, grader: Arc<dyn Grader + Send + Sync>) -> Self {
        Self {
            grader,
            uploads: UploadStore::new(&config.upload_dir, config.retain_uploads),
            environment: config.node_env.clone(),
            ml_service_url: config.ml_service_url().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }
}

/// All API routes, without metrics or tracing layers.
pub fn router(config: &Config, state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler))
        .route("/api/ml-status", get(ml_status_handler))
        .route("/api/predict", post(predict_handler))
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(config))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(%origin, error = %e, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();
    tracing::info!(?origins, "Allowed origins");

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([
            header::CONTENT_RANGE,
            HeaderName::from_static("x-content-range"),
        ])
        .max_age(Duration::from_secs(24 * 60 * 60))
}

#[tracing::instrument(skip_all)]
async fn predict_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, AppError> {
    counter!("prediction_requests_total").increment(1);

    // No body or a non-multipart body means there is no file.
    let multipart = multipart.map_err(|rejection| {
        tracing::debug!(%rejection, "Request carries no multipart form");
        AppError::NoImage
    })?;

    let request = state.uploads.intake(multipart).await?;
    tracing::info!(
        crop_type = ?request.crop_type,
        file = %request.image.original_name,
        size = request.image.size,
        "Processing prediction request"
    );

    let result = state.grader.grade(&request).await.map_err(|e| {
        counter!("prediction_failures_total").increment(1);
        AppError::Prediction(e)
    })?;

    tracing::info!(grade = %result.grade, confidence = result.confidence, "Prediction completed");
    Ok(Json(PredictResponse::from(result)))
}

async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "Crop grading backend running",
        "environment": state.environment,
        "mlServiceUrl": state.ml_service_url,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "status": "healthy",
        "environment": state.environment,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[tracing::instrument(skip_all)]
async fn ml_status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let reply = state
        .http
        .get(format!("{}/", state.ml_service_url))
        .timeout(ML_STATUS_TIMEOUT)
        .send()
        .await
        .and_then(|response| response.error_for_status());

    let status = match reply {
        Ok(response) => response.json::<serde_json::Value>().await,
        Err(e) => Err(e),
    };

    match status {
        Ok(ml_status) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "ML service is running",
                "mlServiceUrl": state.ml_service_url,
                "mlStatus": ml_status,
            })),
        ),
        Err(e) => {
            tracing::warn!(ml_service_url = %state.ml_service_url, error = %e, "ML service unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "message": "ML service is not available",
                    "mlServiceUrl": state.ml_service_url,
                    "error": e.to_string(),
                })),
            )
        }
    }
}

async fn not_found_handler(method: Method, uri: Uri) -> impl IntoResponse {
    tracing::info!(%method, %uri, "Route not found");
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": format!("Route not found: {method} {uri}"),
            "method": method.as_str(),
            "requestedUrl": uri.to_string(),
        })),
    )
}
