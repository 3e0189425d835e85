//! HTTP surface. Every JSON endpoint answers 200 with either a result body
//! or `{"error": "..."}`.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::classifier::ClassifierMode;
use crate::error::PredictError;
use crate::state::SharedState;
use crate::{training, upload};

pub const UPLOAD_FIELD: &str = "file";

pub fn router(state: SharedState) -> Router {
    let static_dir = state.config.static_dir.clone();
    let body_limit = state.config.body_limit_bytes();

    Router::new()
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route("/upload", post(upload_handler))
        .route("/train_model", get(train_model_handler))
        .route("/model_status", get(model_status_handler))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Filename and contents of the `file` field, if the form has one.
async fn read_upload(
    multipart: &mut Multipart,
) -> Result<(Option<String>, Vec<u8>), PredictError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PredictError::Internal(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(String::from) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| PredictError::Internal(e.to_string()))?;
        return Ok((Some(filename), bytes.to_vec()));
    }
    Ok((None, Vec::new()))
}

async fn handle_upload(
    state: &SharedState,
    multipart: &mut Multipart,
) -> Result<Value, PredictError> {
    let (filename, image_data) = read_upload(multipart).await?;
    let original = upload::validate(filename.as_deref())?;

    let stored = upload::save(&state.config.upload_dir, original, &image_data)
        .await
        .map_err(|e| PredictError::Internal(format!("could not store upload: {}", e)))?;
    info!("Stored upload {} ({} bytes)", stored.filename, image_data.len());

    let service = state.service.clone();
    let path = stored.path.clone();
    let outcome = tokio::task::spawn_blocking(move || service.predict(&path))
        .await
        .map_err(|e| PredictError::Internal(e.to_string()))?;

    let mut body = match outcome {
        Ok(result) => {
            serde_json::to_value(result).map_err(|e| PredictError::Internal(e.to_string()))?
        }
        Err(err) => err.to_json(),
    };
    body["image_path"] = json!(format!(
        "{}/{}",
        state.config.upload_url_prefix(),
        stored.filename
    ));
    Ok(body)
}

async fn upload_handler(State(state): State<SharedState>, mut multipart: Multipart) -> Json<Value> {
    match handle_upload(&state, &mut multipart).await {
        Ok(body) => Json(body),
        Err(err) => {
            if !matches!(err, PredictError::Validation(_)) {
                error!("Upload failed: {}", err);
            }
            Json(err.to_json())
        }
    }
}

async fn train_model_handler(State(state): State<SharedState>) -> Json<Value> {
    match training::train(&state).await {
        Ok(message) => Json(json!({ "success": message })),
        Err(err) => {
            error!("{}", err);
            Json(json!({ "error": err.to_string() }))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModelStatus {
    pub model_loaded: bool,
    pub num_classes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

async fn model_status_handler(State(state): State<SharedState>) -> Json<ModelStatus> {
    let classifier = state.classifier();
    let demo = state.config.mode == ClassifierMode::Demo;
    Json(ModelStatus {
        model_loaded: classifier.is_ready(),
        num_classes: classifier.num_classes(),
        demo_mode: demo.then_some(true),
        message: demo.then_some("Running in demo mode with simulated AI predictions"),
    })
}
