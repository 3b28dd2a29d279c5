use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::bail_invalid;
use crate::error::{RecipeResult, RecipeRunnerError};
use crate::inference::TextGenerator;
use crate::recipe::{build_prompt, extract_recipe, GenerateRecipeRequest, GenerateRecipeResponse};

/// Shared handler state. `generator` is `None` when the checkpoint failed to load at
/// startup; every recipe request is then answered with 503 until a restart.
#[derive(Clone)]
pub struct AppState {
    pub generator: Option<Arc<dyn TextGenerator + Send + Sync>>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/generate/", post(handle_generate_request))
        .route("/chat/", get(handle_chat_page))
        .route("/health", get(handle_health_request))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[axum_macros::debug_handler]
async fn handle_generate_request(
    State(state): State<AppState>,
    body: Bytes,
) -> RecipeResult<(StatusCode, Json<GenerateRecipeResponse>)> {
    let Some(generator) = state.generator else {
        return Err(RecipeRunnerError::Unavailable(
            "model is not available, check the server logs",
        ));
    };

    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => bail_invalid!("request body is not valid JSON: {}", err),
    };
    let request =
        GenerateRecipeRequest::from_value(&value).map_err(RecipeRunnerError::InvalidRequest)?;

    let prompt = build_prompt(&request);
    // TODO abort generation when the client disconnects
    let (output, inference_time) =
        tokio::task::spawn_blocking(move || generator.generate(&prompt)).await??;
    let recipe = extract_recipe(&output);
    info!(
        "Generated recipe for {} in {:.2}s",
        request.dish_name, inference_time
    );

    Ok((StatusCode::OK, Json(GenerateRecipeResponse { recipe })))
}

#[axum_macros::debug_handler]
async fn handle_chat_page() -> Html<&'static str> {
    Html(include_str!("../templates/chat.html"))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model: Option<String>,
}

#[axum_macros::debug_handler]
async fn handle_health_request(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    match state.generator {
        Some(generator) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                model: Some(generator.model_name().to_string()),
            }),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unavailable",
                model: None,
            }),
        ),
    }
}
