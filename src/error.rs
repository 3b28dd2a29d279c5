use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

/// Error surface of the HTTP layer.
///
/// Validation failures are constructed explicitly (see [`bail_invalid!`]) and render as
/// plain text; everything that reaches [`RecipeRunnerError::Internal`] through the
/// blanket `From` impl is logged server-side and answered with a generic JSON body.
#[derive(Debug)]
pub enum RecipeRunnerError {
    /// Malformed JSON or a missing/invalid field. The message names the problem and is
    /// sent to the client verbatim as `text/plain`.
    InvalidRequest(String),
    /// The model never loaded; generation cannot be attempted.
    Unavailable(&'static str),
    /// Any other failure during generation or post-processing. The detail stays in the
    /// server log.
    Internal(anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct HttpErrorResponse {
    error: String,
}

impl From<String> for HttpErrorResponse {
    fn from(message: String) -> Self {
        HttpErrorResponse { error: message }
    }
}

impl From<&str> for HttpErrorResponse {
    fn from(message: &str) -> Self {
        HttpErrorResponse {
            error: message.to_string(),
        }
    }
}

impl IntoResponse for RecipeRunnerError {
    fn into_response(self) -> Response {
        match self {
            RecipeRunnerError::InvalidRequest(message) => {
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            RecipeRunnerError::Unavailable(message) => {
                let mut res = Json(HttpErrorResponse::from(message)).into_response();
                *res.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
                res
            }
            RecipeRunnerError::Internal(err) => {
                error!("request failed: {err:#}");
                let mut res =
                    Json(HttpErrorResponse::from("an internal error occurred")).into_response();
                *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                res
            }
        }
    }
}

impl<E> From<E> for RecipeRunnerError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        RecipeRunnerError::Internal(err.into())
    }
}

pub type RecipeResult<T, E = RecipeRunnerError> = Result<T, E>;

#[macro_export]
macro_rules! bail_invalid {
    ($fmt:expr $(, $arg:expr)*) => {
        return Err($crate::error::RecipeRunnerError::InvalidRequest(format!($fmt $(, $arg)*)))
    };
}
