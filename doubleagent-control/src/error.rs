use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use doubleagent_core::DoubleAgentError;

/// Thin wrapper so control-plane handlers can return `Result<_, ApiError>`
/// and have axum turn any core error into the right status code + JSON
/// body, without this crate implementing a foreign trait on a foreign type.
pub struct ApiError(pub DoubleAgentError);

impl From<DoubleAgentError> for ApiError {
    fn from(err: DoubleAgentError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.to_json_body())).into_response()
    }
}
