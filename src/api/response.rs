use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

use crate::api::models::ExtractResponse;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error_message: String,
}

pub fn success(data: ExtractResponse) -> (StatusCode, Json<ExtractResponse>) {
    (StatusCode::OK, Json(data))
}

pub fn error(status: StatusCode, message: String) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            success: false,
            error_message: message,
        }),
    )
}
