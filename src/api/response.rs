use serde::Serialize;
use axum::Json;
use axum::http::StatusCode;

#[derive(Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

pub fn success<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(data))
}

pub fn error(status: StatusCode, detail: String) -> (StatusCode, Json<ErrorBody>) {
    (status, Json(ErrorBody { detail }))
}
