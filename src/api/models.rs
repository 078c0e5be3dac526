use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SummaryResponse {
    pub summary: String,
    pub url: String,
    pub success: bool,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
