use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub ledger_connected: bool,
}

/// Body of every error response.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}
