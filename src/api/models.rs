//! API data models

use serde::{Deserialize, Serialize};

pub use crate::transcript::{ServiceSegment, ServiceTranscriptResponse};

/// Query string of `GET /transcript`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptQuery {
    /// Video id or URL
    pub v: Option<String>,
    /// Preferred caption language
    pub lang: Option<String>,
}

/// Body of `GET /health`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

/// Body of `GET /`
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub path: String,
    pub description: String,
}
