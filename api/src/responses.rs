use compliance_rag::ComplianceResults;
use serde::Serialize;

#[derive(Serialize)]
pub struct ComplianceResponse {
    pub status: String,
    pub results: ComplianceResults,
    pub pdf_filename: String,
    pub rules_filename: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub detail: String,
}
