use crate::error::ApiError;
use crate::responses::{ComplianceResponse, HealthResponse, RootResponse};
use crate::AppState;
use axum::extract::{Multipart, State};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

pub const PDF_FIELD: &str = "pdf_file";
pub const RULES_FIELD: &str = "rules_file";

pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Compliance Check API is running".to_string(),
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

pub async fn compliance_check(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ComplianceResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let (pdf_file, rules_file) = read_uploads(multipart).await?;

    if !has_extension(&pdf_file.filename, ".pdf") {
        return Err(ApiError::BadRequest(
            "PDF file must have .pdf extension".to_string(),
        ));
    }
    if !has_extension(&rules_file.filename, ".txt") {
        return Err(ApiError::BadRequest(
            "Rules file must have .txt extension".to_string(),
        ));
    }

    let rules_text = String::from_utf8(rules_file.bytes)
        .map_err(|_| ApiError::BadRequest("Rules file must be UTF-8 text".to_string()))?;

    log::info!(
        "[{}] Processing compliance check for {} against {}",
        request_id,
        pdf_file.filename,
        rules_file.filename
    );
    let started = std::time::Instant::now();

    let results = state
        .service
        .run_compliance_check(&pdf_file.filename, pdf_file.bytes, &rules_text)
        .await
        .map_err(ApiError::Processing)?;

    log::info!(
        "[{}] Assessed {} rules in {} ms",
        request_id,
        results.len(),
        started.elapsed().as_millis()
    );

    Ok(Json(ComplianceResponse {
        status: "success".to_string(),
        results,
        pdf_filename: pdf_file.filename,
        rules_filename: rules_file.filename,
    }))
}

async fn read_uploads(mut multipart: Multipart) -> Result<(UploadedFile, UploadedFile), ApiError> {
    let mut pdf_file = None;
    let mut rules_file = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name != PDF_FIELD && name != RULES_FIELD {
            log::debug!("Ignoring unexpected multipart field {}", name);
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?.to_vec();
        let upload = UploadedFile { filename, bytes };

        if name == PDF_FIELD {
            pdf_file = Some(upload);
        } else {
            rules_file = Some(upload);
        }
    }

    let pdf_file = pdf_file
        .ok_or_else(|| ApiError::BadRequest(format!("Missing multipart field '{}'", PDF_FIELD)))?;
    let rules_file = rules_file
        .ok_or_else(|| ApiError::BadRequest(format!("Missing multipart field '{}'", RULES_FIELD)))?;

    Ok((pdf_file, rules_file))
}

fn has_extension(filename: &str, extension: &str) -> bool {
    filename.to_lowercase().ends_with(extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(has_extension("Policy.PDF", ".pdf"));
        assert!(has_extension("rules.txt", ".txt"));
        assert!(!has_extension("rules.txt.exe", ".txt"));
        assert!(!has_extension("", ".pdf"));
    }
}
