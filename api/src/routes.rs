use crate::handlers::{compliance_check, health, root};
use crate::AppState;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use compliance_rag::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub fn create_router(state: Arc<AppState>, config: &Config) -> Result<Router> {
    let origins = config
        .cors_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("invalid CORS origin {origin:?}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/compliance-check", post(compliance_check))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
        .with_state(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use compliance_rag::config::{ChunkingConfig, LlmConfig, LlmProvider};
    use compliance_rag::{ComplianceService, LlmClient};
    use serde_json::Value;
    use tower::ServiceExt;

    const BOUNDARY: &str = "compliance-test-boundary";
    const BADGE_POLICY_PDF: &[u8] = include_bytes!("../../RAG/tests/fixtures/badge_policy.pdf");

    struct StubLlm;

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok("The rule is met.".to_string())
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    fn test_config() -> Config {
        Config {
            llm: LlmConfig {
                provider: LlmProvider::Groq,
                api_key: "k".to_string(),
                model: "stub".to_string(),
                base_url: "http://127.0.0.1:9".to_string(),
                temperature: 0.0,
                max_output_tokens: 100,
            },
            chunking: ChunkingConfig::default(),
            top_k: 4,
            max_context_tokens: 1000,
            bind_addr: "127.0.0.1:0".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
            max_upload_bytes: 64 * 1024,
        }
    }

    fn app() -> Router {
        let config = test_config();
        let service = ComplianceService::new(&config, Arc::new(StubLlm)).unwrap();
        create_router(Arc::new(AppState { service }), &config).unwrap()
    }

    fn multipart_body(files: &[(&str, &str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (field, filename, content) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(files: &[(&str, &str, &[u8])]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/compliance-check")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(files)))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn root_and_health() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["message"], "Compliance Check API is running");

        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn assesses_every_rule_in_input_order() {
        let response = app()
            .oneshot(upload_request(&[
                ("pdf_file", "badge_policy.pdf", BADGE_POLICY_PDF),
                (
                    "rules_file",
                    "rules.txt",
                    b"Zeta: staff wear badges\n\nAlpha: visitors sign in\n",
                ),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let raw = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["pdf_filename"], "badge_policy.pdf");
        assert_eq!(body["rules_filename"], "rules.txt");

        let results = body["results"].as_object().unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.values().all(|answer| answer == "• The rule is met."));

        // Key order is checked on the wire; the parsed map sorts its keys.
        let raw = String::from_utf8(raw.to_vec()).unwrap();
        let zeta = raw.find("\"Zeta: staff wear badges\"").unwrap();
        let alpha = raw.find("\"Alpha: visitors sign in\"").unwrap();
        assert!(zeta < alpha);
    }

    #[tokio::test]
    async fn rejects_non_pdf_upload() {
        let response = app()
            .oneshot(upload_request(&[
                ("pdf_file", "policy.docx", b"data"),
                ("rules_file", "rules.txt", b"Rule one"),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["detail"], "PDF file must have .pdf extension");
    }

    #[tokio::test]
    async fn rejects_non_txt_rules() {
        let response = app()
            .oneshot(upload_request(&[
                ("pdf_file", "policy.pdf", b"data"),
                ("rules_file", "rules.csv", b"Rule one"),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["detail"], "Rules file must have .txt extension");
    }

    #[tokio::test]
    async fn rejects_missing_rules_field() {
        let response = app()
            .oneshot(upload_request(&[("pdf_file", "policy.pdf", b"data")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["detail"], "Missing multipart field 'rules_file'");
    }

    #[tokio::test]
    async fn rejects_non_utf8_rules() {
        let response = app()
            .oneshot(upload_request(&[
                ("pdf_file", "policy.pdf", b"data"),
                ("rules_file", "rules.txt", &[0xff, 0xfe, 0x00]),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unparseable_pdf_is_a_server_error() {
        let response = app()
            .oneshot(upload_request(&[
                ("pdf_file", "Policy.PDF", b"not really a pdf"),
                ("rules_file", "rules.txt", b"Rule one\nRule two"),
            ]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = json_body(response).await["detail"].as_str().unwrap().to_string();
        assert!(detail.starts_with("Error processing files:"));
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method("OPTIONS")
            .uri("/compliance-check")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn cors_allows_configured_origin_without_credentials() {
        let response = app().oneshot(preflight("http://localhost:3000")).await.unwrap();
        let headers = response.headers();

        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:3000");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "*");
        assert!(!headers.contains_key(header::ACCESS_CONTROL_ALLOW_CREDENTIALS));

        let response = app().oneshot(preflight("http://evil.test")).await.unwrap();
        assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[test]
    fn invalid_cors_origin_is_rejected() {
        let mut config = test_config();
        config.cors_origins = vec!["bad\norigin".to_string()];
        let service = ComplianceService::new(&config, Arc::new(StubLlm)).unwrap();

        assert!(create_router(Arc::new(AppState { service }), &config).is_err());
    }
}
