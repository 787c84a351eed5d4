pub mod compliance_service;
pub mod config;
pub mod document_processor;
pub mod embedding_service;
pub mod formatter;
pub mod llm_service;
pub mod models;
pub mod prompt;

pub use compliance_service::ComplianceService;
pub use config::{Config, ConfigError};
pub use document_processor::DocumentProcessor;
pub use embedding_service::VectorIndex;
pub use llm_service::{build_llm_client, GeminiService, GroqService, LlmClient};
pub use models::*;
