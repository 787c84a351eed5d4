use crate::config::Config;
use crate::document_processor::DocumentProcessor;
use crate::embedding_service::VectorIndex;
use crate::formatter::clean_and_format_response;
use crate::llm_service::LlmClient;
use crate::models::*;
use crate::prompt::{build_prompt, build_rule_question, ContextBuilder};
use anyhow::{ensure, Result};
use std::collections::HashSet;
use std::sync::Arc;

const RULE_PREVIEW_CHARS: usize = 50;

pub struct ComplianceService {
    document_processor: DocumentProcessor,
    context_builder: ContextBuilder,
    llm: Arc<dyn LlmClient>,
    top_k: usize,
}

impl ComplianceService {
    pub fn new(config: &Config, llm: Arc<dyn LlmClient>) -> Result<Self> {
        log::info!(
            "Initializing compliance service (model: {}, top_k: {})",
            llm.model_name(),
            config.top_k
        );

        ensure!(config.top_k > 0, "RETRIEVAL_TOP_K must be at least 1");
        ensure!(
            config.max_context_tokens > 0,
            "MAX_CONTEXT_TOKENS must be at least 1"
        );

        Ok(Self {
            document_processor: DocumentProcessor::new(config.chunking),
            context_builder: ContextBuilder::new(config.max_context_tokens)?,
            llm,
            top_k: config.top_k,
        })
    }

    pub async fn run_compliance_check(
        &self,
        pdf_filename: &str,
        pdf_bytes: Vec<u8>,
        rules_text: &str,
    ) -> Result<ComplianceResults> {
        log::info!("Loading PDF document...");
        let document = self.document_processor.process_pdf(pdf_filename, pdf_bytes).await?;

        log::info!("Creating vector index...");
        let index = VectorIndex::build(document.chunks);

        let rules = parse_rules(rules_text);
        log::info!("Processing {} rules...", rules.len());

        Ok(self.assess_rules(&index, &rules).await)
    }

    /// Assesses rules one after another. A failing rule is reported in its
    /// answer and does not stop the rest.
    pub async fn assess_rules(&self, index: &VectorIndex, rules: &[String]) -> ComplianceResults {
        let mut results = ComplianceResults::new();

        for (i, rule) in rules.iter().enumerate() {
            log::info!(
                "Processing rule {}/{}: {}...",
                i + 1,
                rules.len(),
                rule.chars().take(RULE_PREVIEW_CHARS).collect::<String>()
            );

            let answer = match self.assess_rule(index, rule).await {
                Ok(answer) => answer,
                Err(e) => {
                    log::error!("Error processing rule '{}': {}", rule, e);
                    format!("• Error processing rule: {}", e)
                }
            };
            results.push(rule.clone(), answer);
        }

        results
    }

    async fn assess_rule(&self, index: &VectorIndex, rule: &str) -> Result<String> {
        let question = build_rule_question(rule);
        let context = if index.is_empty() {
            None
        } else {
            let relevant_chunks = index.search(rule, self.top_k);
            Some(self.context_builder.build_context(&relevant_chunks))
        };
        let prompt = build_prompt(context.as_deref(), &question);

        let answer = self.llm.complete(&prompt).await?;
        Ok(clean_and_format_response(&answer))
    }
}

/// One rule per non-blank line, trimmed. Repeated rules are kept once.
pub fn parse_rules(rules_text: &str) -> Vec<String> {
    let mut seen = HashSet::new();

    rules_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(*line))
        .map(str::to_string)
        .collect()
}
