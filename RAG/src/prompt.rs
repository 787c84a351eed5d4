use crate::models::ScoredChunk;
use anyhow::Result;
use tiktoken_rs::CoreBPE;

pub fn build_rule_question(rule: &str) -> String {
    format!(
        r#"Based on the document content, please analyze the following compliance rule and provide a clear assessment:

Rule: {rule}

Please provide your response in a structured format focusing on:
1. Whether the rule is met or not
2. Specific evidence from the document
3. Any relevant details or exceptions

Keep your response concise and factual."#
    )
}

/// `context` is `None` only when the document itself yielded no text.
pub fn build_prompt(context: Option<&str>, question: &str) -> String {
    let context = context.unwrap_or("(The document contains no extractable text.)");

    format!(
        r#"Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer.

{context}

Question: {question}
Helpful Answer:"#
    )
}

/// Packs retrieved chunks into prompt context under a cl100k token budget.
pub struct ContextBuilder {
    bpe: CoreBPE,
    token_budget: usize,
}

impl ContextBuilder {
    pub fn new(token_budget: usize) -> Result<Self> {
        Ok(Self {
            bpe: tiktoken_rs::cl100k_base()?,
            token_budget,
        })
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Joins chunk contents with blank lines, stopping before the budget is
    /// exceeded. The first chunk is truncated rather than dropped.
    pub fn build_context(&self, chunks: &[ScoredChunk]) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut used = 0;

        for scored in chunks {
            let tokens = self.bpe.encode_with_special_tokens(&scored.chunk.content);

            if used + tokens.len() > self.token_budget {
                if parts.is_empty() {
                    if let Some(truncated) = self.truncate(tokens, self.token_budget) {
                        parts.push(truncated);
                    }
                }
                log::debug!(
                    "Context budget of {} tokens reached after {} chunks",
                    self.token_budget,
                    parts.len()
                );
                break;
            }

            used += tokens.len();
            parts.push(scored.chunk.content.clone());
        }

        parts.join("\n\n")
    }

    fn truncate(&self, tokens: Vec<usize>, budget: usize) -> Option<String> {
        // A cut can land inside a multi-byte character; back off a few tokens.
        (budget.saturating_sub(4)..=budget.min(tokens.len()))
            .rev()
            .filter(|&end| end > 0)
            .find_map(|end| self.bpe.decode(tokens[..end].to_vec()).ok())
    }
}
