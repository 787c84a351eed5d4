use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub content: String,
    pub chunks: Vec<DocumentChunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub index: usize,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleAssessment {
    pub rule: String,
    pub answer: String,
}

/// Per-rule answers in the order the rules were supplied.
///
/// Serializes as a JSON object keyed by rule text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplianceResults {
    assessments: Vec<RuleAssessment>,
}

impl ComplianceResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: impl Into<String>, answer: impl Into<String>) {
        self.assessments.push(RuleAssessment {
            rule: rule.into(),
            answer: answer.into(),
        });
    }

    pub fn get(&self, rule: &str) -> Option<&str> {
        self.assessments
            .iter()
            .find(|a| a.rule == rule)
            .map(|a| a.answer.as_str())
    }

    pub fn len(&self) -> usize {
        self.assessments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assessments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleAssessment> {
        self.assessments.iter()
    }
}

impl Serialize for ComplianceResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.assessments.len()))?;
        for assessment in &self.assessments {
            map.serialize_entry(&assessment.rule, &assessment.answer)?;
        }
        map.end()
    }
}

// Gemini generateContent wire types

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiCandidate {
    pub content: GeminiContent,
}

// OpenAI-compatible chat completion wire types (Groq)

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_serialize_as_ordered_object() {
        let mut results = ComplianceResults::new();
        results.push("Zeta rule", "• met");
        results.push("Alpha rule", "• not met");

        let json = serde_json::to_string(&results).unwrap();
        assert_eq!(json, r#"{"Zeta rule":"• met","Alpha rule":"• not met"}"#);
    }

    #[test]
    fn gemini_request_uses_camel_case_config() {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: "hi".to_string() }],
            }],
            generation_config: Some(GeminiGenerationConfig {
                temperature: 0.3,
                max_output_tokens: 1000,
            }),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 1000);
    }

    #[test]
    fn chat_response_without_choices_parses() {
        let response: ChatCompletionResponse = serde_json::from_str("{}").unwrap();
        assert!(response.choices.is_empty());
    }
}
