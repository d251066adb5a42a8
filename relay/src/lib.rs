pub mod app;
pub mod config;
pub mod error;
pub mod event_log;
mod handlers;
pub mod prompts;
pub mod uploads;

pub use app::{build_router, AppState};
pub use error::ApiError;

#[derive(serde::Deserialize, Debug, Clone, Default)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct TranscriptionReply {
    pub text: String,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct HealthReply {
    pub status: String,
}

/// Shape of the report the vision model is asked for. Only built by the relay
/// itself, when the model's answer is not JSON at all.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct PestReport {
    pub pest_name: String,
    pub confidence: String,
    pub description: String,
    pub severity: String,
    pub organic_treatments: Vec<String>,
    pub chemical_treatments: Vec<String>,
    pub prevention_tips: Vec<String>,
}

impl PestReport {
    /// Report used when the model answered with prose instead of JSON.
    pub fn unparsed(text: &str) -> Self {
        let description = match text.trim() {
            "" => "Unable to parse model output.".to_string(),
            trimmed => trimmed.to_string(),
        };
        Self {
            pest_name: "Unknown Pest".to_string(),
            confidence: "N/A".to_string(),
            description,
            severity: "Unknown".to_string(),
            organic_treatments: vec![],
            chemical_treatments: vec![],
            prevention_tips: vec![],
        }
    }
}

/// Body of a `/detect_pest` answer.
#[derive(serde::Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum PestAnswer {
    /// The model's JSON, passed through untouched.
    Model(serde_json::Value),
    Fallback(PestReport),
}

impl PestAnswer {
    /// Any valid JSON (optionally inside a Markdown code fence) is relayed as-is;
    /// anything else becomes [`PestReport::unparsed`].
    pub fn from_model_text(text: &str) -> Self {
        match serde_json::from_str(strip_code_fence(text)) {
            Ok(value) => PestAnswer::Model(value),
            Err(_) => PestAnswer::Fallback(PestReport::unparsed(text)),
        }
    }

    pub fn is_model(&self) -> bool {
        matches!(self, PestAnswer::Model(_))
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
