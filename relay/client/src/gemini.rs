//! Google Gemini `generateContent` with an inline image part.

use crate::error::ensure_success;
use crate::{join_url, ApiKey, ProviderError, VisionModel, VisionRequest};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;
use tracing::instrument;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_VISION_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: ApiKey,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl GeminiSettings {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_VISION_MODEL.to_string(),
            temperature: 0.4,
            max_output_tokens: 4096,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenates the text parts of every candidate, in order.
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .filter_map(|part| part.text)
            .collect()
    }
}

pub struct GeminiClient {
    http: reqwest::Client,
    settings: GeminiSettings,
}

impl Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings, timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, settings })
    }

    fn endpoint(&self) -> String {
        join_url(
            &self.settings.base_url,
            &format!("models/{}:generateContent", self.settings.model),
        )
    }

    fn body(&self, request: &VisionRequest) -> GenerateContentBody {
        GenerateContentBody {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![
                    RequestPart::Text {
                        text: request.prompt.clone(),
                    },
                    RequestPart::Inline {
                        inline_data: InlineData {
                            mime_type: request.image.mime_type.clone(),
                            data: BASE64.encode(&request.image.bytes),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    #[instrument(skip_all, fields(model = %self.settings.model, mime = %request.image.mime_type))]
    async fn describe_image(&self, request: &VisionRequest) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", self.settings.api_key.expose())
            .json(&self.body(request))
            .send()
            .await?;

        let generated: GenerateContentResponse = ensure_success(response).await?.json().await?;
        let text = generated.into_text();
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ImagePayload;

    fn client() -> GeminiClient {
        let settings = GeminiSettings::new("AIza-test".parse().unwrap());
        GeminiClient::new(settings, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn endpoint_names_the_model() {
        assert_eq!(
            client().endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn body_inlines_the_image_as_base64() {
        let request = VisionRequest {
            prompt: "look".to_string(),
            image: ImagePayload {
                bytes: b"abc".to_vec(),
                mime_type: "image/png".to_string(),
            },
        };
        let body = serde_json::to_value(client().body(&request)).unwrap();

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "look");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "YWJj");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);
    }

    #[test]
    fn text_is_joined_across_candidates_and_parts() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"pest_name\":"}, {"text": " \"Aphid\"}"}]}},
                {"finishReason": "SAFETY"},
                {"content": {"parts": [{"inlineData": {}}]}}
            ]
        }))
        .unwrap();
        assert_eq!(response.into_text(), "{\"pest_name\": \"Aphid\"}");
    }
}
