//! Groq's OpenAI-compatible API: chat completions and Whisper transcription.

use crate::error::ensure_success;
use crate::{join_url, ApiKey, AudioClip, ChatCompletion, ChatModel, ProviderError, SpeechToText};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;
use tracing::instrument;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_CHAT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-large-v3";

#[derive(Debug, Clone)]
pub struct GroqSettings {
    pub api_key: ApiKey,
    pub base_url: String,
    pub chat_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub transcription_model: String,
    pub transcription_language: String,
}

impl GroqSettings {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 400,
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            transcription_language: "hi".to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: [WireMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

pub struct GroqClient {
    http: reqwest::Client,
    settings: GroqSettings,
}

impl Debug for GroqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqClient")
            .field("base_url", &self.settings.base_url)
            .field("chat_model", &self.settings.chat_model)
            .finish()
    }
}

impl GroqClient {
    pub fn new(settings: GroqSettings, timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, settings })
    }

    fn chat_body<'a>(&'a self, request: &'a ChatCompletion) -> ChatCompletionBody<'a> {
        ChatCompletionBody {
            model: &self.settings.chat_model,
            messages: [
                WireMessage {
                    role: "system",
                    content: &request.system,
                },
                WireMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }
}

#[async_trait]
impl ChatModel for GroqClient {
    #[instrument(skip_all, fields(model = %self.settings.chat_model))]
    async fn complete(&self, request: &ChatCompletion) -> Result<String, ProviderError> {
        let url = join_url(&self.settings.base_url, "chat/completions");
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.settings.api_key.expose())
            .json(&self.chat_body(request))
            .send()
            .await?;

        let completion: ChatCompletionResponse = ensure_success(response).await?.json().await?;
        let reply = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse)?;

        tracing::debug!("Groq replied with {} chars", reply.len());
        Ok(reply)
    }
}

#[async_trait]
impl SpeechToText for GroqClient {
    #[instrument(
        skip_all,
        fields(model = %self.settings.transcription_model, bytes = clip.bytes.len())
    )]
    async fn transcribe(&self, clip: AudioClip) -> Result<String, ProviderError> {
        let url = join_url(&self.settings.base_url, "audio/transcriptions");
        let language = clip
            .language
            .unwrap_or_else(|| self.settings.transcription_language.clone());

        let form = Form::new()
            .part("file", Part::bytes(clip.bytes).file_name(clip.file_name))
            .text("model", self.settings.transcription_model.clone())
            .text("language", language);

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.settings.api_key.expose())
            .multipart(form)
            .send()
            .await?;

        let transcription: TranscriptionResponse = ensure_success(response).await?.json().await?;
        Ok(transcription.text.trim().to_string())
    }
}
