mod error;
pub mod gemini;
pub mod groq;

pub use error::ProviderError;
pub use gemini::{GeminiClient, GeminiSettings};
pub use groq::{GroqClient, GroqSettings};

use async_trait::async_trait;
use std::fmt::Debug;
use std::str::FromStr;

/// Credential for a hosted provider. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl FromStr for ApiKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err("API key must not be blank".to_string());
        }
        Ok(Self(value.to_owned()))
    }
}

impl Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub file_name: String,
    /// Falls back to the client's configured language when `None`.
    pub language: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub prompt: String,
    pub image: ImagePayload,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &ChatCompletion) -> Result<String, ProviderError>;
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, clip: AudioClip) -> Result<String, ProviderError>;
}

#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn describe_image(&self, request: &VisionRequest) -> Result<String, ProviderError>;
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
