use clap::Parser;
use provider_client::{gemini, groq, ApiKey, GeminiSettings, GroqSettings};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about = "Relays farmer queries to hosted LLM providers")]
pub struct Args {
    #[clap(short, long, env = "RELAY_ADDRESS", default_value = "127.0.0.1:5000")]
    pub address: String,

    #[clap(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub groq_api_key: ApiKey,
    #[clap(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: ApiKey,

    #[clap(long, env = "RELAY_GROQ_BASE_URL", default_value = groq::DEFAULT_BASE_URL)]
    pub groq_base_url: String,
    #[clap(long, env = "RELAY_CHAT_MODEL", default_value = groq::DEFAULT_CHAT_MODEL)]
    pub chat_model: String,
    #[clap(long, env = "RELAY_CHAT_TEMPERATURE", default_value = "0.7")]
    pub chat_temperature: f32,
    #[clap(long, env = "RELAY_CHAT_MAX_TOKENS", default_value = "400")]
    pub chat_max_tokens: u32,
    #[clap(
        long,
        env = "RELAY_TRANSCRIPTION_MODEL",
        default_value = groq::DEFAULT_TRANSCRIPTION_MODEL
    )]
    pub transcription_model: String,
    #[clap(long, env = "RELAY_TRANSCRIPTION_LANGUAGE", default_value = "hi")]
    pub transcription_language: String,

    #[clap(long, env = "RELAY_GEMINI_BASE_URL", default_value = gemini::DEFAULT_BASE_URL)]
    pub gemini_base_url: String,
    #[clap(long, env = "RELAY_VISION_MODEL", default_value = gemini::DEFAULT_VISION_MODEL)]
    pub vision_model: String,
    #[clap(long, env = "RELAY_VISION_TEMPERATURE", default_value = "0.4")]
    pub vision_temperature: f32,
    #[clap(long, env = "RELAY_VISION_MAX_OUTPUT_TOKENS", default_value = "4096")]
    pub vision_max_output_tokens: u32,

    /// Per-request timeout for outbound provider calls, in seconds.
    #[clap(long, env = "RELAY_REQUEST_TIMEOUT_SECS", default_value = "90")]
    pub request_timeout_secs: u64,
    /// Provider calls allowed in flight at once; the rest wait for a permit.
    #[clap(long, env = "RELAY_MAX_CONCURRENT_REQUESTS", default_value = "8")]
    pub max_concurrent_requests: usize,
    #[clap(long, env = "RELAY_MAX_UPLOAD_BYTES", default_value = "10485760")]
    pub max_upload_bytes: usize,

    #[clap(long, env = "RELAY_LOG_DIR", default_value = ".")]
    pub log_dir: PathBuf,
    #[clap(long, env = "RELAY_UPLOADS_DIR", default_value = "uploaded_images")]
    pub uploads_dir: PathBuf,
    /// Directory holding `index.html`, served at `/`.
    #[clap(long, env = "RELAY_STATIC_DIR", default_value = ".")]
    pub static_dir: PathBuf,
}

impl Args {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn groq_settings(&self) -> GroqSettings {
        GroqSettings {
            api_key: self.groq_api_key.clone(),
            base_url: self.groq_base_url.clone(),
            chat_model: self.chat_model.clone(),
            temperature: self.chat_temperature,
            max_tokens: self.chat_max_tokens,
            transcription_model: self.transcription_model.clone(),
            transcription_language: self.transcription_language.clone(),
        }
    }

    pub fn gemini_settings(&self) -> GeminiSettings {
        GeminiSettings {
            api_key: self.gemini_api_key.clone(),
            base_url: self.gemini_base_url.clone(),
            model: self.vision_model.clone(),
            temperature: self.vision_temperature,
            max_output_tokens: self.vision_max_output_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 5] = [
        "relay",
        "--groq-api-key",
        "gsk_cli",
        "--gemini-api-key",
        "AIza_cli",
    ];

    #[test]
    fn defaults_match_the_documented_service() {
        let args = Args::try_parse_from(KEYS).unwrap();
        assert_eq!(args.address, "127.0.0.1:5000");
        assert_eq!(args.request_timeout(), Duration::from_secs(90));
        assert_eq!(args.max_concurrent_requests, 8);

        let groq = args.groq_settings();
        assert_eq!(groq.chat_model, "llama-3.3-70b-versatile");
        assert_eq!(groq.max_tokens, 400);
        assert_eq!(groq.transcription_language, "hi");

        let gemini = args.gemini_settings();
        assert_eq!(gemini.model, "gemini-2.5-flash");
        assert_eq!(gemini.max_output_tokens, 4096);
    }

    #[test]
    fn blank_keys_are_rejected() {
        let result = Args::try_parse_from([
            "relay",
            "--groq-api-key",
            " ",
            "--gemini-api-key",
            "AIza_cli",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn keys_are_redacted_in_debug() {
        let args = Args::try_parse_from(KEYS).unwrap();
        let rendered = format!("{args:?}");
        assert!(!rendered.contains("gsk_cli"));
        assert!(!rendered.contains("AIza_cli"));
    }
}
