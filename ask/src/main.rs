use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reqwest::multipart::{Form, Part};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use tracing::instrument;

#[derive(Parser, Debug)]
#[clap(version, about = "Sends a query to a running KrishiMitra relay")]
struct Args {
    #[clap(short, long, env = "RELAY_ADDRESS", default_value = "127.0.0.1:5000")]
    relay_address: String,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Checks that the relay is up.
    Health,
    /// Asks a farming question.
    Chat {
        message: String,
        #[clap(short, long)]
        language: Option<String>,
    },
    /// Transcribes a voice recording.
    Transcribe {
        path: PathBuf,
        #[clap(short, long)]
        language: Option<String>,
    },
    /// Looks for pests on a crop leaf photo.
    DetectPest { path: PathBuf },
}

#[derive(serde::Deserialize, Debug)]
struct ChatReply {
    reply: String,
}

#[derive(serde::Deserialize, Debug)]
struct TranscriptionReply {
    text: String,
}

#[derive(serde::Deserialize, Debug)]
struct PestReport {
    pest_name: String,
    confidence: String,
    description: String,
    severity: String,
    #[serde(default)]
    organic_treatments: Vec<String>,
    #[serde(default)]
    chemical_treatments: Vec<String>,
    #[serde(default)]
    prevention_tips: Vec<String>,
}

impl PestReport {
    pub fn to_message(&self) -> String {
        let mut msg = format!(
            "{} (confidence: {}, severity: {})\n{}",
            self.pest_name, self.confidence, self.severity, self.description
        );
        for (title, items) in [
            ("Organic treatments", &self.organic_treatments),
            ("Chemical treatments", &self.chemical_treatments),
            ("Prevention tips", &self.prevention_tips),
        ] {
            if items.is_empty() {
                continue;
            }
            msg.push_str(&format!("\n{title}:"));
            for item in items {
                msg.push_str(&format!("\n  - {item}"));
            }
        }
        tracing::debug!("Message: {}", msg);
        msg
    }
}

/// Pulls the relay's human-readable message out of an error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .or_else(|| value.get("reply"))
                .and_then(|m| m.as_str())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

struct HttpClient {
    client: reqwest::Client,
    base_url: String,
}
impl Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpClient {
    fn new(address: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("http://{}", address.trim_end_matches('/')),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn read<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("relay answered {}: {}", status, error_message(&body));
        }
        Ok(response.json().await?)
    }

    async fn health(&self) -> Result<serde_json::Value> {
        let response = self.client.get(self.url("health")).send().await?;
        Self::read(response).await
    }

    async fn chat(&self, message: &str, language: Option<&str>) -> Result<ChatReply> {
        let body = serde_json::json!({"message": message, "language": language});
        let response = self.client.post(self.url("chat")).json(&body).send().await?;
        Self::read(response).await
    }

    async fn upload<T: serde::de::DeserializeOwned>(
        &self,
        route: &str,
        path: &Path,
        language: Option<&str>,
    ) -> Result<T> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let mut form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        if let Some(language) = language {
            form = form.text("language", language.to_string());
        }

        let response = self
            .client
            .post(self.url(route))
            .multipart(form)
            .send()
            .await?;
        Self::read(response).await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    tracing::info!("Sending to relay on [{:?}]", args.relay_address);

    let client = HttpClient::new(&args.relay_address);
    let output = run(&client, args.command).await?;
    println!("{output}");
    Ok(())
}

#[instrument(skip_all, fields(command = ?command))]
async fn run(client: &HttpClient, command: Command) -> Result<String> {
    let output = match command {
        Command::Health => client.health().await?.to_string(),
        Command::Chat { message, language } => {
            client.chat(&message, language.as_deref()).await?.reply
        }
        Command::Transcribe { path, language } => {
            let reply: TranscriptionReply = client
                .upload("transcribe", &path, language.as_deref())
                .await?;
            reply.text
        }
        Command::DetectPest { path } => {
            let report: PestReport = client.upload("detect_pest", &path, None).await?;
            report.to_message()
        }
    };
    tracing::info!("SUCCESS");
    Ok(output)
}
