//! Backend dispatch: prompt framing, the offline stub, and the live Vertex AI call.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::Args;

pub const OFFLINE_PREFIX: &str = "[offline-mode] Echoing intent for: ";
const OFFLINE_ECHO_CHARS: usize = 120;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("backend task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("backend response is {0} characters, over the limit")]
    ResponseTooLong(usize),
}

/// A text-generation capability. Returns the raw prediction payload.
#[async_trait]
pub trait TextBackend: Send + Sync {
    async fn predict(&self, prompt: &str) -> Result<Value, DispatchError>;
}

// Vertex AI publisher model `:predict` over REST
pub struct VertexBackend {
    client: reqwest::Client,
    url: String,
    access_token: String,
}

impl VertexBackend {
    pub fn new(
        project: &str,
        location: &str,
        model: &str,
        endpoint: Option<&str>,
        access_token: &str,
    ) -> Result<Self, DispatchError> {
        let base = match endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{location}-aiplatform.googleapis.com"),
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            url: format!(
                "{base}/v1/projects/{project}/locations/{location}/publishers/google/models/{model}:predict"
            ),
            access_token: access_token.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TextBackend for VertexBackend {
    async fn predict(&self, prompt: &str) -> Result<Value, DispatchError> {
        let res = self
            .client
            .post(&self.url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "instances": [{ "prompt": prompt }] }))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(DispatchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(res.json::<Value>().await?)
    }
}

/// Pull the generated text out of a prediction payload.
///
/// Looks for a top-level `text` string, then Vertex's `predictions[0].content`,
/// and otherwise renders the whole payload.
pub fn prediction_text(prediction: Value) -> String {
    if let Some(text) = prediction.get("text").and_then(Value::as_str) {
        return text.to_string();
    }
    if let Some(content) = prediction
        .pointer("/predictions/0/content")
        .and_then(Value::as_str)
    {
        return content.to_string();
    }
    match prediction {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

// Frame the user prompt with optional context, both trimmed
pub fn compose_prompt(prompt: &str, context: Option<&str>) -> String {
    let prompt = prompt.trim();
    match context {
        Some(context) if !context.is_empty() => {
            format!("{}\n\nUser: {}\nAssistant:", context.trim(), prompt)
        }
        _ => prompt.to_string(),
    }
}

pub fn offline_stub(prompt: &str) -> String {
    if prompt.chars().count() > OFFLINE_ECHO_CHARS {
        let head: String = prompt.chars().take(OFFLINE_ECHO_CHARS).collect();
        format!("{OFFLINE_PREFIX}{head}...")
    } else {
        format!("{OFFLINE_PREFIX}{prompt}")
    }
}

/// Wraps the text backend. Offline is decided once, at construction.
pub struct Dispatcher {
    model: String,
    backend: Option<Arc<dyn TextBackend>>,
}

impl Dispatcher {
    pub fn offline(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            backend: None,
        }
    }

    pub fn with_backend(model: impl Into<String>, backend: Arc<dyn TextBackend>) -> Self {
        Self {
            model: model.into(),
            backend: Some(backend),
        }
    }

    // Build from config, degrading to offline if the live backend can't be set up
    pub fn from_config(args: &Args) -> Self {
        if args.offline_mode {
            tracing::info!(model = %args.vertex_model, "offline mode requested");
            return Self::offline(&args.vertex_model);
        }

        let Some(project) = args.gcp_project.as_deref().filter(|p| !p.is_empty()) else {
            tracing::warn!("GCP project not configured; using offline fallback");
            return Self::offline(&args.vertex_model);
        };
        let Some(token) = args.vertex_access_token.as_deref().filter(|t| !t.is_empty()) else {
            tracing::warn!("Vertex AI access token not configured; using offline fallback");
            return Self::offline(&args.vertex_model);
        };

        match VertexBackend::new(
            project,
            &args.gcp_location,
            &args.vertex_model,
            args.vertex_endpoint.as_deref().filter(|e| !e.is_empty()),
            token,
        ) {
            Ok(backend) => {
                tracing::info!(model = %args.vertex_model, url = backend.url(), "Vertex AI client initialised");
                Self::with_backend(&args.vertex_model, Arc::new(backend))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Vertex AI client unavailable; using offline fallback");
                Self::offline(&args.vertex_model)
            }
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn offline_mode(&self) -> bool {
        self.backend.is_none()
    }

    pub async fn generate_response(
        &self,
        prompt: &str,
        context: Option<&str>,
    ) -> Result<String, DispatchError> {
        let prompt = compose_prompt(prompt, context);

        let Some(backend) = &self.backend else {
            return Ok(offline_stub(&prompt));
        };

        // own task, so a hung backend only stalls the request awaiting it
        let backend = Arc::clone(backend);
        let prediction = tokio::spawn(async move { backend.predict(&prompt).await }).await??;

        Ok(prediction_text(prediction))
    }
}
