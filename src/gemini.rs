use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::constants;

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("request to Gemini API failed: {0}")]
    Request(reqwest::Error),
    #[error("Gemini API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to parse Gemini API response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Gemini API response contained no text")]
    EmptyResponse,
}

// Structures matching the generateContent endpoint
#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug)]
struct CandidatePart {
    text: Option<String>,
}

// The request URL carries the API key, so it never goes into the error text.
fn request_error(err: reqwest::Error) -> GeminiError {
    GeminiError::Request(err.without_url())
}

/// Builds the fixed nutrition prompt for `dish`.
pub fn nutrition_prompt(dish: &str) -> String {
    format!(
        "{}の栄養成分（エネルギー、たんぱく質、脂質、糖質、カリウム）を具体的な数値で教えてください。単位もつけてください。",
        dish
    )
}

/// Thin client over the Gemini `generateContent` REST call.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    /// Client configured from `GEMINI_API_URL` / `GEMINI_MODEL`.
    pub fn from_env() -> Self {
        Self::new(constants::GEMINI_API_URL.as_str(), constants::GEMINI_MODEL.as_str())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Asks the model for a nutrition description of `dish` and returns its raw text.
    #[instrument(skip(self, api_key), fields(model = %self.model))]
    pub async fn describe_dish(&self, dish: &str, api_key: &str) -> Result<String, GeminiError> {
        let prompt = nutrition_prompt(dish);
        self.generate(&prompt, api_key).await
    }

    async fn generate(&self, prompt: &str, api_key: &str) -> Result<String, GeminiError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        debug!(%url, "sending generateContent request");

        let payload = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&payload)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let body = response.text().await.map_err(request_error)?;
        if !status.is_success() {
            error!(%status, %body, "Gemini API request failed");
            return Err(GeminiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GeminiError::EmptyResponse);
        }
        debug!(chars = text.chars().count(), "received Gemini response");
        Ok(text)
    }
}
