use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::GenerativeProvider;
use crate::error::ProviderError;

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(endpoint: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text parts of the first candidate, joined and trimmed.
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

impl GenerativeProvider for GeminiProvider {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, model);
        let req = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };
        debug!(%url, prompt_chars = prompt.chars().count(), "gemini request");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let parsed: GenerateResponse = resp.json()?;
        parsed
            .into_text()
            .ok_or_else(|| ProviderError::Response("empty candidate".to_string()))
    }
}
