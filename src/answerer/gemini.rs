use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::consts::DEFAULT_MODEL;

use super::{Answerer, Reply, TokenUsage};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// An answerer that calls the Gemini `generateContent` endpoint.
pub struct GeminiAnswerer {
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiAnswerer {
    pub fn new(model: Option<String>, api_key: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{API_BASE}/{}:generateContent", self.model)
    }

    fn build_request(question: &str) -> ApiRequest<'_> {
        ApiRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: question }],
            }],
        }
    }

    /// Pull the answer text and usage out of a decoded response.
    fn parse_response(resp: ApiResponse) -> Result<Reply> {
        if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
            bail!("prompt blocked by Gemini: {reason}");
        }

        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .context("Gemini returned no candidates")?;

        let text: String = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        let text = text.trim();

        if text.is_empty() {
            match candidate.finish_reason {
                Some(reason) => bail!("Gemini returned empty response (finish reason: {reason})"),
                None => bail!("Gemini returned empty response"),
            }
        }

        let usage = resp.usage_metadata.map(|u| TokenUsage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        });

        Ok(Reply {
            text: text.to_string(),
            usage,
        })
    }

    /// Best-effort extraction of the message from an error body.
    fn error_message(body: &str) -> String {
        serde_json::from_str::<ApiErrorBody>(body)
            .map(|b| b.error.message)
            .unwrap_or_else(|_| body.trim().to_string())
    }
}

#[async_trait]
impl Answerer for GeminiAnswerer {
    async fn answer(&self, question: &str) -> Result<Reply> {
        let body = Self::build_request(question);

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .context("request to Gemini failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("Gemini API error ({}): {}", status, Self::error_message(&text));
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .context("failed to decode Gemini response")?;
        let reply = Self::parse_response(api_resp)?;

        if let Some(usage) = reply.usage {
            debug!(
                input = usage.input_tokens,
                output = usage.output_tokens,
                "token usage"
            );
        }

        Ok(reply)
    }
}

// --- API types ---

#[derive(Serialize)]
struct ApiRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}
