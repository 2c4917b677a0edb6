use std::collections::HashSet;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::config::Category;
use crate::models::{CategoryAssignment, TransactionView};

const API_BASE: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

const PROMPT_TEMPLATE: &str = "Assign each transaction to exactly ONE category from the list.

AVAILABLE CATEGORIES:
{categories}

TRANSACTIONS TO CATEGORIZE:
{transactions}

Guidelines:
- Use the description, amount, and account context. Credit card transactions are never income, even refunds.
- Negative amounts on card accounts are usually refunds; categorize them by merchant, not as income.
- Prefer the most specific applicable category; use the general-purpose category only as a last resort.
- Score each assignment with a confidence between 0 and 1.

Respond with ONLY a JSON array, one object per transaction:
[{\"transaction_id\": \"...\", \"category\": \"...\", \"confidence\": 0.9}]

Every category value MUST be one of the available category names, verbatim. Categorize every transaction.";

/// Tagged failure modes of the categorization service. The batcher treats
/// rate limiting differently from everything else.
#[derive(Error, Debug)]
pub enum CategorizeError {
    #[error("categorization service rate limited: {0}")]
    RateLimited(String),

    #[error("categorization failed: {0}")]
    Failed(String),
}

/// Categorization seam consumed by the batching engine.
pub trait CategorizeBatch {
    fn categorize_batch(
        &self,
        batch: &[TransactionView],
    ) -> std::result::Result<Vec<CategoryAssignment>, CategorizeError>;
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Blocking client for the Anthropic messages API.
pub struct ClaudeClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    categories: Vec<Category>,
    valid_names: HashSet<String>,
}

impl ClaudeClient {
    pub fn new(api_key: String, model: String, categories: Vec<Category>) -> Self {
        Self::with_base_url(api_key, model, categories, API_BASE.to_string())
    }

    fn with_base_url(
        api_key: String,
        model: String,
        categories: Vec<Category>,
        base_url: String,
    ) -> Self {
        let valid_names = categories.iter().map(|c| c.name.clone()).collect();
        Self {
            http: Client::new(),
            base_url,
            api_key,
            model,
            categories,
            valid_names,
        }
    }

    fn build_prompt(&self, batch: &[TransactionView]) -> String {
        let categories = self
            .categories
            .iter()
            .map(|c| format!("{}: {}", c.name, c.description))
            .collect::<Vec<_>>()
            .join("\n");
        let transactions =
            serde_json::to_string_pretty(batch).unwrap_or_else(|_| "[]".to_string());
        PROMPT_TEMPLATE
            .replace("{categories}", &categories)
            .replace("{transactions}", &transactions)
    }

    /// Keep only assignments naming a configured category with an in-range
    /// confidence; anything else stays uncategorized for the next run.
    fn validate(&self, parsed: Vec<CategoryAssignment>) -> Vec<CategoryAssignment> {
        parsed
            .into_iter()
            .filter(|a| {
                if !self.valid_names.contains(&a.category) {
                    log::warn!(
                        "dropping invalid category '{}' for {}",
                        a.category,
                        a.transaction_id
                    );
                    return false;
                }
                if !(0.0..=1.0).contains(&a.confidence) {
                    log::warn!(
                        "dropping out-of-range confidence {} for {}",
                        a.confidence,
                        a.transaction_id
                    );
                    return false;
                }
                true
            })
            .collect()
    }
}

/// Model responses sometimes arrive fenced in markdown; strip that before
/// parsing.
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

fn is_rate_limit_body(body: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["type"].as_str().map(|t| t == "rate_limit_error"))
        .unwrap_or(false)
}

impl CategorizeBatch for ClaudeClient {
    fn categorize_batch(
        &self,
        batch: &[TransactionView],
    ) -> std::result::Result<Vec<CategoryAssignment>, CategorizeError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [{ "role": "user", "content": self.build_prompt(batch) }],
        });

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .map_err(|e| CategorizeError::Failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS || is_rate_limit_body(&body) {
                return Err(CategorizeError::RateLimited(format!(
                    "HTTP {}",
                    status.as_u16()
                )));
            }
            return Err(CategorizeError::Failed(format!(
                "HTTP {}: {body}",
                status.as_u16()
            )));
        }

        let message: MessagesResponse = response
            .json()
            .map_err(|e| CategorizeError::Failed(format!("invalid response: {e}")))?;
        let text = message
            .content
            .iter()
            .find(|b| b.kind == "text")
            .map(|b| b.text.as_str())
            .ok_or_else(|| CategorizeError::Failed("response has no text content".to_string()))?;

        let parsed: Vec<CategoryAssignment> = serde_json::from_str(extract_json(text))
            .map_err(|e| CategorizeError::Failed(format!("unparseable assignments: {e}")))?;

        Ok(self.validate(parsed))
    }
}
