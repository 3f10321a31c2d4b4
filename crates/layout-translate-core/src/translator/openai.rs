use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

use super::traits::{Translator, TranslatorInfo};
use crate::config::Lang;
use crate::error::{Error, Result};
use crate::fragment::{PageContext, TextFragment};

/// Default number of retry attempts
pub const DEFAULT_RETRY_COUNT: u32 = 3;
/// Default delay between retries in milliseconds
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Layout-preservation contract sent with every request. The markers must
/// pass through the translation unmodified and in position.
const LAYOUT_INSTRUCTIONS: &str = "Translate text while preserving:\n\
    1. Layout markers: {HEADING}, {TABLE}, {LIST}\n\
    2. Formatting tags: <b>, <i>, <u>\n\
    3. Structural elements: ---SECTION---, ***COLUMN***\n\
    Maintain exact character count when possible.\n\
    Output only the translation, no explanations.";

/// OpenAI-compatible API translator
/// Works with: llama.cpp server, Ollama, DeepSeek, OpenAI, etc.
pub struct OpenAiTranslator {
    client: Client,
    /// Base URL for the API (e.g., "http://localhost:8080/v1")
    pub api_base: String,
    /// Optional API key for authentication
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Number of retry attempts
    pub retry_count: u32,
    /// Delay between retries in milliseconds
    pub retry_delay_ms: u64,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OpenAiTranslator {
    /// Create a new OpenAI translator with all options.
    ///
    /// # Panics
    /// Panics if the HTTP client cannot be created, which should only happen
    /// in extreme circumstances (e.g., TLS backend unavailable on the system).
    #[allow(clippy::expect_used)]
    pub fn new(
        api_base: String,
        api_key: Option<String>,
        model: String,
        retry_count: u32,
        retry_delay_ms: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_base,
            api_key,
            model,
            retry_count,
            retry_delay_ms,
        }
    }

    /// Create a new OpenAI translator with default retry settings.
    pub fn with_defaults(api_base: String, api_key: Option<String>, model: String) -> Self {
        Self::new(
            api_base,
            api_key,
            model,
            DEFAULT_RETRY_COUNT,
            DEFAULT_RETRY_DELAY_MS,
        )
    }

    /// Build the translation prompt for one fragment.
    ///
    /// Embeds the fragment's typography and position plus the trailing
    /// window of already-processed page text, so the service can keep
    /// terminology and phrasing coherent across fragments.
    fn create_prompt(fragment: &TextFragment, ctx: &PageContext, target: &Lang) -> String {
        let bbox = &fragment.bbox;
        format!(
            "{LAYOUT_INSTRUCTIONS}\n\n\
             Translate this text to {} preserving layout markers:\n{}\n\n\
             Context:\n\
             - Current font: {}\n\
             - Block type: {}\n\
             - Position: ({:.1}, {:.1}, {:.1}, {:.1})\n\
             - Page size: {:.0}x{:.0}\n\
             - Previous text: {}",
            target.display_name(),
            fragment.text,
            fragment.font,
            fragment.block_type,
            bbox.x0,
            bbox.y0,
            bbox.x1,
            bbox.y1,
            ctx.page_size.0,
            ctx.page_size.1,
            fragment.prev_text,
        )
    }

    /// Make API request with retry logic
    async fn request_with_retry(&self, prompt: String) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt,
            }],
            temperature: Some(0.3), // Lower temperature for more consistent translations
            max_tokens: None,
        };

        let mut last_error = None;

        for attempt in 0..self.retry_count {
            debug!(
                "Translation request attempt {}/{} to {}",
                attempt + 1,
                self.retry_count,
                url
            );

            let mut req = self.client.post(&url).json(&request);

            // Add API key if configured
            if let Some(ref key) = self.api_key {
                req = req.header("Authorization", format!("Bearer {key}"));
            }

            match req.send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        match response.json::<ChatResponse>().await {
                            Ok(chat_response) => {
                                if let Some(choice) = chat_response.choices.first() {
                                    let translated = choice.message.content.trim();
                                    // Remove quotes if the model wrapped the response
                                    let translated = translated
                                        .trim_start_matches('"')
                                        .trim_end_matches('"')
                                        .to_string();
                                    return Ok(translated);
                                }
                                last_error = Some(Error::TranslationInvalidResponse(
                                    "No choices in response".to_string(),
                                ));
                            }
                            Err(e) => {
                                warn!("Failed to parse response: {}", e);
                                last_error = Some(Error::TranslationInvalidResponse(e.to_string()));
                            }
                        }
                    } else if response.status().as_u16() == 429 {
                        // Rate limited
                        let retry_after = response
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse().ok());

                        warn!("Rate limited, retry after {:?}s", retry_after);
                        last_error = Some(Error::TranslationRateLimited { retry_after });

                        // Wait longer on rate limit
                        let wait_time = retry_after.unwrap_or(5) * 1000;
                        tokio::time::sleep(Duration::from_millis(wait_time)).await;
                        continue;
                    } else {
                        let status = response.status();
                        let body = response.text().await.unwrap_or_default();
                        warn!("API error: {} - {}", status, body);
                        last_error =
                            Some(Error::TranslationRequest(format!("HTTP {status}: {body}")));
                    }
                }
                Err(e) => {
                    warn!("Request failed: {}", e);
                    if e.is_timeout() {
                        last_error = Some(Error::TranslationTimeout);
                    } else {
                        last_error = Some(Error::TranslationRequest(e.to_string()));
                    }
                }
            }

            // Wait before retry
            if attempt < self.retry_count - 1 {
                tokio::time::sleep(Duration::from_millis(self.retry_delay_ms)).await;
            }
        }

        error!("Translation failed after {} attempts", self.retry_count);
        Err(last_error.unwrap_or(Error::TranslationMaxRetriesExceeded))
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "OpenAI Compatible",
            requires_api_key: false, // Optional for local servers
        }
    }

    async fn translate_fragment(
        &self,
        fragment: &TextFragment,
        ctx: &PageContext,
        target: &Lang,
    ) -> Result<String> {
        // Nothing to translate
        if fragment.text.trim().is_empty() {
            return Ok(fragment.text.clone());
        }

        let prompt = Self::create_prompt(fragment, ctx, target);
        self.request_with_retry(prompt).await
    }

    fn is_available(&self) -> bool {
        // For local servers, we don't require an API key
        true
    }
}
