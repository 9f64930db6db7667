//! OpenRouter chat-completions client.

use std::time::Duration;

use archiva_core::{Locale, LocalizedText};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::extract::{extract_json_object, localized_from_object};
use super::{TranslationContext, TranslationError, Translator};

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 1000;

#[derive(Clone)]
pub struct OpenRouterTranslator {
    api_key: String,
    api_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenRouterTranslator {
    pub fn new(
        api_key: impl Into<String>,
        api_url: impl Into<String>,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, TranslationError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TranslationError::Request(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            api_key: api_key.into(),
            api_url: api_url.into(),
            model: model.into(),
            client,
        })
    }

    fn build_prompt(text: &str, targets: &[Locale], context: &TranslationContext) -> String {
        let languages = targets
            .iter()
            .map(|l| format!("{} ({})", l.english_name(), l.code()))
            .collect::<Vec<_>>()
            .join(", ");
        let keys = targets
            .iter()
            .map(|l| format!("  \"{}\": \"...\"", l.code()))
            .collect::<Vec<_>>()
            .join(",\n");

        format!(
            "You translate captions for a fan archive of magazine and event photography.\n\
             Keep names as written, keep the tone warm and concise.\n\n\
             Context:\n\
             - Source platform: {platform}\n\
             - Content type: {field}\n\
             - Original language: {source}\n\n\
             Translate the following text to: {languages}\n\n\
             INPUT TEXT:\n\"\"\"{text}\"\"\"\n\n\
             Respond with ONLY a JSON object of this shape, no markdown:\n{{\n{keys}\n}}\n\
             If the input is already in a target language, return it unchanged for that key.",
            platform = context.platform,
            field = context.field.as_str(),
            source = context.source_locale.code(),
        )
    }

    async fn complete(&self, prompt: String) -> Result<String, TranslationError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslationError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::Status { status, body });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::Request(format!("Failed to parse response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(TranslationError::EmptyResponse)
    }
}

#[async_trait]
impl Translator for OpenRouterTranslator {
    fn model(&self) -> &str {
        &self.model
    }

    #[tracing::instrument(skip(self, text, context), fields(model = %self.model, field = context.field.as_str(), text_len = text.len()))]
    async fn translate(
        &self,
        text: &str,
        targets: &[Locale],
        context: &TranslationContext,
    ) -> Result<LocalizedText, TranslationError> {
        let start = std::time::Instant::now();
        let content = self
            .complete(Self::build_prompt(text, targets, context))
            .await?;
        let object = extract_json_object(&content)?;
        let localized = localized_from_object(&object, context.source_locale, text);

        tracing::debug!(
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Translation completed"
        );
        Ok(localized)
    }
}
