//! Machine translation of titles and descriptions into every published locale.

mod extract;
mod openrouter;

use archiva_core::{AppError, Locale, LocalizedText};
use async_trait::async_trait;

pub use extract::{extract_json_object, ExtractionError};
pub use openrouter::OpenRouterTranslator;

#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("translation request failed: {0}")]
    Request(String),

    #[error("translation API responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("translation API returned no content")]
    EmptyResponse,

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

impl From<TranslationError> for AppError {
    fn from(err: TranslationError) -> Self {
        AppError::Translation(err.to_string())
    }
}

/// Which asset field the text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Title,
    Description,
}

impl TextField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextField::Title => "title",
            TextField::Description => "description",
        }
    }
}

/// Hints passed along with the text.
#[derive(Debug, Clone)]
pub struct TranslationContext {
    pub platform: String,
    pub field: TextField,
    pub source_locale: Locale,
}

impl TranslationContext {
    /// Context for `text`, with its locale detected from the script.
    pub fn for_text(platform: impl Into<String>, field: TextField, text: &str) -> Self {
        Self {
            platform: platform.into(),
            field,
            source_locale: Locale::detect(text),
        }
    }
}

#[async_trait]
pub trait Translator: Send + Sync {
    /// Model identifier recorded on the asset.
    fn model(&self) -> &str;

    /// Translate `text` into `targets`.
    ///
    /// The result always carries every locale: the source text stays in its own
    /// locale when the model leaves it out, anything else missing is empty.
    async fn translate(
        &self,
        text: &str,
        targets: &[Locale],
        context: &TranslationContext,
    ) -> Result<LocalizedText, TranslationError>;
}
