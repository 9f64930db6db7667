use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Locales the archive publishes text in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Zh,
    Th,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::En, Locale::Zh, Locale::Th];

    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Zh => "zh",
            Locale::Th => "th",
        }
    }

    pub fn english_name(&self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Zh => "Simplified Chinese",
            Locale::Th => "Thai",
        }
    }

    /// Best-effort script detection: Thai block, then CJK ideographs, else English.
    pub fn detect(text: &str) -> Locale {
        if text.chars().any(|c| ('\u{0E00}'..='\u{0E7F}').contains(&c)) {
            Locale::Th
        } else if text.chars().any(|c| {
            ('\u{4E00}'..='\u{9FFF}').contains(&c) || ('\u{3400}'..='\u{4DBF}').contains(&c)
        }) {
            Locale::Zh
        } else {
            Locale::En
        }
    }
}

impl Display for Locale {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "zh" => Ok(Locale::Zh),
            "th" => Ok(Locale::Th),
            other => Err(anyhow::anyhow!("Unsupported locale: {}", other)),
        }
    }
}

/// One string per supported locale. Every locale is always present, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LocalizedText {
    #[serde(default)]
    pub en: String,
    #[serde(default)]
    pub zh: String,
    #[serde(default)]
    pub th: String,
}

impl LocalizedText {
    /// Record holding `text` under `locale` and empty strings elsewhere.
    pub fn from_source(locale: Locale, text: &str) -> Self {
        let mut localized = Self::default();
        localized.set(locale, text.to_string());
        localized
    }

    pub fn get(&self, locale: Locale) -> &str {
        match locale {
            Locale::En => &self.en,
            Locale::Zh => &self.zh,
            Locale::Th => &self.th,
        }
    }

    pub fn set(&mut self, locale: Locale, value: String) {
        match locale {
            Locale::En => self.en = value,
            Locale::Zh => self.zh = value,
            Locale::Th => self.th = value,
        }
    }

    pub fn is_empty(&self) -> bool {
        Locale::ALL.iter().all(|l| self.get(*l).trim().is_empty())
    }
}

/// Per-asset translation progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TranslationStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Skipped,
}

impl TranslationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationStatus::Pending => "pending",
            TranslationStatus::Completed => "completed",
            TranslationStatus::Failed => "failed",
            TranslationStatus::Skipped => "skipped",
        }
    }

    /// Whether enrichment has finished one way or another.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, TranslationStatus::Pending)
    }
}

impl Display for TranslationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TranslationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TranslationStatus::Pending),
            "completed" => Ok(TranslationStatus::Completed),
            "failed" => Ok(TranslationStatus::Failed),
            "skipped" => Ok(TranslationStatus::Skipped),
            other => Err(anyhow::anyhow!("Invalid translation status: {}", other)),
        }
    }
}

/// Translation sub-record of an asset. Only the enrichment worker writes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRecord {
    pub title_by_locale: LocalizedText,
    pub description_by_locale: LocalizedText,
    pub model: Option<String>,
    pub error: Option<String>,
}
