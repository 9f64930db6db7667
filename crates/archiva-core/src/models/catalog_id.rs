//! Catalog identifiers
//!
//! Current grammar: `PREFIX-CATEGORY-YYYYMMDD-NNN`, for example `LMSY-MAG-20241023-001`.
//! Legacy grammar: `PREFIX-CATEGORY-YYYY-NNN`, accepted on read and migrated on write.
//!
//! Sequence `000` is reserved for the cover of a multi-asset collection; members
//! start at `001`.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MAX_SEQUENCE: u16 = 999;
pub const COVER_SEQUENCE: u16 = 0;
pub const FIRST_MEMBER_SEQUENCE: u16 = 1;

/// Default category when the caller supplies none (general gallery).
pub const DEFAULT_CATEGORY: &str = "G";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogIdError {
    #[error("malformed catalog id '{0}'")]
    Malformed(String),

    #[error("invalid prefix '{0}': expected uppercase letters")]
    InvalidPrefix(String),

    #[error("invalid category '{0}': expected uppercase letters")]
    InvalidCategory(String),

    #[error("invalid date '{0}' in catalog id")]
    InvalidDate(String),

    #[error("sequence {0} is outside 000-999")]
    SequenceOutOfRange(u32),
}

/// Position of an asset within its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CatalogRole {
    Cover,
    #[default]
    Member,
}

fn is_upper_alpha(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_uppercase())
}

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.chars().all(|c| c.is_ascii_digit())
}

fn check_prefix(prefix: &str) -> Result<(), CatalogIdError> {
    if is_upper_alpha(prefix) {
        Ok(())
    } else {
        Err(CatalogIdError::InvalidPrefix(prefix.to_string()))
    }
}

fn check_category(category: &str) -> Result<(), CatalogIdError> {
    if is_upper_alpha(category) {
        Ok(())
    } else {
        Err(CatalogIdError::InvalidCategory(category.to_string()))
    }
}

fn check_sequence(sequence: u32) -> Result<u16, CatalogIdError> {
    u16::try_from(sequence)
        .ok()
        .filter(|s| *s <= MAX_SEQUENCE)
        .ok_or(CatalogIdError::SequenceOutOfRange(sequence))
}

/// Resolve a caller-supplied category into its code.
///
/// Accepts either an uppercase code (`MAG`) or a collection kind
/// (`editorial`, `series`, ...). `None` or blank yields [`DEFAULT_CATEGORY`].
pub fn resolve_category(input: Option<&str>) -> Result<String, CatalogIdError> {
    let raw = match input.map(str::trim) {
        None | Some("") => return Ok(DEFAULT_CATEGORY.to_string()),
        Some(raw) => raw,
    };

    let mapped = match raw.to_lowercase().as_str() {
        "series" => Some("STILL"),
        "editorial" | "magazine" => Some("MAG"),
        "appearance" => Some("STAGE"),
        "journal" => Some("JRN"),
        "commercial" => Some("AD"),
        "gallery" => Some("G"),
        _ => None,
    };

    let code = mapped.map(str::to_string).unwrap_or_else(|| raw.to_uppercase());
    check_category(&code)?;
    Ok(code)
}

/// Catalog identifier in the current grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CatalogId {
    prefix: String,
    category: String,
    date: NaiveDate,
    sequence: u16,
}

impl CatalogId {
    pub fn new(
        prefix: impl Into<String>,
        category: impl Into<String>,
        date: NaiveDate,
        sequence: u32,
    ) -> Result<Self, CatalogIdError> {
        let prefix = prefix.into();
        let category = category.into();
        check_prefix(&prefix)?;
        check_category(&category)?;
        let sequence = check_sequence(sequence)?;
        Ok(Self {
            prefix,
            category,
            date,
            sequence,
        })
    }

    /// Parse the current grammar only. Use [`parse_any`] to also accept legacy ids.
    pub fn parse(raw: &str) -> Result<Self, CatalogIdError> {
        let parts: Vec<&str> = raw.split('-').collect();
        let [prefix, category, date, sequence] = parts.as_slice() else {
            return Err(CatalogIdError::Malformed(raw.to_string()));
        };
        if !is_digits(date, 8) || !is_digits(sequence, 3) {
            return Err(CatalogIdError::Malformed(raw.to_string()));
        }
        let date = NaiveDate::parse_from_str(date, "%Y%m%d")
            .map_err(|_| CatalogIdError::InvalidDate((*date).to_string()))?;
        let sequence = sequence
            .parse::<u32>()
            .map_err(|_| CatalogIdError::Malformed(raw.to_string()))?;
        Self::new(*prefix, *category, date, sequence)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn is_cover(&self) -> bool {
        self.sequence == COVER_SEQUENCE
    }

    /// `YYYYMMDD`
    pub fn compact_date(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }

    /// Rendered prefix shared by every id in the `(category, date)` scope,
    /// e.g. `LMSY-MAG-20241023-`.
    pub fn scope_key(prefix: &str, category: &str, date: NaiveDate) -> String {
        format!("{}-{}-{}-", prefix, category, date.format("%Y%m%d"))
    }
}

impl Display for CatalogId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{:03}",
            self.prefix,
            self.category,
            self.compact_date(),
            self.sequence
        )
    }
}

impl FromStr for CatalogId {
    type Err = CatalogIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CatalogId::parse(s)
    }
}

impl TryFrom<String> for CatalogId {
    type Error = CatalogIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CatalogId::parse(&value)
    }
}

impl From<CatalogId> for String {
    fn from(id: CatalogId) -> Self {
        id.to_string()
    }
}

/// Identifier in the year-only grammar `PREFIX-CATEGORY-YYYY-NNN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyCatalogId {
    prefix: String,
    category: String,
    year: i32,
    sequence: u16,
}

impl LegacyCatalogId {
    pub fn parse(raw: &str) -> Result<Self, CatalogIdError> {
        let parts: Vec<&str> = raw.split('-').collect();
        let [prefix, category, year, sequence] = parts.as_slice() else {
            return Err(CatalogIdError::Malformed(raw.to_string()));
        };
        if !is_digits(year, 4) || !is_digits(sequence, 3) {
            return Err(CatalogIdError::Malformed(raw.to_string()));
        }
        check_prefix(prefix)?;
        check_category(category)?;
        let year = year
            .parse::<i32>()
            .map_err(|_| CatalogIdError::Malformed(raw.to_string()))?;
        let sequence = sequence
            .parse::<u32>()
            .map_err(|_| CatalogIdError::Malformed(raw.to_string()))
            .and_then(check_sequence)?;
        Ok(Self {
            prefix: (*prefix).to_string(),
            category: (*category).to_string(),
            year,
            sequence,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Rewrite into the current grammar, keeping prefix and sequence.
    ///
    /// The legacy editorial code `ED` becomes `MAG`. `date` is the best available
    /// signal for the record (event date, else creation date).
    pub fn migrate(&self, date: NaiveDate) -> CatalogId {
        let category = if self.category == "ED" {
            "MAG".to_string()
        } else {
            self.category.clone()
        };
        CatalogId {
            prefix: self.prefix.clone(),
            category,
            date,
            sequence: self.sequence,
        }
    }
}

impl Display for LegacyCatalogId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{:04}-{:03}",
            self.prefix, self.category, self.year, self.sequence
        )
    }
}

/// Either grammar, as found in stored records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCatalogId {
    Current(CatalogId),
    Legacy(LegacyCatalogId),
}

impl ParsedCatalogId {
    pub fn category(&self) -> &str {
        match self {
            ParsedCatalogId::Current(id) => id.category(),
            ParsedCatalogId::Legacy(id) => id.category(),
        }
    }

    pub fn sequence(&self) -> u16 {
        match self {
            ParsedCatalogId::Current(id) => id.sequence(),
            ParsedCatalogId::Legacy(id) => id.sequence(),
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, ParsedCatalogId::Legacy(_))
    }
}

/// Parse either grammar.
pub fn parse_any(raw: &str) -> Result<ParsedCatalogId, CatalogIdError> {
    match CatalogId::parse(raw) {
        Ok(id) => Ok(ParsedCatalogId::Current(id)),
        Err(current_err) => match LegacyCatalogId::parse(raw) {
            Ok(legacy) => Ok(ParsedCatalogId::Legacy(legacy)),
            Err(_) => Err(current_err),
        },
    }
}
