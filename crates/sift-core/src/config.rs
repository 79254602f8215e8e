//! Compiler and executor configuration.

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Default alias of the identifier column added for deferred collections.
pub const DEFAULT_IDENTIFIER_ALIAS: &str = "__sift_id";

/// Default page size when a page request does not name one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Default upper bound on page sizes.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 1000;

/// `chrono` format strings tried, in order, when a text token is read as a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateFormats {
    /// Formats carrying a time of day.
    pub date_time: Vec<String>,
    /// Formats carrying only a calendar date.
    pub date_only: Vec<String>,
}

impl Default for DateFormats {
    fn default() -> Self {
        Self {
            date_time: vec![
                "%Y-%m-%dT%H:%M:%S%.f".into(),
                "%Y-%m-%d %H:%M:%S%.f".into(),
                "%Y-%m-%dT%H:%M".into(),
                "%Y-%m-%d %H:%M".into(),
                "%d/%m/%Y %H:%M:%S".into(),
            ],
            date_only: vec!["%Y-%m-%d".into(), "%d/%m/%Y".into(), "%Y/%m/%d".into()],
        }
    }
}

/// Configuration for compiling and executing filter specifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Load selected to-many projections with a second query by default.
    pub collection_selection: bool,

    /// Alias of the identifier column added when collections are deferred.
    pub identifier_alias: String,

    /// Formats used to read dates from text tokens and template strings.
    pub date_formats: DateFormats,

    /// Page size used when a page request asks for zero elements.
    pub default_page_size: u32,

    /// Page sizes above this are clamped.
    pub max_page_size: u32,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            collection_selection: true,
            identifier_alias: DEFAULT_IDENTIFIER_ALIAS.to_string(),
            date_formats: DateFormats::default(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl CompilerConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from JSON; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set whether to-many projections are deferred by default.
    pub fn collection_selection(mut self, enabled: bool) -> Self {
        self.collection_selection = enabled;
        self
    }

    /// Set the alias of the forced identifier column.
    pub fn identifier_alias(mut self, alias: impl Into<String>) -> Self {
        self.identifier_alias = alias.into();
        self
    }

    /// Set the date formats.
    pub fn date_formats(mut self, formats: DateFormats) -> Self {
        self.date_formats = formats;
        self
    }

    /// Set the default page size.
    pub fn default_page_size(mut self, size: u32) -> Self {
        self.default_page_size = size;
        self
    }

    /// Set the maximum page size.
    pub fn max_page_size(mut self, size: u32) -> Self {
        self.max_page_size = size;
        self
    }

    /// Check the configuration for values that cannot work.
    pub fn validate(&self) -> Result<(), Error> {
        if self.identifier_alias.is_empty() || self.identifier_alias.contains('.') {
            return Err(Error::Config(format!(
                "identifier alias '{}' must be non-empty and contain no '.'",
                self.identifier_alias
            )));
        }
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(Error::Config("page sizes must be positive".into()));
        }
        if self.default_page_size > self.max_page_size {
            return Err(Error::Config(format!(
                "default page size {} exceeds maximum {}",
                self.default_page_size, self.max_page_size
            )));
        }
        Ok(())
    }

    /// Resolve a requested page size against the defaults and the maximum.
    pub fn page_size(&self, requested: u32) -> u32 {
        if requested == 0 {
            self.default_page_size.min(self.max_page_size)
        } else {
            requested.min(self.max_page_size)
        }
    }
}
