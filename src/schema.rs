//! Run data model
//!
//! Summaries, fetch outcomes and per-URL differences, plus the report
//! printed at the end of every run.

use crate::error::FetchError;
use serde::{Deserialize, Serialize};

/// Reduced view of a document, keyed by URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub url: String,
    /// Text of the first `<title>`
    pub title: String,
    /// `content` of the first `<meta name="description">`
    pub meta_description: String,
    /// Text of every h1-h6 in document order, joined with ", "
    pub headings: String,
}

impl PageSummary {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        meta_description: impl Into<String>,
        headings: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            meta_description: meta_description.into(),
            headings: headings.into(),
        }
    }
}

/// Outcome of fetching one URL through either path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub url: String,
    pub outcome: Result<String, FetchError>,
}

impl FetchResult {
    pub fn fetched(url: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            outcome: Ok(raw.into()),
        }
    }

    pub fn failed(url: impl Into<String>, error: FetchError) -> Self {
        Self {
            url: url.into(),
            outcome: Err(error),
        }
    }

    /// Raw markup, if the fetch succeeded
    pub fn raw_content(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.outcome.as_ref().err()
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Disagreement between the static and rendered summaries of one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difference {
    pub url: String,
    pub static_title: String,
    pub dynamic_title: String,
    pub static_meta_description: String,
    pub dynamic_meta_description: String,
    pub static_headings: String,
    pub dynamic_headings: String,
}

impl Difference {
    /// Names of the fields that disagree (static side non-empty)
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let pairs = [
            ("title", &self.static_title, &self.dynamic_title),
            (
                "meta_description",
                &self.static_meta_description,
                &self.dynamic_meta_description,
            ),
            ("headings", &self.static_headings, &self.dynamic_headings),
        ];

        pairs
            .into_iter()
            .filter(|(_, s, d)| !s.is_empty() && s != d)
            .map(|(name, _, _)| name)
            .collect()
    }
}

/// Machine-readable output of one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub static_data: Vec<PageSummary>,
    pub dynamic_data: Vec<PageSummary>,
    pub differences: Vec<Difference>,
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl RunReport {
    pub fn render(&self, format: OutputFormat) -> anyhow::Result<String> {
        Ok(match format {
            OutputFormat::Json => serde_json::to_string_pretty(self)?,
            OutputFormat::Yaml => serde_yaml::to_string(self)?,
        })
    }
}
