//! Summary extraction from raw markup
//!
//! Never fails: missing elements fall back to fixed placeholder values.

use crate::schema::{FetchResult, PageSummary};
use scraper::{Html, Selector};

pub const NO_TITLE: &str = "No Title";
pub const NO_META_DESCRIPTION: &str = "No Meta Description";
pub const FAILED_TO_PARSE: &str = "Failed to parse";

const HEADINGS: &str = "h1, h2, h3, h4, h5, h6";

/// Summarize `raw`; `None` or an empty document means there is no content
pub fn extract(url: &str, raw: Option<&str>) -> PageSummary {
    let Some(html) = raw.filter(|html| !html.is_empty()) else {
        return PageSummary::new(url, FAILED_TO_PARSE, "", "");
    };

    let doc = Html::parse_document(html);

    let title = select_text(&doc, "title").unwrap_or_else(|| NO_TITLE.to_string());
    let meta_description = select_attr(&doc, r#"meta[name="description"]"#, "content")
        .unwrap_or_else(|| NO_META_DESCRIPTION.to_string());
    let headings = extract_headings(&doc).join(", ");

    PageSummary {
        url: url.to_string(),
        title,
        meta_description,
        headings,
    }
}

/// Summarize a fetch outcome, failures included
pub fn summarize(result: &FetchResult) -> PageSummary {
    extract(&result.url, result.raw_content())
}

fn select_text(doc: &Html, sel: &str) -> Option<String> {
    let selector = Selector::parse(sel).ok()?;
    doc.select(&selector)
        .next()
        .map(|el| el.text().collect::<String>())
}

fn select_attr(doc: &Html, sel: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(sel).ok()?;
    doc.select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::to_string)
}

fn extract_headings(doc: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse(HEADINGS) else {
        return Vec::new();
    };
    doc.select(&selector)
        .map(|el| el.text().collect::<String>())
        .collect()
}
