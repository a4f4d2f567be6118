//! Static vs. dynamic summary comparison
//!
//! A field only counts as changed when the static side has a value: an empty
//! static field says nothing about what the page should contain.

use crate::schema::{Difference, PageSummary};
use std::collections::HashMap;

/// Compare summaries joined by URL, in dynamic order
///
/// URLs that only appear on the static side never produce a difference.
/// When the static side repeats a URL, its last summary is used.
pub fn compare(static_pages: &[PageSummary], dynamic_pages: &[PageSummary]) -> Vec<Difference> {
    let by_url: HashMap<&str, &PageSummary> = static_pages
        .iter()
        .map(|page| (page.url.as_str(), page))
        .collect();

    dynamic_pages
        .iter()
        .filter_map(|dynamic| {
            let (title, meta_description, headings) = match by_url.get(dynamic.url.as_str()) {
                Some(page) => (
                    page.title.as_str(),
                    page.meta_description.as_str(),
                    page.headings.as_str(),
                ),
                None => ("", "", ""),
            };

            let changed = differs(title, &dynamic.title)
                || differs(meta_description, &dynamic.meta_description)
                || differs(headings, &dynamic.headings);

            changed.then(|| Difference {
                url: dynamic.url.clone(),
                static_title: title.to_string(),
                dynamic_title: dynamic.title.clone(),
                static_meta_description: meta_description.to_string(),
                dynamic_meta_description: dynamic.meta_description.clone(),
                static_headings: headings.to_string(),
                dynamic_headings: dynamic.headings.clone(),
            })
        })
        .collect()
}

fn differs(static_value: &str, dynamic_value: &str) -> bool {
    !static_value.is_empty() && static_value != dynamic_value
}
