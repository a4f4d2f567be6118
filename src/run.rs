//! One complete run over a URL list
//!
//! Fetch both ways, compare, persist the batch, notify, report. Store and
//! notification failures are logged and do not change the report.

use crate::diff::compare;
use crate::notify::Notifier;
use crate::pipeline::Pipeline;
use crate::schema::{Difference, PageSummary, RunReport};
use crate::store::SummaryStore;

pub async fn run(
    urls: &[String],
    pipeline: &Pipeline,
    store: Option<&mut dyn SummaryStore>,
    notifier: &dyn Notifier,
) -> RunReport {
    let summaries = pipeline.run(urls).await;
    let differences = compare(&summaries.static_pages, &summaries.dynamic_pages);
    log_differences(&differences);

    match store {
        Some(store) => persist(store, &summaries.static_pages, &summaries.dynamic_pages),
        None => tracing::debug!("No summary store, skipping persistence"),
    }

    if !differences.is_empty() {
        match notifier.notify(&differences).await {
            Ok(()) => tracing::info!("Notification sent"),
            Err(e) => tracing::error!("Failed to send notification: {}", e),
        }
    }

    RunReport {
        static_data: summaries.static_pages,
        dynamic_data: summaries.dynamic_pages,
        differences,
    }
}

/// Static first, so a rendered summary wins for the same URL
fn persist(
    store: &mut dyn SummaryStore,
    static_pages: &[PageSummary],
    dynamic_pages: &[PageSummary],
) {
    let batch: Vec<PageSummary> = static_pages.iter().chain(dynamic_pages).cloned().collect();
    match store.upsert_all(&batch) {
        Ok(()) => tracing::info!("Stored {} summaries", batch.len()),
        Err(e) => tracing::error!("Database error: {}", e),
    }
}

fn log_differences(differences: &[Difference]) {
    if differences.is_empty() {
        tracing::info!("No content differences detected");
        return;
    }

    tracing::info!("Content differences detected: {}", differences.len());
    for d in differences {
        tracing::info!(
            url = %d.url,
            fields = ?d.changed_fields(),
            "Title - Static: {}, Dynamic: {} | Meta Description - Static: {}, Dynamic: {} | Headings - Static: {}, Dynamic: {}",
            d.static_title,
            d.dynamic_title,
            d.static_meta_description,
            d.dynamic_meta_description,
            d.static_headings,
            d.dynamic_headings
        );
    }
}
