//! Static and dynamic fetch phases over one URL list
//!
//! Both phases start together. The static phase fans out one request per URL
//! and waits for all of them; the dynamic phase spawns one task per URL and
//! relies on the dynamic fetcher to bound live renders. A failed URL never
//! affects the others.

use crate::error::FetchError;
use crate::extract::summarize;
use crate::fetch::Fetcher;
use crate::schema::{FetchResult, PageSummary};
use futures::future::join_all;
use std::sync::Arc;

/// Summaries from one pass over the URL list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summaries {
    /// One entry per input URL, in input order; failures become
    /// "Failed to parse" summaries
    pub static_pages: Vec<PageSummary>,
    /// Only URLs whose render succeeded with a non-empty document
    pub dynamic_pages: Vec<PageSummary>,
}

pub struct Pipeline {
    static_fetcher: Arc<dyn Fetcher>,
    dynamic_fetcher: Arc<dyn Fetcher>,
}

impl Pipeline {
    pub fn new(static_fetcher: Arc<dyn Fetcher>, dynamic_fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            static_fetcher,
            dynamic_fetcher,
        }
    }

    /// Fetch every URL both ways and summarize the results
    pub async fn run(&self, urls: &[String]) -> Summaries {
        let (static_results, dynamic_results) =
            tokio::join!(self.fetch_static(urls), self.fetch_dynamic(urls));

        let static_pages: Vec<PageSummary> = static_results.iter().map(summarize).collect();
        tracing::info!("Completed static content fetching");

        let dynamic_pages: Vec<PageSummary> = dynamic_results
            .iter()
            .filter(|result| result.raw_content().is_some_and(|html| !html.is_empty()))
            .map(summarize)
            .collect();
        tracing::info!(
            "Completed dynamic content fetching ({}/{} rendered)",
            dynamic_pages.len(),
            urls.len()
        );

        Summaries {
            static_pages,
            dynamic_pages,
        }
    }

    async fn fetch_static(&self, urls: &[String]) -> Vec<FetchResult> {
        join_all(urls.iter().map(|url| self.static_fetcher.fetch(url))).await
    }

    async fn fetch_dynamic(&self, urls: &[String]) -> Vec<FetchResult> {
        let tasks: Vec<_> = urls
            .iter()
            .map(|url| {
                let fetcher = Arc::clone(&self.dynamic_fetcher);
                let url = url.clone();
                tokio::spawn(async move { fetcher.fetch(&url).await })
            })
            .collect();

        join_all(tasks)
            .await
            .into_iter()
            .zip(urls)
            .map(|(joined, url)| {
                joined.unwrap_or_else(|e| {
                    tracing::error!("Render task for {} failed: {}", url, e);
                    FetchResult::failed(
                        url.as_str(),
                        FetchError::Render(format!("render task failed: {}", e)),
                    )
                })
            })
            .collect()
    }
}
