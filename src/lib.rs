//! pagediff: compare static and browser-rendered versions of web pages
//!
//! Each URL is fetched twice, once over plain HTTP and once through headless
//! Chrome. Both documents are reduced to a summary (title, meta description,
//! headings) and any disagreement is reported.

pub mod browser;
pub mod config;
pub mod diff;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod notify;
pub mod pipeline;
pub mod retry;
pub mod run;
pub mod schema;
pub mod store;

pub use browser::{ChromeRenderer, DynamicFetcher, Renderer};
pub use config::{load_config, load_or_default, Config};
pub use diff::compare;
pub use error::{ConfigError, FetchError, NotifyError, StoreError};
pub use extract::extract;
pub use fetch::{Fetcher, StaticFetcher};
pub use notify::{LogNotifier, Notifier, WebhookNotifier};
pub use pipeline::{Pipeline, Summaries};
pub use retry::RetryPolicy;
pub use schema::{Difference, FetchResult, OutputFormat, PageSummary, RunReport};
pub use store::{SqliteStore, SummaryStore};
