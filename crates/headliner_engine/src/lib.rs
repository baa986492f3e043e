//! Headliner engine: concurrent batched fetch and snippet extraction.
mod batch;
mod decode;
mod extract;
mod fetch;
mod types;

pub use batch::SnippetHarvester;
pub use decode::{decode_html, DecodeError};
pub use extract::{
    first_snippet, ExtractionRules, RuleError, SnippetExtractor, DEFAULT_PARAGRAPH_SELECTOR,
    DEFAULT_SUBHEAD_SELECTOR, DEFAULT_WRAPPER_SELECTOR,
};
pub use fetch::{FetchSettings, FetchedPage, Fetcher, ReqwestFetcher};
pub use types::{BatchError, FailureKind, FetchFailure, Outcome, Report};
