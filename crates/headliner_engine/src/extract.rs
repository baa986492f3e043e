use std::sync::Arc;

use scraper::{Html, Selector};

use crate::decode::decode_html;
use crate::fetch::Fetcher;
use crate::{FailureKind, FetchFailure};

/// Default selectors, matching the Divi theme markup of the site the
/// service was written against.
pub const DEFAULT_WRAPPER_SELECTOR: &str = ".et_pb_header_content_wrapper";
pub const DEFAULT_PARAGRAPH_SELECTOR: &str = "p";
pub const DEFAULT_SUBHEAD_SELECTOR: &str = ".et_pb_fullwidth_header_subhead";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid css selector {selector:?}")]
pub struct RuleError {
    pub selector: String,
}

/// The two content-selection strategies tried in order: the primary rule
/// reads paragraph text inside a designated content wrapper, the fallback
/// reads a designated subheading element.
#[derive(Debug, Clone)]
pub struct ExtractionRules {
    wrapper: Selector,
    paragraph: Selector,
    subhead: Selector,
}

impl ExtractionRules {
    pub fn new(wrapper: &str, paragraph: &str, subhead: &str) -> Result<Self, RuleError> {
        Ok(Self {
            wrapper: parse_selector(wrapper)?,
            paragraph: parse_selector(paragraph)?,
            subhead: parse_selector(subhead)?,
        })
    }

    /// Rules for the default site markup.
    pub fn default_rules() -> Result<Self, RuleError> {
        Self::new(
            DEFAULT_WRAPPER_SELECTOR,
            DEFAULT_PARAGRAPH_SELECTOR,
            DEFAULT_SUBHEAD_SELECTOR,
        )
    }
}

fn parse_selector(selector: &str) -> Result<Selector, RuleError> {
    Selector::parse(selector).map_err(|_| RuleError {
        selector: selector.to_string(),
    })
}

/// Apply the primary rule across the document in order, then the fallback
/// if the primary matched nothing. Selection is first-match, not
/// best-match; whitespace-only text counts as empty.
pub fn first_snippet(doc: &Html, rules: &ExtractionRules) -> Option<String> {
    for wrapper in doc.select(&rules.wrapper) {
        let text = wrapper
            .select(&rules.paragraph)
            .flat_map(|paragraph| paragraph.text())
            .collect::<String>();
        let text = text.trim();
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }

    for subhead in doc.select(&rules.subhead) {
        let text = subhead.text().collect::<String>();
        let text = text.trim();
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }

    None
}

/// The leaf worker: one fetch, one extraction, one classified outcome.
pub struct SnippetExtractor {
    fetcher: Arc<dyn Fetcher>,
    rules: ExtractionRules,
}

impl SnippetExtractor {
    pub fn new(fetcher: Arc<dyn Fetcher>, rules: ExtractionRules) -> Self {
        Self { fetcher, rules }
    }

    /// Fetch `url` and pull the first header snippet out of its HTML.
    ///
    /// Classification: transport and status failures pass through from the
    /// fetcher; an undecodable body is `ParseFailure`; a page that parses
    /// but matches neither rule is `NotFound`.
    pub async fn extract(&self, url: &str) -> Result<String, FetchFailure> {
        let page = self.fetcher.fetch(url).await?;

        let html = decode_html(&page.bytes, page.content_type.as_deref())
            .map_err(|err| FetchFailure::new(url, FailureKind::ParseFailure, err.to_string()))?;

        let doc = Html::parse_document(&html);
        match first_snippet(&doc, &self.rules) {
            Some(text) => Ok(text),
            None => Err(FetchFailure::new(
                url,
                FailureKind::NotFound,
                "no rule matched any content",
            )),
        }
    }
}
