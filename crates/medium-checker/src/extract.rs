/// Article extraction from Medium-style pages.
///
/// Title and author are looked up through ordered fallback chains: embedded JSON-LD
/// first, then a list of structural selectors, then (title only) the `<title>` tag.
/// Body text comes from the first content container that yields any usable block,
/// falling back to every sufficiently long `<p>` in the document.
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;
use url::Url;

use checker_common::fetch::PageSource;

use crate::error::AnalysisError;
use crate::model::ArticleRecord;

const LINKED_DATA_SELECTOR: &str = r#"script[type="application/ld+json"]"#;
const ARTICLE_TYPES: &[&str] = &["Article", "NewsArticle", "BlogPosting"];

/// Where a single metadata value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldStrategy {
    /// Text content of the first element matching the selector.
    Text(&'static str),
    /// `content` attribute of the first matching `<meta>`.
    MetaContent(&'static str),
}

const TITLE_STRATEGIES: &[FieldStrategy] = &[
    FieldStrategy::Text(r#"h1[data-testid="storyTitle"]"#),
    FieldStrategy::Text("h1.graf--title"),
    FieldStrategy::Text("h1"),
    FieldStrategy::Text(".graf--title"),
    FieldStrategy::MetaContent(r#"meta[property="og:title"]"#),
    // last resort
    FieldStrategy::Text("title"),
];

const AUTHOR_STRATEGIES: &[FieldStrategy] = &[
    FieldStrategy::Text(r#"[data-testid="authorName"]"#),
    FieldStrategy::Text(".author-name"),
    FieldStrategy::Text(".js-authorName"),
    FieldStrategy::MetaContent(r#"meta[name="author"]"#),
    FieldStrategy::Text(r#"a[rel="author"]"#),
];

const CONTENT_CONTAINERS: &[&str] = &[
    r#"[data-testid="storyContent"]"#,
    "article section",
    "article",
    ".postArticle-content",
    ".section-content",
    "section[tabindex]",
    r#"div[data-field="body"]"#,
];
const CONTENT_BLOCKS: &str = "p, li, pre, code, h2, h3, h4";

static LINKED_DATA: LazyLock<Selector> = LazyLock::new(|| selector(LINKED_DATA_SELECTOR));
static BLOCKS: LazyLock<Selector> = LazyLock::new(|| selector(CONTENT_BLOCKS));
static PARAGRAPHS: LazyLock<Selector> = LazyLock::new(|| selector("p"));
static TITLE_CHAIN: LazyLock<Vec<(FieldStrategy, Selector)>> =
    LazyLock::new(|| compile_chain(TITLE_STRATEGIES));
static AUTHOR_CHAIN: LazyLock<Vec<(FieldStrategy, Selector)>> =
    LazyLock::new(|| compile_chain(AUTHOR_STRATEGIES));
static CONTAINERS: LazyLock<Vec<(&'static str, Selector)>> = LazyLock::new(|| {
    CONTENT_CONTAINERS
        .iter()
        .map(|css| (*css, selector(css)))
        .collect()
});

/// Blocks inside a content container must be longer than this many characters.
const MIN_BLOCK_CHARS: usize = 5;
/// Paragraphs collected by the document-wide fallback must be longer than this.
const MIN_FALLBACK_CHARS: usize = 10;

/// Fetches pages from the target site and turns them into `ArticleRecord`s.
pub struct ArticleExtractor<S> {
    source: S,
    target_domain: String,
}

impl<S: PageSource> ArticleExtractor<S> {
    pub fn new(source: S, target_domain: impl Into<String>) -> Self {
        Self {
            source,
            target_domain: target_domain.into().to_ascii_lowercase(),
        }
    }

    pub fn target_domain(&self) -> &str {
        &self.target_domain
    }

    pub fn is_valid_url(&self, url: &str) -> bool {
        is_target_url(url, &self.target_domain)
    }

    /// Validate, fetch and extract. The host is checked before any network call.
    pub async fn extract(&self, url: &str) -> Result<ArticleRecord, AnalysisError> {
        if !self.is_valid_url(url) {
            return Err(AnalysisError::InvalidUrl {
                url: url.to_string(),
                domain: self.target_domain.clone(),
            });
        }
        let html = self.source.fetch_page(url).await?;
        extract_article(&html, url)
    }
}

/// `true` when `url` is http(s) and its host is `domain` or a subdomain of it.
pub fn is_target_url(url: &str, domain: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    let domain = domain.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Extract an article from already-fetched HTML.
///
/// Fails only when neither a title nor any content could be found; a missing
/// author is not an error.
pub fn extract_article(html: &str, url: &str) -> Result<ArticleRecord, AnalysisError> {
    let document = Html::parse_document(html);

    let linked = linked_data_metadata(&document);
    if linked.is_some() {
        debug!(url, "found JSON-LD article metadata");
    }
    let (linked_title, linked_author) = linked.unwrap_or_default();

    let title = non_empty(linked_title)
        .or_else(|| first_field(&document, &TITLE_CHAIN))
        .unwrap_or_default();
    let author = non_empty(linked_author)
        .or_else(|| first_field(&document, &AUTHOR_CHAIN))
        .unwrap_or_default();
    let content = extract_content(&document);

    if title.is_empty() && content.is_empty() {
        return Err(AnalysisError::ExtractionEmpty);
    }

    let record = ArticleRecord::new(title, author, url.to_string(), content);
    info!(
        url,
        title = %record.title,
        author = %record.author,
        word_count = record.word_count,
        "article extracted"
    );
    Ok(record)
}

/// Normalize a scraped string: decode entities, NFC, NBSP to space, collapse
/// whitespace runs and trim.
pub fn normalize_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let decoded = html_escape::decode_html_entities(text);
    let composed: String = decoded.nfc().collect();
    composed
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

impl FieldStrategy {
    fn css(self) -> &'static str {
        match self {
            FieldStrategy::Text(css) | FieldStrategy::MetaContent(css) => css,
        }
    }
}

fn compile_chain(strategies: &[FieldStrategy]) -> Vec<(FieldStrategy, Selector)> {
    strategies
        .iter()
        .map(|strategy| (*strategy, selector(strategy.css())))
        .collect()
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn element_text(element: ElementRef<'_>) -> String {
    normalize_text(&element.text().collect::<String>())
}

fn first_field(document: &Html, chain: &[(FieldStrategy, Selector)]) -> Option<String> {
    chain.iter().find_map(|(strategy, matcher)| {
        let value = match strategy {
            FieldStrategy::Text(_) => document.select(matcher).next().map(element_text),
            FieldStrategy::MetaContent(_) => document
                .select(matcher)
                .next()
                .and_then(|meta| meta.value().attr("content"))
                .map(normalize_text),
        }?;
        if value.is_empty() {
            return None;
        }
        debug!(?strategy, "metadata field resolved");
        Some(value)
    })
}

/// Title and author from the first JSON-LD item typed as an article.
///
/// Blocks that are not valid JSON are skipped.
fn linked_data_metadata(document: &Html) -> Option<(String, String)> {
    for script in document.select(&LINKED_DATA) {
        let raw: String = script.text().collect();
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "skipping malformed JSON-LD block");
                continue;
            }
        };

        let items = match value {
            Value::Array(items) => items,
            other => vec![other],
        };
        if let Some(item) = items.iter().find(|item| is_article_type(item)) {
            let title = ["headline", "name"]
                .iter()
                .filter_map(|key| item.get(*key).and_then(Value::as_str))
                .find(|s| !s.is_empty())
                .unwrap_or_default();
            let author = author_name(item.get("author"));
            return Some((normalize_text(title), normalize_text(&author)));
        }
    }
    None
}

fn is_article_type(item: &Value) -> bool {
    let declared = item
        .get("@type")
        .filter(|v| !v.is_null())
        .or_else(|| item.get("type"));
    match declared {
        Some(Value::String(t)) => ARTICLE_TYPES.contains(&t.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| ARTICLE_TYPES.contains(&t)),
        _ => false,
    }
}

/// `author` may be a record, a list of records or strings, or a plain string.
fn author_name(author: Option<&Value>) -> String {
    let record_name = |v: &Value| v.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
    match author {
        Some(Value::Object(_)) => author.map(record_name).unwrap_or_default(),
        Some(Value::Array(list)) => match list.first() {
            Some(first @ Value::Object(_)) => record_name(first),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        },
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn extract_content(document: &Html) -> String {
    for (css, container) in CONTAINERS.iter() {
        let fragments: Vec<String> = document
            .select(container)
            .flat_map(|node| node.select(&BLOCKS))
            .map(element_text)
            .filter(|text| text.chars().count() > MIN_BLOCK_CHARS)
            .collect();
        if !fragments.is_empty() {
            debug!(selector = *css, fragments = fragments.len(), "content container matched");
            return fragments.join("\n\n");
        }
    }

    let fragments: Vec<String> = document
        .select(&PARAGRAPHS)
        .map(element_text)
        .filter(|text| text.chars().count() > MIN_FALLBACK_CHARS)
        .collect();
    if !fragments.is_empty() {
        debug!(fragments = fragments.len(), "content taken from document-wide paragraphs");
    }
    fragments.join("\n\n")
}
