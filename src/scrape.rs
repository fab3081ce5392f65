use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use log::{debug, error, info, warn};
use regex::Regex;
use reqwest::{Client, StatusCode};
use select::document::Document;
use select::node::Node;
use select::predicate::{Name, Predicate};
use serde::Deserialize;
use url::Url;

use crate::error::CurateError;

/// Nodes whose text is never part of the content.
const SKIPPED_NODES: [&str; 3] = ["script", "style", "noscript"];

/// The expected value of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// The attribute must be equal to the value.
    One(String),
    /// The whitespace separated tokens of the attribute must be equal to the
    /// list, like `class="post featured"` for `["post", "featured"]`.
    Many(Vec<String>),
}

impl AttrValue {
    pub fn matches(&self, attr: &str) -> bool {
        match self {
            AttrValue::One(value) => attr == value,
            AttrValue::Many(tokens) => attr.split_whitespace().eq(tokens.iter().map(String::as_str)),
        }
    }
}

/// Identifies nodes by their name and an attribute.
///
/// Deserialized from a triple like `["div", "class", ["col-sm-4"]]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "(String, String, AttrValue)")]
pub struct TagSpec {
    pub tag_name: String,
    pub attribute_name: String,
    pub attribute_value: AttrValue,
}

impl TagSpec {
    pub fn new<T: ToString, U: ToString>(tag_name: T, attribute_name: U, attribute_value: AttrValue) -> Self {
        Self {
            tag_name: tag_name.to_string(),
            attribute_name: attribute_name.to_string(),
            attribute_value,
        }
    }

    pub fn matches(&self, node: &Node) -> bool {
        node.name() == Some(self.tag_name.as_str())
            && node
                .attr(&self.attribute_name)
                .map(|attr| self.attribute_value.matches(attr))
                .unwrap_or_default()
    }
}

impl From<(String, String, AttrValue)> for TagSpec {
    fn from((tag_name, attribute_name, attribute_value): (String, String, AttrValue)) -> Self {
        Self {
            tag_name,
            attribute_name,
            attribute_value,
        }
    }
}

/// Matches a node if any of the specs matches.
#[derive(Debug, Clone, Copy)]
pub struct AnyTag<'a>(pub &'a [TagSpec]);

impl<'a> Predicate for AnyTag<'a> {
    fn matches(&self, node: &Node) -> bool {
        self.0.iter().any(|spec| spec.matches(node))
    }
}

fn default_links_to_excl() -> String {
    " ".to_string()
}

fn default_split_on() -> String {
    "\n".to_string()
}

/// How to find articles and their text on a site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteConfig {
    /// Links to the main article list pages.
    pub base_urls: Vec<Url>,
    /// Tags to search for article links on the main pages.
    pub tags_main: Vec<TagSpec>,
    /// Pattern of links to exclude.
    #[serde(default = "default_links_to_excl")]
    pub links_to_excl: String,
    /// Pattern of links to keep.
    #[serde(default)]
    pub links_to_incl: String,
    /// Tags holding the article text inside an article page.
    pub tags_post: Vec<TagSpec>,
    /// Whether the text is spread over all occurrences of the tags, or just
    /// a single instance.
    #[serde(default)]
    pub in_chunks: bool,
    /// Pattern to split a single block of text into paragraphs.
    #[serde(default = "default_split_on")]
    pub split_on: String,
}

impl SiteConfig {
    pub fn patterns(&self) -> Result<SitePatterns, regex::Error> {
        Ok(SitePatterns {
            links_to_excl: Regex::new(&self.links_to_excl)?,
            links_to_incl: Regex::new(&self.links_to_incl)?,
            split_on: Regex::new(&self.split_on)?,
        })
    }
}

/// The compiled patterns of a [`SiteConfig`].
#[derive(Debug, Clone)]
pub struct SitePatterns {
    pub links_to_excl: Regex,
    pub links_to_incl: Regex,
    pub split_on: Regex,
}

/// Reads the site configs, keyed by site name.
pub fn read_site_configs<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, SiteConfig>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read site configs {}", path.display()))?;
    Ok(serde_json::from_str(&content)
        .with_context(|| format!("Invalid site configs {}", path.display()))?)
}

/// Collects the text of all descendant text nodes, separated by a space.
pub fn node_text(node: &Node) -> String {
    fn recur_text<'a>(node: &Node<'a>, parts: &mut Vec<&'a str>) {
        if let Some(text) = node.as_text() {
            parts.push(text);
        }
        if node.name().map(|n| SKIPPED_NODES.contains(&n)).unwrap_or_default() {
            return;
        }
        for child in node.children() {
            recur_text(&child, parts)
        }
    }

    let mut parts = Vec::new();
    recur_text(node, &mut parts);
    parts.join(" ")
}

/// All unique links below the matching nodes, resolved against `base_url`.
pub fn extract_links(
    doc: &Document,
    base_url: &Url,
    tags: &[TagSpec],
    links_to_excl: &Regex,
    links_to_incl: &Regex,
) -> Vec<Url> {
    let mut urls: Vec<Url> = Vec::new();
    for container in doc.find(AnyTag(tags)) {
        for href in container.find(Name("a")).filter_map(|a| a.attr("href")) {
            let url = match base_url.join(href) {
                Ok(url) => url,
                Err(err) => {
                    debug!("Ignoring invalid link {:?}: {}", href, err);
                    continue;
                }
            };
            if !urls.contains(&url)
                && !links_to_excl.is_match(url.as_str())
                && links_to_incl.is_match(url.as_str())
            {
                urls.push(url);
            }
        }
    }
    urls
}

/// Extracts the raw text chunks.
///
/// If `in_chunks`, every matching node is a chunk, otherwise the first
/// matching node is split on `split_on`. Returns `None` if no node matches
/// in the latter case.
pub fn extract_text(
    doc: &Document,
    tags: &[TagSpec],
    in_chunks: bool,
    split_on: &Regex,
) -> Option<Vec<String>> {
    if in_chunks {
        Some(doc.find(AnyTag(tags)).map(|node| node_text(&node)).collect())
    } else {
        let txt = node_text(&doc.find(AnyTag(tags)).next()?);
        Some(split_on.split(&txt).map(str::to_string).collect())
    }
}

/// Awaits `fetch` and, if it was rate limited, waits `delay` and tries
/// exactly one more time.
pub async fn fetch_with_retry<F, Fut>(
    url: &Url,
    delay: Duration,
    mut fetch: F,
) -> Result<Bytes, CurateError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(StatusCode, Bytes), CurateError>>,
{
    let (mut status, mut body) = fetch().await?;

    if status == StatusCode::TOO_MANY_REQUESTS {
        warn!("Too many requests to {}, waiting {:?} to retry", url, delay);
        tokio::time::sleep(delay).await;
        let (retry_status, retry_body) = fetch().await?;
        status = retry_status;
        body = retry_body;
    }

    if status.is_success() {
        Ok(body)
    } else {
        Err(CurateError::HttpFailure {
            url: url.clone(),
            status,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeConfig {
    /// The user-agent used for requests.
    browser_user_agent: String,
    /// Timeout for requests.
    request_timeout: Duration,
    /// How long to wait before retrying a rate limited request.
    rate_limit_delay: Duration,
    /// Max. number of articles to scrape per site.
    max_articles: usize,
}

impl ScrapeConfig {
    /// Default timeout for requests.
    pub const DEFAULT_REQ_TIMEOUT_SEC: u64 = 7;

    pub const DEFAULT_RATE_LIMIT_DELAY_SEC: u64 = 60 * 2;

    pub const DEFAULT_MAX_ARTICLES: usize = 100;

    #[inline]
    pub(crate) fn user_agent() -> String {
        format!("astroblatt/{}", env!("CARGO_PKG_VERSION"))
    }

    #[inline]
    pub fn builder() -> ScrapeConfigBuilder {
        ScrapeConfigBuilder::default()
    }

    pub fn max_articles(&self) -> usize {
        self.max_articles
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        ScrapeConfig::builder().build()
    }
}

#[derive(Debug, Default)]
pub struct ScrapeConfigBuilder {
    browser_user_agent: Option<String>,
    request_timeout: Option<Duration>,
    rate_limit_delay: Option<Duration>,
    max_articles: Option<usize>,
}

impl ScrapeConfigBuilder {
    pub fn browser_user_agent<T: ToString>(mut self, browser_user_agent: T) -> Self {
        self.browser_user_agent = Some(browser_user_agent.to_string());
        self
    }

    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = Some(request_timeout);
        self
    }

    pub fn rate_limit_delay(mut self, rate_limit_delay: Duration) -> Self {
        self.rate_limit_delay = Some(rate_limit_delay);
        self
    }

    pub fn max_articles(mut self, max_articles: usize) -> Self {
        self.max_articles = Some(max_articles);
        self
    }

    pub fn build(self) -> ScrapeConfig {
        ScrapeConfig {
            browser_user_agent: self
                .browser_user_agent
                .unwrap_or_else(ScrapeConfig::user_agent),
            request_timeout: self
                .request_timeout
                .unwrap_or_else(|| Duration::from_secs(ScrapeConfig::DEFAULT_REQ_TIMEOUT_SEC)),
            rate_limit_delay: self.rate_limit_delay.unwrap_or_else(|| {
                Duration::from_secs(ScrapeConfig::DEFAULT_RATE_LIMIT_DELAY_SEC)
            }),
            max_articles: self
                .max_articles
                .unwrap_or(ScrapeConfig::DEFAULT_MAX_ARTICLES),
        }
    }
}

/// Fetches article lists and article pages.
#[derive(Debug, Clone)]
pub struct Scraper {
    /// The [`reqwest::Client`] that drives requests.
    client: Client,
    config: ScrapeConfig,
}

impl Scraper {
    pub fn new(config: ScrapeConfig) -> Result<Self, CurateError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.browser_user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    async fn get(&self, url: &Url) -> Result<(StatusCode, Bytes), CurateError> {
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        Ok((status, resp.bytes().await?))
    }

    pub async fn get_document(&self, url: &Url) -> Result<Document, CurateError> {
        let body = fetch_with_retry(url, self.config.rate_limit_delay, || self.get(url)).await?;
        match Document::from_read(&*body) {
            Ok(doc) => Ok(doc),
            Err(_) => Err(CurateError::ReadDocument {
                url: url.clone(),
                body,
            }),
        }
    }

    /// Collects the relevant links from the page at `base_url`.
    pub async fn article_links(
        &self,
        base_url: &Url,
        tags: &[TagSpec],
        links_to_excl: &Regex,
        links_to_incl: &Regex,
    ) -> Result<Vec<Url>, CurateError> {
        let doc = self.get_document(base_url).await?;
        Ok(extract_links(
            &doc,
            base_url,
            tags,
            links_to_excl,
            links_to_incl,
        ))
    }

    /// Scrapes the raw text chunks from the page at `url`.
    pub async fn article_text(
        &self,
        url: &Url,
        tags: &[TagSpec],
        in_chunks: bool,
        split_on: &Regex,
    ) -> Result<Vec<String>, CurateError> {
        let doc = self.get_document(url).await?;
        extract_text(&doc, tags, in_chunks, split_on)
            .ok_or_else(|| CurateError::NoMatchingNode { url: url.clone() })
    }

    /// All article links of the site, at most `max_articles`.
    pub async fn site_links(&self, site: &SiteConfig, patterns: &SitePatterns) -> Result<Vec<Url>> {
        let mut links = Vec::new();
        for base_url in &site.base_urls {
            let found = self
                .article_links(
                    base_url,
                    &site.tags_main,
                    &patterns.links_to_excl,
                    &patterns.links_to_incl,
                )
                .await
                .with_context(|| format!("Failed to collect links from {}", base_url))?;
            debug!("Found {} links on {}", found.len(), base_url);
            links.extend(found);
        }
        links.truncate(self.config.max_articles);
        info!("Scraping {} articles", links.len());
        Ok(links)
    }

    pub async fn site_article_text(
        &self,
        site: &SiteConfig,
        patterns: &SitePatterns,
        url: &Url,
    ) -> Result<Vec<String>> {
        Ok(self
            .article_text(url, &site.tags_post, site.in_chunks, &patterns.split_on)
            .await?)
    }
}

/// Runs `scrape` for every site in order. A failing site is logged and
/// skipped, the names of all failed sites are returned.
pub async fn scrape_sites<I, T, F, Fut>(sites: I, mut scrape: F) -> Vec<String>
where
    I: IntoIterator<Item = (String, T)>,
    F: FnMut(String, T) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut failed = Vec::new();
    for (name, site) in sites {
        if let Err(err) = scrape(name.clone(), site).await {
            error!("Failed to scrape {}: {:#}", name, err);
            failed.push(name);
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    const LIST_PAGE: &str = r#"<html><body>
        <div class="col-sm-4">
            <a href="/wellness/leo-season">Leo</a>
            <a href="https://www.purewow.com/wellness/memes-for-virgos">Memes</a>
            <a href="/wellness/leo-season">Leo again</a>
            <a>no href</a>
        </div>
        <div class="col-sm-4 wide"><a href="/wellness/skipped">Other class list</a></div>
        <div class="col-sm-3"><a href="quiz/which-sign">Quiz</a><a href="/wellness/aries">Aries</a></div>
        <nav><a href="/about">About</a></nav>
    </body></html>"#;

    const ARTICLE_PAGE: &str = r#"<html><body>
        <section id="articleText">First paragraph with <b>bold</b> text
Second paragraph<script>var x = 1;</script></section>
        <p class="chunk">Chunk one</p>
        <p class="chunk">Chunk <i>two</i></p>
    </body></html>"#;

    fn many(tokens: &[&str]) -> AttrValue {
        AttrValue::Many(tokens.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn attr_matching() {
        assert!(AttrValue::One("post-1".to_string()).matches("post-1"));
        assert!(!AttrValue::One("post-1".to_string()).matches("post-12"));
        assert!(many(&["Main", "Main--blog-list"]).matches("Main  Main--blog-list"));
        assert!(!many(&["Main"]).matches("Main Main--blog-list"));
    }

    #[test]
    fn deserialize_site_config() {
        let json = r#"{
            "purewow": {
                "base_urls": ["https://www.purewow.com/wellness/Horoscopes"],
                "tags_main": [["div", "class", ["col-sm-4"]], ["div", "class", ["col-sm-3"]]],
                "links_to_excl": "memes|quiz",
                "tags_post": [["section", "id", "articleText"]]
            }
        }"#;
        let configs: BTreeMap<String, SiteConfig> = serde_json::from_str(json).unwrap();
        let site = &configs["purewow"];
        assert_eq!(site.tags_main[1], TagSpec::new("div", "class", many(&["col-sm-3"])));
        assert_eq!(
            site.tags_post[0].attribute_value,
            AttrValue::One("articleText".to_string())
        );
        assert_eq!(site.links_to_incl, "");
        assert_eq!(site.split_on, "\n");
        assert!(!site.in_chunks);
        assert!(site.patterns().is_ok());
    }

    #[test]
    fn links() {
        let doc = Document::from(LIST_PAGE);
        let base = Url::parse("https://www.purewow.com/wellness/Horoscopes").unwrap();
        let tags = vec![
            TagSpec::new("div", "class", many(&["col-sm-4"])),
            TagSpec::new("div", "class", many(&["col-sm-3"])),
        ];
        let excl = Regex::new("memes|quiz").unwrap();
        let incl = Regex::new("").unwrap();
        let links = extract_links(&doc, &base, &tags, &excl, &incl);
        assert_eq!(
            links,
            vec![
                Url::parse("https://www.purewow.com/wellness/leo-season").unwrap(),
                Url::parse("https://www.purewow.com/wellness/aries").unwrap(),
            ]
        );

        let incl = Regex::new("aries").unwrap();
        let excl = Regex::new(" ").unwrap();
        let links = extract_links(&doc, &base, &tags, &excl, &incl);
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn text_single_block() {
        let doc = Document::from(ARTICLE_PAGE);
        let tags = vec![TagSpec::new("section", "id", AttrValue::One("articleText".into()))];
        let chunks = extract_text(&doc, &tags, false, &Regex::new("\n").unwrap()).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "First paragraph with  bold  text");
        assert!(chunks[1].starts_with("Second paragraph"));
        assert!(!chunks[1].contains("var x"));
    }

    #[test]
    fn text_in_chunks() {
        let doc = Document::from(ARTICLE_PAGE);
        let tags = vec![TagSpec::new("p", "class", many(&["chunk"]))];
        let chunks = extract_text(&doc, &tags, true, &Regex::new("\n").unwrap()).unwrap();
        assert_eq!(chunks, vec!["Chunk one", "Chunk  two"]);
    }

    #[test]
    fn text_without_match() {
        let doc = Document::from(ARTICLE_PAGE);
        let tags = vec![TagSpec::new("article", "id", AttrValue::One("missing".into()))];
        let split = Regex::new("\n").unwrap();
        assert!(extract_text(&doc, &tags, false, &split).is_none());
        assert_eq!(extract_text(&doc, &tags, true, &split), Some(vec![]));
    }

    async fn respond(queue: &RefCell<Vec<StatusCode>>) -> Result<(StatusCode, Bytes), CurateError> {
        let status = queue.borrow_mut().remove(0);
        Ok((status, Bytes::from_static(b"<html></html>")))
    }

    #[tokio::test]
    async fn retries_once_on_rate_limit() {
        let url = Url::parse("https://example.com/a").unwrap();
        let queue = RefCell::new(vec![StatusCode::TOO_MANY_REQUESTS, StatusCode::OK]);
        let body = fetch_with_retry(&url, Duration::from_millis(1), || respond(&queue))
            .await
            .unwrap();
        assert_eq!(&body[..], b"<html></html>");
        assert!(queue.borrow().is_empty());
    }

    #[tokio::test]
    async fn second_rate_limit_fails() {
        let url = Url::parse("https://example.com/a").unwrap();
        let queue = RefCell::new(vec![
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::OK,
        ]);
        let err = fetch_with_retry(&url, Duration::from_millis(1), || respond(&queue))
            .await
            .unwrap_err();
        match err {
            CurateError::HttpFailure { url: failed, status } => {
                assert_eq!(failed, url);
                assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
            }
            err => panic!("unexpected {:?}", err),
        }
        assert_eq!(queue.borrow().len(), 1);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let url = Url::parse("https://example.com/a").unwrap();
        let queue = RefCell::new(vec![StatusCode::NOT_FOUND, StatusCode::OK]);
        let err = fetch_with_retry(&url, Duration::from_millis(1), || respond(&queue))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("https://example.com/a"));
        assert_eq!(queue.borrow().len(), 1);
    }

    async fn scrape_status(
        visited: &RefCell<Vec<String>>,
        name: String,
        status: StatusCode,
    ) -> Result<()> {
        visited.borrow_mut().push(name.clone());
        if status.is_success() {
            Ok(())
        } else {
            let url = Url::parse(&format!("https://{}.com/horoscopes", name))?;
            Err(CurateError::HttpFailure { url, status }.into())
        }
    }

    #[tokio::test]
    async fn failing_site_does_not_stop_the_rest() {
        let visited = RefCell::new(Vec::new());
        let sites = vec![
            ("bustle".to_string(), StatusCode::OK),
            ("elle".to_string(), StatusCode::NOT_FOUND),
            ("purewow".to_string(), StatusCode::OK),
        ];
        let failed = scrape_sites(sites, |name, status| scrape_status(&visited, name, status)).await;
        assert_eq!(failed, vec!["elle"]);
        assert_eq!(*visited.borrow(), vec!["bustle", "elle", "purewow"]);
    }
}
