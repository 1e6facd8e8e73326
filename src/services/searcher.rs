use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use fake_user_agent::get_rua;
use scraper::{Html, Selector};
use url::Url;

use crate::services::throttle::RateGate;

const SEARCH_GATE_KEY: &str = "search";
const SEARCH_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub url: String,
    pub snippet: String,
}

// Errors are transient (blocked, timeout) and retryable; an empty Ok is a
// real no-result.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        region: &str,
    ) -> anyhow::Result<Vec<SearchHit>>;
}

// The html endpoint answers plain GET requests without JavaScript.
pub struct DuckduckgoSearcher {
    client: reqwest::Client,
    endpoint: String,
    gate: RateGate,
}

impl DuckduckgoSearcher {
    pub fn new(endpoint: String, delay_ms: u64, jitter_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .build()
            .unwrap();
        DuckduckgoSearcher {
            client,
            endpoint,
            gate: RateGate::new(delay_ms, delay_ms + jitter_ms),
        }
    }
}

#[async_trait]
impl SearchProvider for DuckduckgoSearcher {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        region: &str,
    ) -> anyhow::Result<Vec<SearchHit>> {
        self.gate.wait(SEARCH_GATE_KEY).await;

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("kl", region)])
            .header("User-Agent", get_rua())
            .send()
            .await
            .context("search request failed")?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            bail!("search endpoint returned {}", status);
        }

        let html_content = response
            .text()
            .await
            .context("failed to read search response")?;
        Ok(parse_search_results(&html_content, max_results))
    }
}

fn parse_search_results(html_content: &str, max_results: usize) -> Vec<SearchHit> {
    let result_selector = Selector::parse("div.result").unwrap();
    let link_selector = Selector::parse("a.result__a").unwrap();
    let snippet_selector = Selector::parse(".result__snippet").unwrap();

    let html_document = Html::parse_document(html_content);

    let mut hits = Vec::new();
    for result in html_document.select(&result_selector) {
        let link = match result.select(&link_selector).next() {
            Some(link) => link,
            None => continue,
        };
        let href = match link.value().attr("href") {
            Some(href) => href,
            None => continue,
        };
        let url = match unwrap_redirect(href) {
            Some(url) => url,
            None => continue,
        };
        let snippet = result
            .select(&snippet_selector)
            .next()
            .map(|tag| tag.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        hits.push(SearchHit { url, snippet });
        if hits.len() == max_results {
            break;
        }
    }
    hits
}

// Result anchors point at a relative redirect carrying the target in the
// uddg query parameter. Direct http(s) hrefs pass through.
fn unwrap_redirect(href: &str) -> Option<String> {
    let base = Url::parse("https://duckduckgo.com/").ok()?;
    let parsed = base.join(href).ok()?;
    if let Some((_, target)) = parsed.query_pairs().find(|(key, _)| key == "uddg") {
        return Some(target.into_owned());
    }
    match href.starts_with("http://") || href.starts_with("https://") {
        true => Some(href.to_string()),
        false => None,
    }
}
