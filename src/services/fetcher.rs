use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use fake_user_agent::get_rua;
use tokio::sync::Semaphore;
use url::Url;

use crate::services::{droid::Droid, throttle::RateGate};

const STEALTH_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const STEALTH_ACCEPT_LANGUAGE: &str = "en-IN,en-US;q=0.9,en;q=0.8";

// None means the tier could not produce a usable body; the caller moves on
// to the next tier.
#[async_trait]
pub trait FetchTier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(&self, url: &str) -> Option<String>;
}

pub struct DirectFetcher {
    client: reqwest::Client,
    semaphore: Semaphore,
    timeout: Duration,
}

impl DirectFetcher {
    pub fn new(client: reqwest::Client, max_concurrent: usize, timeout_secs: u64) -> Self {
        DirectFetcher {
            client,
            semaphore: Semaphore::new(max_concurrent),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl FetchTier for DirectFetcher {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn fetch(&self, url: &str) -> Option<String> {
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => return None,
        };
        let response = match self.client.get(url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                log::debug!("[direct] request error on {}: {}", url, e);
                return None;
            }
        };
        let status = response.status();
        match status == reqwest::StatusCode::OK {
            true => response.text().await.ok(),
            false => {
                log::debug!("[direct] {} on {}", status, url);
                None
            }
        }
    }
}

// Fresh client per call with a fresh browser identity, outside the
// transport semaphore.
pub struct StealthFetcher {
    timeout: Duration,
}

impl StealthFetcher {
    pub fn new(timeout_secs: u64) -> Self {
        StealthFetcher {
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl FetchTier for StealthFetcher {
    fn name(&self) -> &'static str {
        "stealth"
    }

    async fn fetch(&self, url: &str) -> Option<String> {
        let client = match reqwest::Client::builder()
            .user_agent(get_rua())
            .cookie_store(true)
            .timeout(self.timeout)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                log::debug!("[stealth] could not build client: {}", e);
                return None;
            }
        };
        let response = match client
            .get(url)
            .header("Accept", STEALTH_ACCEPT)
            .header("Accept-Language", STEALTH_ACCEPT_LANGUAGE)
            .header("Upgrade-Insecure-Requests", "1")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                log::debug!("[stealth] request error on {}: {}", url, e);
                return None;
            }
        };
        let status = response.status();
        match status == reqwest::StatusCode::OK {
            true => response.text().await.ok(),
            false => {
                log::debug!("[stealth] {} on {}", status, url);
                None
            }
        }
    }
}

pub struct BrowserFetcher {
    droid: Arc<Droid>,
}

impl BrowserFetcher {
    pub fn new(droid: Arc<Droid>) -> Self {
        BrowserFetcher { droid }
    }
}

#[async_trait]
impl FetchTier for BrowserFetcher {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn fetch(&self, url: &str) -> Option<String> {
        match self.droid.page_source(url).await {
            Ok(html_content) => Some(html_content),
            Err(e) => {
                log::debug!("[browser] render failed on {}: {:#}", url, e);
                None
            }
        }
    }
}

// Bodies at or under the minimum length are challenge pages and parked
// domains; they escalate like failures do.
pub struct PageFetcher {
    tiers: Vec<Box<dyn FetchTier>>,
    host_gate: RateGate,
    min_html_len: usize,
}

impl PageFetcher {
    pub fn new(tiers: Vec<Box<dyn FetchTier>>, host_gate: RateGate, min_html_len: usize) -> Self {
        PageFetcher {
            tiers,
            host_gate,
            min_html_len,
        }
    }

    pub async fn fetch_page(&self, url: &str) -> Option<String> {
        let host = Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(|host| host.to_string()))
            .unwrap_or_else(|| url.to_string());
        self.host_gate.wait(&host).await;

        for tier in &self.tiers {
            if let Some(html_content) = tier.fetch(url).await {
                match html_content.len() > self.min_html_len {
                    true => {
                        log::debug!(
                            "[{}] fetched {} ({} bytes)",
                            tier.name(),
                            url,
                            html_content.len()
                        );
                        return Some(html_content);
                    }
                    false => {
                        log::debug!(
                            "[{}] body too small on {} ({} bytes)",
                            tier.name(),
                            url,
                            html_content.len()
                        );
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::{DirectFetcher, FetchTier, PageFetcher};
    use crate::services::throttle::RateGate;

    struct CannedTier {
        label: &'static str,
        body: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    impl CannedTier {
        fn new(label: &'static str, body: Option<&str>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                CannedTier {
                    label,
                    body: body.map(|b| b.to_string()),
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl FetchTier for CannedTier {
        fn name(&self) -> &'static str {
            self.label
        }

        async fn fetch(&self, _url: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.body.clone()
        }
    }

    fn chain(tiers: Vec<Box<dyn FetchTier>>, min_html_len: usize) -> PageFetcher {
        PageFetcher::new(tiers, RateGate::new(0, 0), min_html_len)
    }

    #[tokio::test]
    async fn first_sufficient_tier_wins() {
        let (first, first_calls) = CannedTier::new("one", Some("<html>a big enough body</html>"));
        let (second, second_calls) = CannedTier::new("two", Some("<html>unused</html>"));
        let fetcher = chain(vec![Box::new(first), Box::new(second)], 10);

        let body = fetcher.fetch_page("https://acme.in").await;
        assert!(body.is_some());
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn short_bodies_escalate_to_the_next_tier() {
        let (first, _) = CannedTier::new("one", Some("tiny"));
        let (second, second_calls) = CannedTier::new("two", Some("<html>a big enough body</html>"));
        let fetcher = chain(vec![Box::new(first), Box::new(second)], 10);

        let body = fetcher.fetch_page("https://acme.in").await.unwrap();
        assert!(body.contains("big enough"));
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_chain_returns_none() {
        let (first, _) = CannedTier::new("one", None);
        let (second, _) = CannedTier::new("two", Some("tiny"));
        let fetcher = chain(vec![Box::new(first), Box::new(second)], 10);

        assert!(fetcher.fetch_page("https://acme.in").await.is_none());
    }

    #[tokio::test]
    async fn direct_fetcher_rejects_non_200_responses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blocked"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/open"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>welcome</html>"))
            .mount(&server)
            .await;

        let fetcher = DirectFetcher::new(reqwest::Client::new(), 2, 5);
        assert!(fetcher.fetch(&format!("{}/blocked", server.uri())).await.is_none());
        assert_eq!(
            fetcher.fetch(&format!("{}/open", server.uri())).await.as_deref(),
            Some("<html>welcome</html>")
        );
    }
}
