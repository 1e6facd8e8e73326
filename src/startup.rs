use std::sync::Arc;

use fake_user_agent::get_rua;
use tokio::sync::Semaphore;

use crate::{
    configuration::Settings,
    dal::{
        cache_db::{ResultsCache, UrlCache},
        page_cache::PageCache,
    },
    services::{
        droid::Droid,
        fetcher::{BrowserFetcher, DirectFetcher, FetchTier, PageFetcher, StealthFetcher},
        gatherer::PageGatherer,
        resolver::UrlResolver,
        searcher::DuckduckgoSearcher,
        throttle::RateGate,
    },
};

pub struct ScrapeContext {
    pub resolver: UrlResolver,
    pub gatherer: PageGatherer,
    pub url_cache: Arc<UrlCache>,
    pub results_cache: Arc<ResultsCache>,
    pub admission: Arc<Semaphore>,
    pub internal_batch_size: usize,
}

// The browser tier is optional: when the WebDriver server is unreachable the
// two HTTP tiers carry the run alone.
pub async fn build(settings: &Settings) -> (Arc<ScrapeContext>, Option<Arc<Droid>>) {
    let url_cache = Arc::new(UrlCache::load(&settings.cache.url_cache_file));
    let results_cache = Arc::new(ResultsCache::load(&settings.cache.results_cache_file));
    log::info!(
        "Loaded {} cached resolutions and {} cached results",
        url_cache.len(),
        results_cache.len()
    );

    let searcher = Arc::new(DuckduckgoSearcher::new(
        settings.search.endpoint.clone(),
        settings.search.delay_ms,
        settings.search.jitter_ms,
    ));
    let resolver = UrlResolver::new(searcher, url_cache.clone(), settings.search.clone());

    let droid = match Droid::connect(
        &settings.webdriver.url,
        settings.scraper.max_concurrent_browsers,
        settings.webdriver.page_load_timeout_secs,
    )
    .await
    {
        Ok(droid) => Some(Arc::new(droid)),
        Err(e) => {
            log::warn!("WebDriver unavailable, browser tier disabled: {:#}", e);
            None
        }
    };

    let shared_client = reqwest::Client::builder()
        .user_agent(get_rua())
        .build()
        .unwrap();
    let mut tiers: Vec<Box<dyn FetchTier>> = vec![
        Box::new(DirectFetcher::new(
            shared_client,
            settings.scraper.max_concurrent_http,
            settings.scraper.fetch_timeout_secs,
        )),
        Box::new(StealthFetcher::new(settings.scraper.stealth_timeout_secs)),
    ];
    if let Some(droid) = &droid {
        tiers.push(Box::new(BrowserFetcher::new(droid.clone())));
    }

    let host_gate = RateGate::new(
        settings.scraper.host_delay_min_ms,
        settings.scraper.host_delay_max_ms,
    );
    let fetcher = Arc::new(PageFetcher::new(
        tiers,
        host_gate,
        settings.scraper.min_html_len,
    ));
    let gatherer = PageGatherer::new(fetcher, Arc::new(PageCache::default()));

    let ctx = Arc::new(ScrapeContext {
        resolver,
        gatherer,
        url_cache,
        results_cache,
        admission: Arc::new(Semaphore::new(settings.scraper.pipeline_concurrency)),
        internal_batch_size: settings.scraper.internal_batch_size,
    });
    (ctx, droid)
}
