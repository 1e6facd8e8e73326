use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::Semaphore;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use khoj::{
    configuration::SearchSettings,
    dal::{
        cache_db::{ResultsCache, UrlCache},
        page_cache::PageCache,
    },
    domain::{
        company::CompanyEntry,
        report::{Source, Status},
        resolution::ResolutionRecord,
    },
    services::{
        fetcher::{DirectFetcher, FetchTier, PageFetcher},
        gatherer::PageGatherer,
        orchestrator::scrape_companies,
        resolver::UrlResolver,
        searcher::DuckduckgoSearcher,
        throttle::RateGate,
    },
    startup::ScrapeContext,
};

fn search_settings(endpoint: String) -> SearchSettings {
    SearchSettings {
        endpoint,
        region: "in-en".to_string(),
        max_results: 5,
        directory_max_results: 3,
        max_retries: 2,
        delay_ms: 0,
        jitter_ms: 1,
    }
}

// Only the plain HTTP fetch tier is wired in, so nothing ever leaves the
// mock servers.
fn build_context(dir: &TempDir, search_endpoint: String) -> Arc<ScrapeContext> {
    let url_cache = Arc::new(UrlCache::load(dir.path().join("url_cache.json")));
    let results_cache = Arc::new(ResultsCache::load(dir.path().join("results_cache.json")));

    let searcher = Arc::new(DuckduckgoSearcher::new(search_endpoint.clone(), 0, 1));
    let resolver = UrlResolver::new(
        searcher,
        url_cache.clone(),
        search_settings(search_endpoint),
    );

    let tiers: Vec<Box<dyn FetchTier>> =
        vec![Box::new(DirectFetcher::new(reqwest::Client::new(), 50, 5))];
    let fetcher = Arc::new(PageFetcher::new(tiers, RateGate::new(0, 1), 50));
    let gatherer = PageGatherer::new(fetcher, Arc::new(PageCache::default()));

    Arc::new(ScrapeContext {
        resolver,
        gatherer,
        url_cache,
        results_cache,
        admission: Arc::new(Semaphore::new(3)),
        internal_batch_size: 50,
    })
}

fn entry(id: &str, fname: &str) -> CompanyEntry {
    CompanyEntry {
        id: id.to_string(),
        fname: fname.to_string(),
    }
}

fn search_results_page(official_url: &str) -> String {
    format!(
        r#"<html><body><div class="results">
        <div class="result">
          <a class="result__a" href="{}">Acme Industries - Official Website</a>
          <div class="result__snippet">Manufacturer of precision widgets, Pune</div>
        </div>
        <div class="result">
          <a class="result__a" href="https://www.linkedin.com/company/acme-industries">Acme Industries | LinkedIn</a>
          <div class="result__snippet">Acme Industries on LinkedIn</div>
        </div>
        </div></body></html>"#,
        official_url
    )
}

const ACME_HOMEPAGE: &str = r#"<html><body>
<nav><a href="/about-us">About Us</a> <a href="/contact-us">Contact Us</a></nav>
<h1>Acme Industries</h1>
<div>Precision widget manufacturing for Indian industry, serving automotive and aerospace plants from our Pune works.</div>
</body></html>"#;

const ACME_ABOUT: &str = r#"<html><body>
<h1>About Acme</h1>
<p>Acme Industries has manufactured precision widgets in Pune for four decades, supplying plants across India.</p>
<p>GSTIN: 27AAPCA1234A1Z5</p>
</body></html>"#;

const ACME_CONTACT: &str = r#"<html><body>
<h2>Contact Acme Industries</h2>
<a href="mailto:info@acmeindustries.in">info@acmeindustries.in</a>
<a href="tel:+91-98765-43210">Call sales</a>
<div>Plot 7, MIDC Industrial Area, Pune 411019</div>
</body></html>"#;

async fn mount_acme_site(site: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ACME_HOMEPAGE))
        .expect(1)
        .mount(site)
        .await;
    Mock::given(method("GET"))
        .and(path("/about-us"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ACME_ABOUT))
        .expect(1)
        .mount(site)
        .await;
    Mock::given(method("GET"))
        .and(path("/contact-us"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ACME_CONTACT))
        .expect(1)
        .mount(site)
        .await;
}

#[tokio::test]
async fn full_run_collects_contacts_from_official_site() {
    let dir = tempfile::tempdir().unwrap();
    let search = MockServer::start().await;
    let site = MockServer::start().await;
    let official_url = format!("{}/", site.uri());

    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(search_results_page(&official_url)),
        )
        .expect(1)
        .mount(&search)
        .await;
    mount_acme_site(&site).await;

    let ctx = build_context(&dir, format!("{}/html/", search.uri()));
    let entries = vec![entry("1", "Acme Industries Pvt Ltd")];

    let output = scrape_companies(ctx, &entries, None, None).await.unwrap();

    assert_eq!(output.results.len(), 1);
    let record = &output.results[0];
    assert_eq!(record.status, Status::Success);
    assert_eq!(record.source, Source::OfficialWebsite);
    assert_eq!(record.website_url.as_deref(), Some(official_url.as_str()));
    assert!(record.emails.contains("info@acmeindustries.in"));
    assert!(record.phone_numbers.contains("+91 9876543210"));
    assert!(record.about.as_deref().unwrap().contains("precision widgets"));
    assert_eq!(
        record.address.as_deref(),
        Some("Plot 7, MIDC Industrial Area, Pune 411019")
    );
    assert_eq!(record.gstin.as_deref(), Some("27AAPCA1234A1Z5"));
    assert!(record.error.is_none());

    assert_eq!(output.summary.success, 1);
    assert_eq!(output.summary.total_input, 1);
    assert_eq!(output.summary.processed_range, "1-1");
    assert_eq!(output.summary.range_count, 1);

    // both caches flushed at the sub-batch boundary, keyed by simplified name
    let url_cache_raw =
        std::fs::read_to_string(dir.path().join("url_cache.json")).unwrap();
    let url_cache_json: serde_json::Value = serde_json::from_str(&url_cache_raw).unwrap();
    assert!(url_cache_json.get("acmeindustries").is_some());
    assert!(dir.path().join("results_cache.json").exists());
}

#[tokio::test]
async fn junk_names_never_reach_the_search_engine() {
    let dir = tempfile::tempdir().unwrap();
    let search = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(0)
        .mount(&search)
        .await;

    let ctx = build_context(&dir, format!("{}/html/", search.uri()));
    let entries = vec![entry("1", "n/a"), entry("2", "ab"), entry("3", "AB12345")];

    let output = scrape_companies(ctx, &entries, None, None).await.unwrap();

    assert!(output.results.is_empty());
    assert_eq!(output.summary.skipped, 3);
    let reasons: Vec<&str> = output.skipped.iter().map(|s| s.reason.as_str()).collect();
    assert_eq!(
        reasons,
        vec!["generic_or_invalid_name", "name_too_short", "looks_like_code"]
    );
}

#[tokio::test]
async fn rerun_hits_caches_and_produces_identical_output() {
    let dir = tempfile::tempdir().unwrap();
    let search = MockServer::start().await;
    let site = MockServer::start().await;
    let official_url = format!("{}/", site.uri());

    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(search_results_page(&official_url)),
        )
        .expect(1)
        .mount(&search)
        .await;
    mount_acme_site(&site).await;

    let entries = vec![entry("1", "Acme Industries Pvt Ltd")];

    let first_ctx = build_context(&dir, format!("{}/html/", search.uri()));
    let first = scrape_companies(first_ctx, &entries, None, None)
        .await
        .unwrap();

    // a fresh context reloads the flushed caches; the mocks' expectations
    // prove the second run performs no search and no fetch
    let second_ctx = build_context(&dir, format!("{}/html/", search.uri()));
    let second = scrape_companies(second_ctx, &entries, None, None)
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
    assert_eq!(second.summary.success, 1);
}

#[tokio::test]
async fn bare_domain_names_resolve_without_searching() {
    let dir = tempfile::tempdir().unwrap();
    let search = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(0)
        .mount(&search)
        .await;

    let url_cache = Arc::new(UrlCache::load(dir.path().join("url_cache.json")));
    let endpoint = format!("{}/html/", search.uri());
    let resolver = UrlResolver::new(
        Arc::new(DuckduckgoSearcher::new(endpoint.clone(), 0, 1)),
        url_cache,
        search_settings(endpoint),
    );

    let resolution = resolver.resolve("ramco.co.in").await;
    assert_eq!(resolution.record.url.as_deref(), Some("https://ramco.co.in"));
    assert!(!resolution.cached);

    let again = resolver.resolve("ramco.co.in").await;
    assert!(again.cached);
    assert_eq!(again.record.url.as_deref(), Some("https://ramco.co.in"));
}

#[tokio::test]
async fn search_errors_cache_a_negative_result() {
    let dir = tempfile::tempdir().unwrap();
    let search = MockServer::start().await;
    // one initial attempt plus two retries for the official-site query, then
    // one directory-fallback attempt; the second resolve must add nothing
    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&search)
        .await;

    let ctx = build_context(&dir, format!("{}/html/", search.uri()));
    let entries = vec![entry("1", "Acme Industries")];

    let output = scrape_companies(ctx, &entries, None, None).await.unwrap();
    assert_eq!(output.results[0].status, Status::Failed);
    assert_eq!(output.results[0].error.as_deref(), Some("no_website_found"));

    // rerun over the same caches: the results cache answers immediately
    let second_ctx = build_context(&dir, format!("{}/html/", search.uri()));
    let second = scrape_companies(second_ctx, &entries, None, None)
        .await
        .unwrap();
    assert_eq!(second.results[0].status, Status::Failed);
}

#[tokio::test]
async fn directory_fallback_fills_from_listing() {
    let dir = tempfile::tempdir().unwrap();
    let search = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(0)
        .mount(&search)
        .await;

    let directory = MockServer::start().await;
    let listing_url = format!("{}/listing", directory.uri());
    Mock::given(method("GET"))
        .and(path("/listing"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
            <h2>Kaveri Exports - Surat</h2>
            <p>Exporter of premium cotton yarn and textiles from Surat, Gujarat.</p>
            <a href="mailto:sales@kaveriexports.com">sales@kaveriexports.com</a>
            <div>Call +91 9822001100</div>
            <div>14 Ring Road Market, Surat 395002</div>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&directory)
        .await;

    let ctx = build_context(&dir, format!("{}/html/", search.uri()));
    // a previous run already learned there is no official site, only a listing
    ctx.url_cache.insert(
        "kaveriexports".to_string(),
        ResolutionRecord {
            url: None,
            directory_url: Some(listing_url.clone()),
        },
    );

    let entries = vec![entry("1", "Kaveri Exports")];
    let output = scrape_companies(ctx, &entries, None, None).await.unwrap();

    let record = &output.results[0];
    assert_eq!(record.status, Status::Success);
    assert_eq!(record.source, Source::Directory);
    assert_eq!(record.website_url.as_deref(), Some(listing_url.as_str()));
    assert!(record.emails.contains("sales@kaveriexports.com"));
    assert!(record.phone_numbers.contains("+91 9822001100"));
    assert_eq!(
        record.address.as_deref(),
        Some("14 Ring Road Market, Surat 395002")
    );
    assert!(record.error.is_none());
}

#[tokio::test]
async fn directory_merge_never_overwrites_official_fields() {
    let dir = tempfile::tempdir().unwrap();
    let search = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(0)
        .mount(&search)
        .await;

    // official site with an address but no emails, phones or about text
    let site = MockServer::start().await;
    let official_url = format!("{}/", site.uri());
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
            <h1>Kaveri Exports</h1>
            <p>Est. 1992.</p>
            <div>Warehouse 9, GIDC Industrial Estate, Surat 395010</div>
            <div>Plain filler text about nothing in particular to pad the body well past the fetch threshold.</div>
            </body></html>"#,
        ))
        .mount(&site)
        .await;

    let directory = MockServer::start().await;
    let listing_url = format!("{}/listing", directory.uri());
    Mock::given(method("GET"))
        .and(path("/listing"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
            <p>Exporter of premium cotton yarn and textiles from Surat, Gujarat.</p>
            <a href="mailto:sales@kaveriexports.com">sales@kaveriexports.com</a>
            <div>14 Ring Road Market, Surat 395002</div>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&directory)
        .await;

    let ctx = build_context(&dir, format!("{}/html/", search.uri()));
    ctx.url_cache.insert(
        "kaveriexports".to_string(),
        ResolutionRecord {
            url: Some(official_url.clone()),
            directory_url: Some(listing_url),
        },
    );

    let entries = vec![entry("1", "Kaveri Exports")];
    let output = scrape_companies(ctx, &entries, None, None).await.unwrap();

    let record = &output.results[0];
    assert_eq!(record.status, Status::Success);
    assert_eq!(record.source, Source::OfficialAndDirectory);
    assert_eq!(record.website_url.as_deref(), Some(official_url.as_str()));
    assert!(record.emails.contains("sales@kaveriexports.com"));
    assert!(record.about.as_deref().unwrap().contains("cotton yarn"));
    // the official site's address wins over the listing's
    assert_eq!(
        record.address.as_deref(),
        Some("Warehouse 9, GIDC Industrial Estate, Surat 395010")
    );
}
