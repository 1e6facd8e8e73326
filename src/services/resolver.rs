use std::{cmp::Reverse, sync::Arc, time::Duration};

use rand::Rng;
use url::Url;

use crate::{
    configuration::SearchSettings,
    dal::cache_db::UrlCache,
    domain::{
        company::as_bare_domain,
        resolution::{Resolution, ResolutionRecord},
    },
    services::searcher::{SearchHit, SearchProvider},
};

// Anything at or below zero is never selected.
pub const EXCLUDED_SCORE: i32 = -1;

const BLOCKED_DOMAINS: [&str; 16] = [
    "linkedin.com",
    "facebook.com",
    "wikipedia.org",
    "youtube.com",
    "glassdoor.com",
    "glassdoor.co.in",
    "ambitionbox.com",
    "naukri.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "indeed.com",
    "crunchbase.com",
    "zaubacorp.com",
    "tofler.in",
    "fundoodata.com",
];

const PREFERRED_TLDS: [&str; 6] = [".in", ".co.in", ".gov.in", ".nic.in", ".org.in", ".ac.in"];

const DIRECTORY_DOMAINS: [&str; 2] = ["justdial.com", "indiamart.com"];

const CORPORATE_SUFFIXES: [&str; 17] = [
    " pvt. ltd.",
    " pvt ltd.",
    " pvt. ltd",
    " pvt ltd",
    " private limited",
    " limited",
    " ltd.",
    " ltd",
    " llp",
    " inc.",
    " inc",
    " india",
    " group",
    " services",
    " solutions",
    " technologies",
    " technology",
];

pub fn simplify_name(name: &str) -> String {
    let mut simplified = name.to_lowercase();
    for suffix in CORPORATE_SUFFIXES {
        simplified = simplified.replace(suffix, "");
    }
    simplified
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

// Falls back to the lowercased trimmed name when simplification eats everything.
pub fn cache_key(name: &str) -> String {
    let simplified = simplify_name(name);
    match simplified.is_empty() {
        true => name.trim().to_lowercase(),
        false => simplified,
    }
}

pub fn score_url(url: &str, simplified_name: &str) -> i32 {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return EXCLUDED_SCORE,
    };
    let host = match parsed.host_str() {
        Some(host) => host.to_lowercase(),
        None => return EXCLUDED_SCORE,
    };

    if BLOCKED_DOMAINS.iter().any(|blocked| host.contains(blocked)) {
        return EXCLUDED_SCORE;
    }

    let mut score = 0;
    match PREFERRED_TLDS.iter().any(|tld| host.ends_with(tld)) {
        true => score += 20,
        false => {
            if host.ends_with(".com") {
                score += 10;
            }
        }
    }

    let host_alnum: String = host.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if !simplified_name.is_empty() && host_alnum.contains(simplified_name) {
        score += 30;
    }
    if host.len() < 25 {
        score += 5;
    }
    if parsed.scheme() == "https" {
        score += 2;
    }
    score
}

// Stable sort keeps ties in search order.
pub fn select_official_url<'a>(hits: &'a [SearchHit], simplified_name: &str) -> Option<&'a str> {
    let mut scored: Vec<(i32, &SearchHit)> = hits
        .iter()
        .map(|hit| (score_url(&hit.url, simplified_name), hit))
        .collect();
    scored.sort_by_key(|(score, _)| Reverse(*score));

    match scored.first() {
        Some((score, hit)) if *score >= 0 => Some(&hit.url),
        _ => None,
    }
}

pub fn find_directory_url(hits: &[SearchHit]) -> Option<String> {
    hits.iter()
        .find(|hit| is_directory_url(&hit.url))
        .map(|hit| hit.url.clone())
}

fn is_directory_url(url: &str) -> bool {
    let host = Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|host| host.to_lowercase()));
    match host {
        Some(host) => DIRECTORY_DOMAINS
            .iter()
            .any(|directory| host.contains(directory)),
        None => false,
    }
}

fn build_search_query(company_name: &str) -> String {
    format!("{} India official website", company_name)
}

fn build_directory_search_query(company_name: &str) -> String {
    format!(
        "\"{}\" site:justdial.com OR site:indiamart.com",
        company_name
    )
}

// Never fails: search trouble degrades into a cached negative record.
pub struct UrlResolver {
    searcher: Arc<dyn SearchProvider>,
    url_cache: Arc<UrlCache>,
    settings: SearchSettings,
}

impl UrlResolver {
    pub fn new(
        searcher: Arc<dyn SearchProvider>,
        url_cache: Arc<UrlCache>,
        settings: SearchSettings,
    ) -> Self {
        UrlResolver {
            searcher,
            url_cache,
            settings,
        }
    }

    pub async fn resolve(&self, company_name: &str) -> Resolution {
        let key = cache_key(company_name);
        if let Some(record) = self.url_cache.get(&key) {
            return Resolution {
                record,
                cached: true,
            };
        }

        if let Some(direct_url) = as_bare_domain(company_name) {
            log::info!("'{}' already looks like a domain, using {}", company_name, direct_url);
            let record = ResolutionRecord {
                url: Some(direct_url),
                directory_url: None,
            };
            self.url_cache.insert(key, record.clone());
            return Resolution {
                record,
                cached: false,
            };
        }

        let query = build_search_query(company_name);
        let hits = self
            .search_with_retries(&query, self.settings.max_results)
            .await;

        let simplified = simplify_name(company_name);
        let record = ResolutionRecord {
            url: select_official_url(&hits, &simplified).map(|url| url.to_string()),
            directory_url: find_directory_url(&hits),
        };
        match &record.url {
            Some(url) => log::info!("Resolved '{}' -> {}", company_name, url),
            None => log::info!("No official website found for '{}'", company_name),
        }

        self.url_cache.insert(key, record.clone());
        Resolution {
            record,
            cached: false,
        }
    }

    pub async fn directory_lookup(&self, company_name: &str) -> Option<String> {
        let query = build_directory_search_query(company_name);
        match self
            .searcher
            .search(&query, self.settings.directory_max_results, &self.settings.region)
            .await
        {
            Ok(hits) => find_directory_url(&hits),
            Err(e) => {
                log::error!("Directory search failed for '{}': {:#}", company_name, e);
                None
            }
        }
    }

    async fn search_with_retries(&self, query: &str, max_results: usize) -> Vec<SearchHit> {
        let mut attempt: u32 = 0;
        loop {
            match self
                .searcher
                .search(query, max_results, &self.settings.region)
                .await
            {
                Ok(hits) => return hits,
                Err(e) => {
                    if attempt >= self.settings.max_retries {
                        log::error!(
                            "Search gave up after {} retries on '{}': {:#}",
                            self.settings.max_retries,
                            query,
                            e
                        );
                        return Vec::new();
                    }
                    let backoff_ms = self.settings.delay_ms * 2u64.pow(attempt)
                        + rand::thread_rng().gen_range(0..1000);
                    log::warn!("Search error on '{}', retrying in {}ms: {:#}", query, backoff_ms, e);
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    attempt += 1;
                }
            }
        }
    }
}
