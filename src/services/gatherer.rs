use std::{collections::HashSet, sync::Arc};

use itertools::Itertools;
use scraper::{Html, Selector};
use url::Url;

use crate::{dal::page_cache::PageCache, domain::page::PageSet, services::fetcher::PageFetcher};

const ABOUT_PATHS: [&str; 11] = [
    "/about",
    "/about-us",
    "/about-us/",
    "/aboutus",
    "/company",
    "/who-we-are",
    "/our-company",
    "/our-story",
    "/about-company",
    "/about-company.html",
    "/about.html",
];

const CONTACT_PATHS: [&str; 7] = [
    "/contact",
    "/contact-us",
    "/contact-us/",
    "/contactus",
    "/reach-us",
    "/get-in-touch",
    "/contact.html",
];

const ABOUT_TEXT_HINTS: [&str; 5] = ["about", "company", "who we are", "our story", "who-we-are"];
const ABOUT_HREF_HINTS: [&str; 3] = ["about", "company", "who-we"];
const CONTACT_TEXT_HINTS: [&str; 4] = ["contact", "reach us", "get in touch", "reach-us"];
const CONTACT_HREF_HINTS: [&str; 3] = ["contact", "reach", "get-in-touch"];

const MAX_SUBPAGE_ATTEMPTS: usize = 3;

#[derive(Debug, Default, PartialEq)]
pub struct DiscoveredLinks {
    pub about_url: Option<String>,
    pub contact_url: Option<String>,
}

pub struct PageGatherer {
    fetcher: Arc<PageFetcher>,
    page_cache: Arc<PageCache>,
}

impl PageGatherer {
    pub fn new(fetcher: Arc<PageFetcher>, page_cache: Arc<PageCache>) -> Self {
        PageGatherer {
            fetcher,
            page_cache,
        }
    }

    pub async fn gather(&self, base_url: &str) -> PageSet {
        let homepage = match self.fetch_cached(base_url).await {
            Some(homepage) => homepage,
            None => {
                log::warn!("Could not fetch homepage {}", base_url);
                return PageSet::default();
            }
        };

        let links = discover_subpage_links(&homepage, base_url);
        let mut seen: HashSet<String> = HashSet::from([base_url.to_string()]);

        let about_candidates = candidate_urls(links.about_url, base_url, &ABOUT_PATHS);
        let about_page = self.fetch_first(&about_candidates, &mut seen).await;

        let contact_candidates = candidate_urls(links.contact_url, base_url, &CONTACT_PATHS);
        let contact_page = self.fetch_first(&contact_candidates, &mut seen).await;

        PageSet {
            homepage: Some(homepage),
            about_page,
            contact_page,
        }
    }

    async fn fetch_cached(&self, url: &str) -> Option<Arc<String>> {
        if let Some(cached) = self.page_cache.get(url) {
            return Some(cached);
        }
        match self.fetcher.fetch_page(url).await {
            Some(html_content) => {
                let html_content = Arc::new(html_content);
                self.page_cache
                    .insert(url.to_string(), html_content.clone());
                Some(html_content)
            }
            None => None,
        }
    }

    async fn fetch_first(
        &self,
        candidates: &[String],
        seen: &mut HashSet<String>,
    ) -> Option<Arc<String>> {
        for url in candidates.iter().take(MAX_SUBPAGE_ATTEMPTS) {
            if !seen.insert(url.clone()) {
                continue;
            }
            if let Some(html_content) = self.fetch_cached(url).await {
                return Some(html_content);
            }
        }
        None
    }
}

// One anchor may satisfy both families; scanning stops once both are found.
pub fn discover_subpage_links(html_content: &str, base_url: &str) -> DiscoveredLinks {
    let anchor_selector = Selector::parse("a[href]").unwrap();
    let base = match Url::parse(base_url) {
        Ok(base) => base,
        Err(_) => return DiscoveredLinks::default(),
    };

    let html_document = Html::parse_document(html_content);
    let mut links = DiscoveredLinks::default();

    for anchor in html_document.select(&anchor_selector) {
        let href = match anchor.value().attr("href") {
            Some(href) => href.trim(),
            None => continue,
        };
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }

        let text = anchor.text().collect::<String>().trim().to_lowercase();
        let href_lower = href.to_lowercase();

        if links.about_url.is_none()
            && (contains_any(&text, &ABOUT_TEXT_HINTS) || contains_any(&href_lower, &ABOUT_HREF_HINTS))
        {
            links.about_url = absolute_url(&base, href);
        }
        if links.contact_url.is_none()
            && (contains_any(&text, &CONTACT_TEXT_HINTS)
                || contains_any(&href_lower, &CONTACT_HREF_HINTS))
        {
            links.contact_url = absolute_url(&base, href);
        }
        if links.about_url.is_some() && links.contact_url.is_some() {
            break;
        }
    }
    links
}

pub fn candidate_urls(
    discovered: Option<String>,
    base_url: &str,
    catalog_paths: &[&str],
) -> Vec<String> {
    let mut candidates = Vec::new();
    if let Some(url) = discovered {
        candidates.push(url);
    }
    if let Ok(base) = Url::parse(base_url) {
        for path in catalog_paths {
            if let Ok(joined) = base.join(path) {
                candidates.push(joined.to_string());
            }
        }
    }
    candidates.into_iter().unique().collect()
}

fn absolute_url(base: &Url, href: &str) -> Option<String> {
    base.join(href).ok().map(|joined| joined.to_string())
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
