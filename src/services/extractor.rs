use std::collections::BTreeSet;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::domain::{
    contact::ContactInfo,
    page::{PageKind, PageSet},
};

const EMAIL_PATTERN: &str = r"[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}";

const BLACKLIST_EMAIL_DOMAINS: [&str; 11] = [
    "example.com",
    "sentry.io",
    "wixpress.com",
    "googleapis.com",
    "w3.org",
    "schema.org",
    "ogp.me",
    "facebook.com",
    "apple.com",
    "google.com",
    "mozilla.org",
];

// Asset filenames picked up by the loose email regex: retina image names
// like logo@2x.png and bundled script/style paths.
const JUNK_EMAIL_PATTERNS: [&str; 3] = [
    r"@\dx\.",
    r"\.(png|jpg|jpeg|gif|svg|webp|ico)$",
    r"\.(js|css|woff|ttf|eot)$",
];

const MOBILE_PATTERN: &str = r"(?:\+?91[-.\s]?)?0?[6-9]\d{4}[-.\s]?\d{5}\b";
const LANDLINE_PATTERN: &str = r"(?:\+91|0)[-.\s]?[1-9]\d{1,3}[-.\s]?\d{6,8}\b";
const GSTIN_PATTERN: &str = r"\d{2}[A-Z]{5}\d{4}[A-Z][A-Z\d]Z[A-Z\d]";
const CIN_PATTERN: &str = r"[A-Z]\d{5}[A-Z]{2}\d{4}[A-Z]{3}\d{6}";
const PIN_CODE_PATTERN: &str = r"\b[1-9]\d{5}\b";

const MAX_ABOUT_CHARS: usize = 2000;
const MAX_ADDRESS_CHARS: usize = 500;

// Emails, phones and the corporate identifiers accumulate across every page;
// the about text and the postal address take the first acceptable page in
// preference order.
pub fn extract_all_info(pages: &PageSet) -> ContactInfo {
    let parsed: Vec<(PageKind, &str, Html)> = pages
        .in_extraction_order()
        .map(|(kind, html_content)| (kind, html_content, Html::parse_document(html_content)))
        .collect();

    let mut info = ContactInfo::default();

    for (_, raw_html, document) in &parsed {
        let text = visible_text(document);
        info.emails.extend(extract_emails(document, &text, raw_html));
        info.phone_numbers.extend(extract_phones(document, &text));
        if info.gstin.is_none() {
            info.gstin = find_identifier(GSTIN_PATTERN, &text, raw_html);
        }
        if info.cin.is_none() {
            info.cin = find_identifier(CIN_PATTERN, &text, raw_html);
        }
    }

    info.about = first_extracted(
        &parsed,
        &[PageKind::AboutPage, PageKind::Homepage],
        extract_about,
    );
    info.address = first_extracted(
        &parsed,
        &[PageKind::ContactPage, PageKind::Homepage, PageKind::AboutPage],
        extract_address,
    );

    info
}

fn first_extracted<F>(
    parsed: &[(PageKind, &str, Html)],
    preference: &[PageKind],
    extract: F,
) -> Option<String>
where
    F: Fn(&Html) -> Option<String>,
{
    for kind in preference {
        if let Some((_, _, document)) = parsed.iter().find(|(k, _, _)| k == kind) {
            if let Some(value) = extract(document) {
                return Some(value);
            }
        }
    }
    None
}

// Newline-joined so address lines stay recognizable.
pub fn visible_text(document: &Html) -> String {
    let mut chunks = Vec::new();
    collect_visible_text(document.root_element(), &mut chunks);
    chunks.join("\n")
}

fn collect_visible_text(element: ElementRef, chunks: &mut Vec<String>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }
        } else if let Some(child_element) = ElementRef::wrap(child) {
            match child_element.value().name() {
                "script" | "style" | "noscript" => {}
                _ => collect_visible_text(child_element, chunks),
            }
        }
    }
}

fn extract_emails(document: &Html, text: &str, raw_html: &str) -> BTreeSet<String> {
    let email_re = Regex::new(EMAIL_PATTERN).expect("valid regex");
    let anchor_selector = Selector::parse("a[href]").unwrap();

    let mut found = BTreeSet::new();

    for anchor in document.select(&anchor_selector) {
        if let Some(href) = anchor.value().attr("href") {
            if let Some(address) = href.strip_prefix("mailto:") {
                let address = address
                    .split('?')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_lowercase();
                if address.contains('@') {
                    found.insert(address);
                }
            }
        }
    }

    for source in [text, raw_html] {
        for m in email_re.find_iter(source) {
            found.insert(m.as_str().to_lowercase());
        }
    }

    found
        .into_iter()
        .filter(|address| is_plausible_email(address))
        .collect()
}

fn is_plausible_email(address: &str) -> bool {
    if BLACKLIST_EMAIL_DOMAINS
        .iter()
        .any(|blocked| address.contains(blocked))
    {
        return false;
    }
    for pattern in JUNK_EMAIL_PATTERNS {
        if Regex::new(pattern).expect("valid regex").is_match(address) {
            return false;
        }
    }
    match address.rsplit_once('.') {
        Some((_, tld)) => (2..=10).contains(&tld.len()),
        None => false,
    }
}

fn extract_phones(document: &Html, text: &str) -> BTreeSet<String> {
    let anchor_selector = Selector::parse("a[href]").unwrap();
    let telephone_selector = Selector::parse(r#"[itemprop="telephone"]"#).unwrap();
    let jsonld_selector = Selector::parse(r#"script[type="application/ld+json"]"#).unwrap();
    let mobile_re = Regex::new(MOBILE_PATTERN).expect("valid regex");
    let landline_re = Regex::new(LANDLINE_PATTERN).expect("valid regex");

    let mut found = BTreeSet::new();

    for anchor in document.select(&anchor_selector) {
        if let Some(href) = anchor.value().attr("href") {
            if let Some(number) = href.strip_prefix("tel:") {
                if let Some(normalized) = normalize_indian_phone(number, true) {
                    found.insert(normalized);
                }
            }
        }
    }

    for tag in document.select(&telephone_selector) {
        let content = tag.text().collect::<String>();
        if let Some(normalized) = normalize_indian_phone(&content, true) {
            found.insert(normalized);
        }
    }

    for script in document.select(&jsonld_selector) {
        let body = script.text().collect::<String>();
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
            collect_jsonld_phones(&value, &mut found);
        }
    }

    for m in mobile_re.find_iter(text) {
        if let Some(normalized) = normalize_indian_phone(m.as_str(), false) {
            found.insert(normalized);
        }
    }
    for m in landline_re.find_iter(text) {
        if let Some(normalized) = normalize_indian_phone(m.as_str(), false) {
            found.insert(normalized);
        }
    }

    found
}

// A bare 10-digit number must start 6-9 unless it came from a trusted source
// (tel: links, itemprop, JSON-LD) or carried an explicit +91/0 prefix.
fn normalize_indian_phone(raw: &str, trusted: bool) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let (national, had_prefix) = match digits.len() {
        12 if digits.starts_with("91") => (digits[2..].to_string(), true),
        11 if digits.starts_with('0') => (digits[1..].to_string(), true),
        10 => (digits, false),
        _ => return None,
    };

    let first = national.chars().next()?;
    let acceptable = match first {
        '6'..='9' => true,
        '1'..='5' => trusted || had_prefix,
        _ => false,
    };
    match acceptable {
        true => Some(format!("+91 {}", national)),
        false => None,
    }
}

fn collect_jsonld_phones(value: &serde_json::Value, found: &mut BTreeSet<String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, nested) in map {
                match key.as_str() {
                    "telephone" | "phone" => {
                        if let Some(number) = nested.as_str() {
                            if let Some(normalized) = normalize_indian_phone(number, true) {
                                found.insert(normalized);
                            }
                        }
                    }
                    _ => collect_jsonld_phones(nested, found),
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_jsonld_phones(item, found);
            }
        }
        _ => {}
    }
}

fn extract_about(document: &Html) -> Option<String> {
    let paragraph_selector = Selector::parse("p").unwrap();

    let mut paragraphs = Vec::new();
    for paragraph in document.select(&paragraph_selector) {
        let content = paragraph.text().collect::<String>();
        let content = content.split_whitespace().collect::<Vec<&str>>().join(" ");
        if !content.is_empty() {
            paragraphs.push(content);
        }
    }
    let combined = paragraphs.join("\n");
    if combined.chars().count() > 30 {
        return Some(truncate_chars(&combined, MAX_ABOUT_CHARS));
    }

    for selector_str in [
        r#"meta[name="description"]"#,
        r#"meta[property="og:description"]"#,
    ] {
        let meta_selector = Selector::parse(selector_str).unwrap();
        let content = html_documents_meta_content(document, &meta_selector);
        if let Some(content) = content {
            if content.chars().count() > 20 {
                return Some(truncate_chars(&content, MAX_ABOUT_CHARS));
            }
        }
    }
    None
}

fn html_documents_meta_content(document: &Html, meta_selector: &Selector) -> Option<String> {
    document
        .select(meta_selector)
        .next()
        .and_then(|tag| tag.value().attr("content"))
        .map(|content| content.trim().to_string())
}

fn extract_address(document: &Html) -> Option<String> {
    let address_selector = Selector::parse(r#"[itemprop="address"]"#).unwrap();
    if let Some(tag) = document.select(&address_selector).next() {
        let content = joined_text(tag);
        if content.chars().count() > 10 {
            return Some(truncate_chars(&content, MAX_ADDRESS_CHARS));
        }
    }

    let jsonld_selector = Selector::parse(r#"script[type="application/ld+json"]"#).unwrap();
    for script in document.select(&jsonld_selector) {
        let body = script.text().collect::<String>();
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
            if let Some(address) = find_jsonld_address(&value) {
                if address.chars().count() > 10 {
                    return Some(truncate_chars(&address, MAX_ADDRESS_CHARS));
                }
            }
        }
    }

    let pin_re = Regex::new(PIN_CODE_PATTERN).expect("valid regex");
    let text = visible_text(document);
    for line in text.lines() {
        let line = line.trim();
        let line_chars = line.chars().count();
        if (15..=300).contains(&line_chars) && pin_re.is_match(line) {
            return Some(truncate_chars(line, MAX_ADDRESS_CHARS));
        }
    }
    None
}

fn find_jsonld_address(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Object(map) => {
            if map.contains_key("streetAddress") {
                let parts: Vec<&str> = [
                    "streetAddress",
                    "addressLocality",
                    "addressRegion",
                    "postalCode",
                    "addressCountry",
                ]
                .iter()
                .filter_map(|key| map.get(*key).and_then(|part| part.as_str()))
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect();
                if !parts.is_empty() {
                    return Some(parts.join(", "));
                }
            }
            map.values().find_map(find_jsonld_address)
        }
        serde_json::Value::Array(items) => items.iter().find_map(find_jsonld_address),
        _ => None,
    }
}

fn find_identifier(pattern: &str, text: &str, raw_html: &str) -> Option<String> {
    let re = Regex::new(pattern).expect("valid regex");
    for source in [text, raw_html] {
        if let Some(m) = re.find(source) {
            return Some(m.as_str().to_string());
        }
    }
    None
}

fn joined_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<&str>>()
        .join(", ")
}

fn truncate_chars(content: &str, max_chars: usize) -> String {
    content.chars().take(max_chars).collect()
}
