use regex::Regex;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_string_from_number;

use crate::domain::report::{
    REASON_GENERIC_NAME, REASON_LOOKS_LIKE_CODE, REASON_NAME_TOO_SHORT,
};

const MIN_NAME_CHARS: usize = 3;

const JUNK_NAMES: [&str; 16] = [
    "n/a",
    "none",
    "freelance",
    "freelancer",
    "individual projects",
    "pvt ltd company",
    "pet store",
    "call center",
    "not applicable",
    "test",
    "demo",
    "sample",
    "unknown",
    "na",
    "nil",
    "null",
];

// Ids arrive as strings or numbers depending on who exported the file.
#[derive(Debug, Clone, Deserialize)]
pub struct CompanyEntry {
    #[serde(deserialize_with = "deserialize_string_from_number")]
    pub id: String,
    pub fname: String,
}

pub fn clean_company_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<&str>>().join(" ")
}

pub fn junk_name_reason(cleaned_name: &str) -> Option<&'static str> {
    if cleaned_name.chars().count() < MIN_NAME_CHARS {
        return Some(REASON_NAME_TOO_SHORT);
    }
    let lowered = cleaned_name.to_lowercase();
    if JUNK_NAMES.contains(&lowered.as_str()) {
        return Some(REASON_GENERIC_NAME);
    }
    let code_re = Regex::new(r"^[A-Z]{2,4}\d{4,}$").expect("valid regex");
    match code_re.is_match(cleaned_name) {
        true => Some(REASON_LOOKS_LIKE_CODE),
        false => None,
    }
}

pub fn as_bare_domain(name: &str) -> Option<String> {
    let candidate = name.trim().to_lowercase();
    let domain_re =
        Regex::new(r"^[a-z0-9][-a-z0-9]*\.[a-z]{2,6}(\.[a-z]{2,})?$").expect("valid regex");
    match domain_re.is_match(&candidate) {
        true => Some(format!("https://{}", candidate)),
        false => None,
    }
}
