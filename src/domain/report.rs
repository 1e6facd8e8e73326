use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::contact::ContactInfo;

pub const REASON_NAME_TOO_SHORT: &str = "name_too_short";
pub const REASON_GENERIC_NAME: &str = "generic_or_invalid_name";
pub const REASON_LOOKS_LIKE_CODE: &str = "looks_like_code";
pub const REASON_COULD_NOT_FETCH_PAGES: &str = "could_not_fetch_pages";
pub const REASON_NO_WEBSITE_FOUND: &str = "no_website_found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Partial,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "official_website")]
    OfficialWebsite,
    #[serde(rename = "directory")]
    Directory,
    #[serde(rename = "official_website+directory")]
    OfficialAndDirectory,
}

// Also the value stored in the results cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub id: String,
    pub fname: String,
    pub website_url: Option<String>,
    pub emails: BTreeSet<String>,
    pub phone_numbers: BTreeSet<String>,
    pub about: Option<String>,
    pub address: Option<String>,
    pub gstin: Option<String>,
    pub cin: Option<String>,
    pub source: Source,
    pub status: Status,
    pub error: Option<String>,
}

impl CompanyRecord {
    pub fn new(id: &str, fname: &str) -> Self {
        CompanyRecord {
            id: id.to_string(),
            fname: fname.to_string(),
            website_url: None,
            emails: BTreeSet::new(),
            phone_numbers: BTreeSet::new(),
            about: None,
            address: None,
            gstin: None,
            cin: None,
            source: Source::None,
            status: Status::Failed,
            error: None,
        }
    }

    fn has_contact_data(&self) -> bool {
        !self.emails.is_empty() || !self.phone_numbers.is_empty() || self.about.is_some()
    }

    pub fn apply_official(&mut self, info: ContactInfo) {
        self.emails = info.emails;
        self.phone_numbers = info.phone_numbers;
        self.about = info.about;
        self.address = info.address;
        self.gstin = info.gstin;
        self.cin = info.cin;
        self.source = Source::OfficialWebsite;
        self.status = match self.has_contact_data() {
            true => Status::Success,
            false => Status::Partial,
        };
    }

    // Fields already populated from the official website are never overwritten.
    pub fn merge_directory(&mut self, info: ContactInfo, had_official: bool) {
        if self.emails.is_empty() {
            self.emails = info.emails;
        }
        if self.phone_numbers.is_empty() {
            self.phone_numbers = info.phone_numbers;
        }
        if self.about.is_none() {
            self.about = info.about;
        }
        if self.address.is_none() {
            self.address = info.address;
        }
        if self.gstin.is_none() {
            self.gstin = info.gstin;
        }
        if self.cin.is_none() {
            self.cin = info.cin;
        }
        self.source = match had_official {
            true => Source::OfficialAndDirectory,
            false => Source::Directory,
        };
        self.status = match self.has_contact_data() {
            true => Status::Success,
            false => Status::Partial,
        };
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEntry {
    pub id: String,
    pub fname: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub total_input: usize,
    pub processed_range: String,
    pub range_count: usize,
    pub skipped: usize,
    pub success: usize,
    pub partial: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
pub struct BatchOutput {
    pub results: Vec<CompanyRecord>,
    pub skipped: Vec<SkippedEntry>,
    pub summary: BatchSummary,
}
