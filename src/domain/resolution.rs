use serde::{Deserialize, Serialize};

// `url: None` is a cached negative result and stops future searches for the
// same name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub url: Option<String>,
    pub directory_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub record: ResolutionRecord,
    pub cached: bool,
}
