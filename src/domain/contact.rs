use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactInfo {
    pub emails: BTreeSet<String>,
    pub phone_numbers: BTreeSet<String>,
    pub about: Option<String>,
    pub address: Option<String>,
    pub gstin: Option<String>,
    pub cin: Option<String>,
}
