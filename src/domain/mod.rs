pub mod company;
pub mod contact;
pub mod page;
pub mod report;
pub mod resolution;
