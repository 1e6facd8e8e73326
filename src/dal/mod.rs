pub mod cache_db;
pub mod page_cache;
