use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

// Per-run only, never persisted. Entities sharing a directory page reuse the
// body instead of refetching.
#[derive(Default)]
pub struct PageCache {
    pages: Mutex<HashMap<String, Arc<String>>>,
}

impl PageCache {
    pub fn get(&self, url: &str) -> Option<Arc<String>> {
        self.pages
            .lock()
            .expect("page cache lock poisoned")
            .get(url)
            .cloned()
    }

    pub fn insert(&self, url: String, html: Arc<String>) {
        self.pages
            .lock()
            .expect("page cache lock poisoned")
            .insert(url, html);
    }
}
