use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Homepage,
    AboutPage,
    ContactPage,
}

// Bodies are shared with the page cache, hence the Arc.
#[derive(Debug, Clone, Default)]
pub struct PageSet {
    pub homepage: Option<Arc<String>>,
    pub about_page: Option<Arc<String>>,
    pub contact_page: Option<Arc<String>>,
}

impl PageSet {
    pub fn any(&self) -> bool {
        self.homepage.is_some() || self.about_page.is_some() || self.contact_page.is_some()
    }

    // Contact pages outrank about pages for first-match fields.
    pub fn in_extraction_order(&self) -> impl Iterator<Item = (PageKind, &str)> {
        [
            (PageKind::Homepage, &self.homepage),
            (PageKind::ContactPage, &self.contact_page),
            (PageKind::AboutPage, &self.about_page),
        ]
        .into_iter()
        .filter_map(|(kind, page)| page.as_deref().map(|html| (kind, html.as_str())))
    }
}
