// Domain models the two provider schemas are mapped into.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Substituted at render time for pages whose probe failed.
pub const PLACEHOLDER_PAGE_URL: &str =
    "https://via.placeholder.com/800x1200?text=Image+Failed+to+Load";

/// A catalog entry from the metadata API. Immutable once fetched; re-fetched
/// only when the id changes.
#[derive(Debug, Clone)]
pub struct Title {
    pub id: u32,
    pub title: String,
    pub title_english: Option<String>,
    pub title_japanese: Option<String>,
    pub cover_url: Option<String>,
    pub synopsis: Option<String>,
    pub score: Option<f64>,
    pub chapters: Option<u32>,
    pub volumes: Option<u32>,
    pub status: Option<String>,
    pub kind: Option<String>,
    pub published_from: Option<DateTime<Utc>>,
    pub published_to: Option<DateTime<Utc>>,
    pub authors: Vec<String>,
    pub genres: Vec<String>,
}

impl Title {
    /// English title when the provider has one, native title otherwise.
    pub fn preferred_title(&self) -> &str {
        self.title_english.as_deref().unwrap_or(&self.title)
    }
}

/// One entry in a title's chapter feed. The ordinal `chapter` is a free-form
/// numeric-like string as assigned by the hosting provider ("12.5", "0").
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterSummary {
    pub id: Uuid,
    pub chapter: String,
    pub title: Option<String>,
    pub volume: Option<String>,
    pub page_count: Option<u32>,
    pub publish_at: Option<DateTime<Utc>>,
    pub readable_at: Option<DateTime<Utc>>,
}

/// A chapter opened for reading: summary fields plus the ordered page
/// sequence. Never constructed eagerly for a whole feed.
#[derive(Debug, Clone)]
pub struct ChapterWithPages {
    pub id: Uuid,
    pub chapter: String,
    pub title: Option<String>,
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Pending,
    Loaded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub state: PageState,
}

impl Page {
    pub fn new(url: impl Into<String>) -> Self {
        Page {
            url: url.into(),
            state: PageState::Pending,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.state != PageState::Pending
    }

    /// URL to render: the page itself, or the placeholder after a failed load.
    pub fn display_url(&self) -> &str {
        match self.state {
            PageState::Failed => PLACEHOLDER_PAGE_URL,
            _ => &self.url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferred_title_prefers_english() {
        let mut title = Title {
            id: 2,
            title: "ベルセルク".to_string(),
            title_english: Some("Berserk".to_string()),
            title_japanese: None,
            cover_url: None,
            synopsis: None,
            score: None,
            chapters: None,
            volumes: None,
            status: None,
            kind: None,
            published_from: None,
            published_to: None,
            authors: vec![],
            genres: vec![],
        };
        assert_eq!(title.preferred_title(), "Berserk");
        title.title_english = None;
        assert_eq!(title.preferred_title(), "ベルセルク");
    }

    #[test]
    fn failed_page_displays_placeholder() {
        let mut page = Page::new("https://uploads.example/data/abc/1.png");
        assert_eq!(page.display_url(), "https://uploads.example/data/abc/1.png");
        page.state = PageState::Failed;
        assert_eq!(page.display_url(), PLACEHOLDER_PAGE_URL);
    }
}
