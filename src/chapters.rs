// Chapter list management: feed fetch, client-side ordering, neighbor lookup.

use std::cmp::Ordering;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::mapping::{chapter_ordinal, chapter_summary};
use crate::domain::models::ChapterSummary;
use crate::mangadex_client::{ChapterRecord, FEED_LIMIT, MangaDexClient};

/// An ordered chapter sequence. Always sorted ascending by the numeric value
/// of the ordinal, regardless of upstream ordering correctness.
#[derive(Debug, Clone, Default)]
pub struct ChapterList {
    chapters: Vec<ChapterSummary>,
}

impl ChapterList {
    pub fn empty() -> Self {
        ChapterList { chapters: Vec::new() }
    }

    pub fn from_summaries(mut chapters: Vec<ChapterSummary>) -> Self {
        chapters.sort_by(|a, b| {
            chapter_ordinal(&a.chapter)
                .partial_cmp(&chapter_ordinal(&b.chapter))
                .unwrap_or(Ordering::Equal)
        });
        ChapterList { chapters }
    }

    /// Maps a raw feed into the capped, sorted summary sequence.
    pub fn from_feed(records: &[ChapterRecord]) -> Self {
        let summaries = records
            .iter()
            .take(FEED_LIMIT as usize)
            .map(chapter_summary)
            .collect();
        Self::from_summaries(summaries)
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn summaries(&self) -> &[ChapterSummary] {
        &self.chapters
    }

    pub fn get(&self, index: usize) -> Option<&ChapterSummary> {
        self.chapters.get(index)
    }

    pub fn index_of(&self, id: &Uuid) -> Option<usize> {
        self.chapters.iter().position(|c| c.id == *id)
    }

    // Neighbor lookups are bounds-checked index arithmetic; the sequence
    // never wraps around.

    pub fn has_previous(&self, index: usize) -> bool {
        index > 0 && index < self.chapters.len()
    }

    pub fn has_next(&self, index: usize) -> bool {
        index + 1 < self.chapters.len()
    }

    pub fn previous(&self, index: usize) -> Option<&ChapterSummary> {
        if self.has_previous(index) {
            self.chapters.get(index - 1)
        } else {
            None
        }
    }

    pub fn next(&self, index: usize) -> Option<&ChapterSummary> {
        if self.has_next(index) {
            self.chapters.get(index + 1)
        } else {
            None
        }
    }
}

/// Fetches and orders the chapter feed for a resolved title. Pages are never
/// prefetched here; page listing is deferred to the reader session.
#[derive(Debug)]
pub struct ChapterListManager {
    mangadex: Arc<MangaDexClient>,
}

impl ChapterListManager {
    pub fn new(mangadex: Arc<MangaDexClient>) -> Self {
        ChapterListManager { mangadex }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn list_chapters(&self, hosting_id: &Uuid) -> anyhow::Result<ChapterList> {
        let records = self.mangadex.feed(hosting_id).await?;
        let list = ChapterList::from_feed(&records);
        tracing::debug!(hosting_id = %hosting_id, count = list.len(), "fetched chapter list");
        Ok(list)
    }
}
