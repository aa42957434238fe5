// Wiring facade: the session surface consumed by the (out-of-scope) UI layer.

use std::sync::Arc;

use uuid::Uuid;

use crate::chapters::{ChapterList, ChapterListManager};
use crate::config::Config;
use crate::domain::mapping;
use crate::domain::models::Title;
use crate::fetch::RateLimitedClient;
use crate::jikan_client::{DEFAULT_PAGE_SIZE, JikanClient};
use crate::mangadex_client::MangaDexClient;
use crate::memo::MemoMap;
use crate::reader::{HttpPageProber, PageProber, ReaderSession};
use crate::resolver::{CandidateSearch, QuerySource, Resolver};

/// One instance per browsing session. Holds one rate-limited client per API
/// origin plus the per-id fetch guards; everything here is transient
/// in-memory state, discarded with the instance.
pub struct MangaBridge {
    jikan: Arc<JikanClient>,
    mangadex: Arc<MangaDexClient>,
    resolver: Resolver,
    chapter_lists: ChapterListManager,
    titles: MemoMap<u32, Title>,
    chapters: MemoMap<u32, ChapterList>,
    prober: Arc<dyn PageProber>,
}

impl MangaBridge {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        let jikan = Arc::new(JikanClient::new(
            &config.jikan_base_url,
            RateLimitedClient::new(config.jikan_min_delay, config.jikan_retry)?,
        ));
        let mangadex = Arc::new(MangaDexClient::new(
            &config.mangadex_base_url,
            RateLimitedClient::new(config.mangadex_min_delay, config.mangadex_retry)?,
        ));
        let resolver = Resolver::new(
            Arc::clone(&jikan) as Arc<dyn QuerySource>,
            Arc::clone(&mangadex) as Arc<dyn CandidateSearch>,
        );
        let chapter_lists = ChapterListManager::new(Arc::clone(&mangadex));
        tracing::info!(
            jikan = %config.jikan_base_url,
            mangadex = %config.mangadex_base_url,
            "configured manga bridge"
        );
        Ok(MangaBridge {
            jikan,
            mangadex,
            resolver,
            chapter_lists,
            titles: MemoMap::new(),
            chapters: MemoMap::new(),
            prober: Arc::new(HttpPageProber::new()?),
        })
    }

    /// Swap the page prober (e.g. for tests or a caching CDN front).
    pub fn with_prober(mut self, prober: Arc<dyn PageProber>) -> Self {
        self.prober = prober;
        self
    }

    /// Top-manga listing, one page of 20.
    pub async fn browse(&self, page: u32) -> anyhow::Result<Vec<Title>> {
        let records = self.jikan.top_manga(page, DEFAULT_PAGE_SIZE).await?;
        Ok(records.iter().map(mapping::title_from_record).collect())
    }

    /// Metadata text search, one page of 20.
    pub async fn search(&self, query: &str, page: u32) -> anyhow::Result<Vec<Title>> {
        let records = self
            .jikan
            .search_manga(query, page, DEFAULT_PAGE_SIZE)
            .await?;
        Ok(records.iter().map(mapping::title_from_record).collect())
    }

    /// Full title detail, fetched once per id for this instance's lifetime.
    pub async fn title(&self, id: u32) -> anyhow::Result<Title> {
        self.titles
            .get_or_try_fetch(&id, || async move {
                let record = self.jikan.get_manga_full(id).await?;
                Ok(mapping::title_from_record(&record))
            })
            .await
    }

    /// Resolve the title against the hosting API and fetch its chapter list.
    /// Failures degrade to an empty list (logged, retried on the next call);
    /// a resolution miss is indistinguishable from a title with no chapters.
    pub async fn chapters(&self, title_id: u32) -> ChapterList {
        match self.try_chapters(title_id).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(title_id, error = %format!("{e:?}"), "failed to fetch chapters");
                ChapterList::empty()
            }
        }
    }

    async fn try_chapters(&self, title_id: u32) -> anyhow::Result<ChapterList> {
        self.chapters
            .get_or_try_fetch(&title_id, || async move {
                let Some(hosting_id) = self.resolver.resolve(title_id).await? else {
                    tracing::debug!(title_id, "title unresolved, empty chapter list");
                    return Ok(ChapterList::empty());
                };
                self.chapter_lists.list_chapters(&hosting_id).await
            })
            .await
    }

    /// Build a reader session over the title's chapter list and open the
    /// requested chapter.
    pub async fn open_reader(
        &self,
        title_id: u32,
        chapter_id: Uuid,
    ) -> anyhow::Result<ReaderSession> {
        let title = self.title(title_id).await?;
        let chapters = self.chapters(title_id).await;
        let mut session = ReaderSession::new(
            title.preferred_title(),
            chapters,
            Arc::clone(&self.mangadex),
            Arc::clone(&self.prober),
        );
        session.open_chapter(chapter_id).await?;
        Ok(session)
    }
}
