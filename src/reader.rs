// Reader session: page preloading, sequencing, chapter navigation, keyboard
// handling. One session per opened reader; closing is terminal.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::chapters::ChapterList;
use crate::domain::mapping;
use crate::domain::models::{ChapterWithPages, PageState};
use crate::mangadex_client::MangaDexClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Idle,
    Loading,
    Ready,
    Closed,
}

/// Keys the reader reacts to while mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Escape,
}

/// Events fed to the session reducer. Probe completions carry the chapter
/// they were issued for so stale completions can be discarded.
#[derive(Debug, Clone)]
pub enum ReaderEvent {
    ProbeSettled {
        chapter_id: Uuid,
        page_index: usize,
        loaded: bool,
    },
}

/// A probe attempts a page load only to detect success or failure; the result
/// is never rendered directly.
#[async_trait]
pub trait PageProber: Send + Sync {
    async fn probe(&self, url: &str) -> bool;
}

/// Production prober: a plain GET against the page CDN. Page loads are not
/// rate limited, matching the browser image preloads this replaces.
#[derive(Debug)]
pub struct HttpPageProber {
    http: reqwest::Client,
}

impl HttpPageProber {
    pub fn new() -> anyhow::Result<Self> {
        Ok(HttpPageProber {
            http: reqwest::Client::builder().build()?,
        })
    }
}

#[async_trait]
impl PageProber for HttpPageProber {
    async fn probe(&self, url: &str) -> bool {
        match self.http.get(url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(url, error = %e, "page probe failed");
                false
            }
        }
    }
}

pub struct ReaderSession {
    title: String,
    chapters: ChapterList,
    mangadex: Arc<MangaDexClient>,
    prober: Arc<dyn PageProber>,
    state: ReaderState,
    current: Option<ChapterWithPages>,
    current_index: Option<usize>,
    chapter_list_open: bool,
    chapter_error: Option<String>,
    events_tx: UnboundedSender<ReaderEvent>,
    events_rx: UnboundedReceiver<ReaderEvent>,
}

impl ReaderSession {
    pub fn new(
        title: impl Into<String>,
        chapters: ChapterList,
        mangadex: Arc<MangaDexClient>,
        prober: Arc<dyn PageProber>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        ReaderSession {
            title: title.into(),
            chapters,
            mangadex,
            prober,
            state: ReaderState::Idle,
            current: None,
            current_index: None,
            chapter_list_open: false,
            chapter_error: None,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn chapters(&self) -> &ChapterList {
        &self.chapters
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_chapter(&self) -> Option<&ChapterWithPages> {
        self.current.as_ref()
    }

    pub fn chapter_error(&self) -> Option<&str> {
        self.chapter_error.as_deref()
    }

    pub fn chapter_list_open(&self) -> bool {
        self.chapter_list_open
    }

    pub fn has_previous(&self) -> bool {
        self.current_index
            .is_some_and(|i| self.chapters.has_previous(i))
    }

    pub fn has_next(&self) -> bool {
        self.current_index.is_some_and(|i| self.chapters.has_next(i))
    }

    /// Render URLs in page-index order; failed pages yield the placeholder.
    /// Completion order never affects placement.
    pub fn display_pages(&self) -> Vec<&str> {
        self.current
            .as_ref()
            .map(|c| c.pages.iter().map(|p| p.display_url()).collect())
            .unwrap_or_default()
    }

    /// Fetches the chapter metadata and page descriptor, then enters Loading
    /// and launches the page probes. On fetch failure the error flag is set
    /// and the session returns to Idle; the caller owns the user-visible
    /// recovery (navigating back to the title view).
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn open_chapter(&mut self, chapter_id: Uuid) -> anyhow::Result<()> {
        if self.state == ReaderState::Closed {
            return Ok(());
        }
        self.chapter_error = None;
        self.state = ReaderState::Loading;

        match self.fetch_chapter(chapter_id).await {
            Ok(chapter) => {
                self.begin_chapter(chapter);
                Ok(())
            }
            Err(e) => {
                tracing::error!(chapter_id = %chapter_id, error = %format!("{e:?}"), "failed to open chapter");
                self.chapter_error = Some(format!("{e:#}"));
                self.state = ReaderState::Idle;
                Err(e)
            }
        }
    }

    async fn fetch_chapter(&self, chapter_id: Uuid) -> anyhow::Result<ChapterWithPages> {
        let record = self.mangadex.get_chapter(&chapter_id).await?;
        let at_home = self.mangadex.at_home_server(&chapter_id).await?;
        Ok(mapping::chapter_with_pages(&record, &at_home))
    }

    /// Enters Loading for a chapter whose page list is already at hand and
    /// launches one probe per page. A chapter with zero pages is Ready
    /// immediately.
    pub fn begin_chapter(&mut self, chapter: ChapterWithPages) {
        if self.state == ReaderState::Closed {
            return;
        }
        self.chapter_error = None;
        self.current_index = self.chapters.index_of(&chapter.id);
        self.state = ReaderState::Loading;

        let chapter_id = chapter.id;
        let total = chapter.pages.len();
        let urls: Vec<String> = chapter.pages.iter().map(|p| p.url.clone()).collect();
        self.current = Some(chapter);

        if total == 0 {
            self.state = ReaderState::Ready;
            return;
        }

        tracing::debug!(chapter_id = %chapter_id, pages = total, "preloading chapter pages");
        for (page_index, url) in urls.into_iter().enumerate() {
            let prober = Arc::clone(&self.prober);
            let events = self.events_tx.clone();
            tokio::spawn(async move {
                let loaded = prober.probe(&url).await;
                // The session may be gone by the time a probe settles.
                let _ = events.send(ReaderEvent::ProbeSettled {
                    chapter_id,
                    page_index,
                    loaded,
                });
            });
        }
    }

    /// Single reducer for all session events. Completions for any chapter
    /// other than the current one are stale and discarded.
    pub fn apply(&mut self, event: ReaderEvent) {
        if self.state == ReaderState::Closed {
            return;
        }
        match event {
            ReaderEvent::ProbeSettled {
                chapter_id,
                page_index,
                loaded,
            } => {
                let Some(current) = self.current.as_mut() else {
                    return;
                };
                if current.id != chapter_id {
                    tracing::trace!(chapter_id = %chapter_id, page_index, "discarding stale probe result");
                    return;
                }
                let Some(page) = current.pages.get_mut(page_index) else {
                    return;
                };
                if page.is_settled() {
                    return;
                }
                page.state = if loaded {
                    PageState::Loaded
                } else {
                    PageState::Failed
                };
                if self.state == ReaderState::Loading
                    && current.pages.iter().all(|p| p.is_settled())
                {
                    tracing::debug!(chapter_id = %chapter_id, "all pages settled");
                    self.state = ReaderState::Ready;
                }
            }
        }
    }

    /// Applies every event already delivered, without blocking.
    pub fn pump(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
        }
    }

    /// Drives the event channel until the current chapter leaves Loading.
    pub async fn wait_until_ready(&mut self) {
        while self.state == ReaderState::Loading {
            match self.events_rx.recv().await {
                Some(event) => self.apply(event),
                None => break,
            }
        }
    }

    /// Opens the next chapter if one exists; strict no-op otherwise.
    pub async fn go_next(&mut self) -> anyhow::Result<()> {
        let Some(index) = self.current_index else {
            return Ok(());
        };
        let Some(next_id) = self.chapters.next(index).map(|c| c.id) else {
            return Ok(());
        };
        self.open_chapter(next_id).await
    }

    /// Opens the previous chapter if one exists; strict no-op otherwise.
    pub async fn go_previous(&mut self) -> anyhow::Result<()> {
        let Some(index) = self.current_index else {
            return Ok(());
        };
        let Some(prev_id) = self.chapters.previous(index).map(|c| c.id) else {
            return Ok(());
        };
        self.open_chapter(prev_id).await
    }

    pub fn toggle_chapter_list(&mut self) {
        if self.state != ReaderState::Closed {
            self.chapter_list_open = !self.chapter_list_open;
        }
    }

    /// Keyboard contract: arrows navigate (suppressed without a neighbor),
    /// escape closes the chapter-list overlay if open, otherwise exits the
    /// reader. A closed session ignores every key, the analog of removing
    /// the global listeners on unmount.
    pub async fn handle_key(&mut self, key: Key) -> anyhow::Result<()> {
        if self.state == ReaderState::Closed {
            return Ok(());
        }
        match key {
            Key::ArrowLeft => self.go_previous().await,
            Key::ArrowRight => self.go_next().await,
            Key::Escape => {
                if self.chapter_list_open {
                    self.chapter_list_open = false;
                } else {
                    self.close();
                }
                Ok(())
            }
        }
    }

    /// Terminal for this session instance; reopening a chapter requires a
    /// fresh session.
    pub fn close(&mut self) {
        self.chapter_list_open = false;
        self.state = ReaderState::Closed;
    }
}
