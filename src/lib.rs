//! Client-side orchestration over two public manga catalog APIs: a metadata
//! API (title detail, listings, search, numeric ids) and a chapter-hosting
//! API (title search, chapter feeds, page servers, UUID ids).
//!
//! The pieces, leaves first: [`fetch`] wraps HTTP with per-origin request
//! pacing and retry/backoff; [`domain::mapping`] normalizes both provider
//! schemas into one chapter/page model; [`resolver`] joins a metadata title
//! to its hosting counterpart by title search; [`chapters`] fetches and
//! orders the chapter feed; [`reader`] runs the open-chapter session (page
//! preloading, navigation, keyboard events). [`bridge::MangaBridge`] wires
//! it all from [`config::Config`].

pub mod bridge;
pub mod chapters;
pub mod config;
pub mod domain;
pub mod fetch;
pub mod jikan_client;
pub mod logging;
pub mod mangadex_client;
pub mod memo;
pub mod reader;
pub mod resolver;

pub use bridge::MangaBridge;
pub use chapters::{ChapterList, ChapterListManager};
pub use config::Config;
pub use domain::models::{ChapterSummary, ChapterWithPages, Page, PageState, Title};
pub use fetch::{RateLimitedClient, RateLimiter, RetryPolicy};
pub use reader::{HttpPageProber, Key, PageProber, ReaderEvent, ReaderSession, ReaderState};
pub use resolver::{CandidateSearch, QuerySource, Resolver};
