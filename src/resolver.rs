// Cross-catalog resolver: joins a metadata-API title id to the hosting API's
// own id for the same work via a best-effort title search.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use crate::jikan_client::JikanClient;
use crate::mangadex_client::{MangaDexClient, SEARCH_LIMIT};
use crate::memo::MemoMap;

/// Metadata side of resolution: the search query for a title id.
#[async_trait]
pub trait QuerySource: Send + Sync {
    async fn search_query(&self, title_id: u32) -> anyhow::Result<String>;
}

#[async_trait]
impl QuerySource for JikanClient {
    async fn search_query(&self, title_id: u32) -> anyhow::Result<String> {
        let record = self
            .get_manga(title_id)
            .await
            .with_context(|| format!("failed to fetch title {title_id} from metadata API"))?;
        Ok(record.title_english.unwrap_or(record.title))
    }
}

/// Hosting side of resolution: candidate ids for a title query, best first.
#[async_trait]
pub trait CandidateSearch: Send + Sync {
    async fn candidates(&self, query: &str) -> anyhow::Result<Vec<Uuid>>;
}

#[async_trait]
impl CandidateSearch for MangaDexClient {
    async fn candidates(&self, query: &str) -> anyhow::Result<Vec<Uuid>> {
        let records = self.search_manga(query, SEARCH_LIMIT).await?;
        Ok(records.iter().map(|record| record.id).collect())
    }
}

/// At most one resolution attempt per title id per session: concurrent and
/// repeated `resolve` calls for one id share a single underlying search.
/// A metadata-API failure is returned to the caller and not memoized, so the
/// next explicit attempt retries; a hosting-API miss (search failure or zero
/// candidates) memoizes as `None` and degrades to an empty chapter set
/// downstream.
pub struct Resolver {
    metadata: Arc<dyn QuerySource>,
    hosting: Arc<dyn CandidateSearch>,
    resolved: MemoMap<u32, Option<Uuid>>,
}

impl Resolver {
    pub fn new(metadata: Arc<dyn QuerySource>, hosting: Arc<dyn CandidateSearch>) -> Self {
        Resolver {
            metadata,
            hosting,
            resolved: MemoMap::new(),
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn resolve(&self, title_id: u32) -> anyhow::Result<Option<Uuid>> {
        self.resolved
            .get_or_try_fetch(&title_id, || self.lookup(title_id))
            .await
    }

    async fn lookup(&self, title_id: u32) -> anyhow::Result<Option<Uuid>> {
        let query = self.metadata.search_query(title_id).await?;

        let candidates = match self.hosting.candidates(&query).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(title_id, query = %query, error = %format!("{e:?}"), "hosting search failed, treating title as unavailable");
                return Ok(None);
            }
        };

        // First search result wins. This is a known-lossy heuristic: no score
        // threshold, no disambiguation.
        match candidates.first() {
            Some(&id) => {
                tracing::debug!(title_id, hosting_id = %id, query = %query, "resolved title");
                Ok(Some(id))
            }
            None => {
                tracing::debug!(title_id, query = %query, "no hosting candidates");
                Ok(None)
            }
        }
    }
}
