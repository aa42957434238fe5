// Metadata API (Jikan v4) client: title detail, top listings, text search.

use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Deserialize;

use crate::fetch::RateLimitedClient;

/// Default page size for listing/search endpoints.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug)]
pub struct JikanClient {
    base_url: String,
    client: RateLimitedClient,
}

impl JikanClient {
    pub fn new(base_url: impl Into<String>, client: RateLimitedClient) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::debug!(base_url = %base_url, "creating JikanClient");
        JikanClient { base_url, client }
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .with_context(|| format!("invalid jikan url for {path}"))
    }

    /// GET /manga/{id}
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_manga(&self, id: u32) -> anyhow::Result<MangaRecord> {
        self.fetch_manga(&format!("/manga/{id}")).await
    }

    /// GET /manga/{id}/full
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_manga_full(&self, id: u32) -> anyhow::Result<MangaRecord> {
        self.fetch_manga(&format!("/manga/{id}/full")).await
    }

    async fn fetch_manga(&self, path: &str) -> anyhow::Result<MangaRecord> {
        let url = self.url(path)?;
        let resp = self.client.get(url).await?;
        if !resp.status().is_success() {
            anyhow::bail!("jikan {path} returned {}", resp.status());
        }
        let body: JikanData<MangaRecord> = resp.json().await?;
        Ok(body.data)
    }

    /// GET /top/manga?page=&limit=
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn top_manga(&self, page: u32, limit: u32) -> anyhow::Result<Vec<MangaRecord>> {
        let mut url = self.url("/top/manga")?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());
        self.fetch_listing(url).await
    }

    /// GET /manga?q=&page=&limit=
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn search_manga(
        &self,
        query: &str,
        page: u32,
        limit: u32,
    ) -> anyhow::Result<Vec<MangaRecord>> {
        let mut url = self.url("/manga")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());
        self.fetch_listing(url).await
    }

    async fn fetch_listing(&self, url: Url) -> anyhow::Result<Vec<MangaRecord>> {
        let resp = self.client.get(url).await?;
        if !resp.status().is_success() {
            anyhow::bail!("jikan listing returned {}", resp.status());
        }
        let body: JikanPage<MangaRecord> = resp.json().await?;
        Ok(body.data)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanData<T> {
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanPage<T> {
    pub data: Vec<T>,
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    pub last_visible_page: Option<u32>,
    pub has_next_page: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MangaRecord {
    pub mal_id: u32,
    pub title: String,
    pub title_english: Option<String>,
    pub title_japanese: Option<String>,
    #[serde(default)]
    pub images: Images,
    pub synopsis: Option<String>,
    pub score: Option<f64>,
    pub chapters: Option<u32>,
    pub volumes: Option<u32>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub published: Option<Published>,
    #[serde(default)]
    pub authors: Vec<NamedRef>,
    #[serde(default)]
    pub genres: Vec<NamedRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Images {
    #[serde(default)]
    pub jpg: ImageSet,
    #[serde(default)]
    pub webp: ImageSet,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageSet {
    pub image_url: Option<String>,
    pub small_image_url: Option<String>,
    pub large_image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Published {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedRef {
    pub name: String,
}
