// Hosting API (MangaDex v5) client: title search, chapter feed, chapter
// metadata, at-home page-server descriptors.

use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Deserialize;
use uuid::Uuid;

use crate::fetch::RateLimitedClient;

/// Feed is restricted to one translated language.
pub const FEED_LANGUAGE: &str = "en";
/// Page-size ceiling per feed fetch; the chapter list is capped at this too.
pub const FEED_LIMIT: u32 = 100;
/// Candidate ceiling for title search during resolution.
pub const SEARCH_LIMIT: u32 = 5;

#[derive(Debug)]
pub struct MangaDexClient {
    base_url: String,
    client: RateLimitedClient,
}

impl MangaDexClient {
    pub fn new(base_url: impl Into<String>, client: RateLimitedClient) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::debug!(base_url = %base_url, "creating MangaDexClient");
        MangaDexClient { base_url, client }
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .with_context(|| format!("invalid mangadex url for {path}"))
    }

    /// GET /manga?title=&limit=
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn search_manga(
        &self,
        title: &str,
        limit: u32,
    ) -> anyhow::Result<Vec<MangaRecord>> {
        let mut url = self.url("/manga")?;
        url.query_pairs_mut()
            .append_pair("title", title)
            .append_pair("limit", &limit.to_string());
        let resp = self.client.get(url).await?;
        if !resp.status().is_success() {
            anyhow::bail!("mangadex search returned {}", resp.status());
        }
        let body: MangaDexList<MangaRecord> = resp.json().await?;
        Ok(body.data)
    }

    /// GET /manga/{id}/feed?translatedLanguage[]=en&order[chapter]=asc&limit=100
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn feed(&self, manga_id: &Uuid) -> anyhow::Result<Vec<ChapterRecord>> {
        let mut url = self.url(&format!("/manga/{manga_id}/feed"))?;
        url.query_pairs_mut()
            .append_pair("translatedLanguage[]", FEED_LANGUAGE)
            .append_pair("order[chapter]", "asc")
            .append_pair("limit", &FEED_LIMIT.to_string());
        let resp = self.client.get(url).await?;
        if !resp.status().is_success() {
            anyhow::bail!("mangadex feed for {manga_id} returned {}", resp.status());
        }
        let body = resp.text().await?;
        match serde_json::from_str::<MangaDexList<ChapterRecord>>(&body) {
            Ok(parsed) => Ok(parsed.data),
            Err(e) => {
                tracing::error!(error = %e, body_snippet = %body_snippet(&body), "failed to parse chapter feed");
                Err(e.into())
            }
        }
    }

    /// GET /chapter/{id}
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_chapter(&self, chapter_id: &Uuid) -> anyhow::Result<ChapterRecord> {
        let url = self.url(&format!("/chapter/{chapter_id}"))?;
        let resp = self.client.get(url).await?;
        if !resp.status().is_success() {
            anyhow::bail!("mangadex chapter {chapter_id} returned {}", resp.status());
        }
        let body: MangaDexEntity<ChapterRecord> = resp.json().await?;
        Ok(body.data)
    }

    /// GET /at-home/server/{id}
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn at_home_server(&self, chapter_id: &Uuid) -> anyhow::Result<AtHomeResponse> {
        let url = self.url(&format!("/at-home/server/{chapter_id}"))?;
        let resp = self.client.get(url).await?;
        if !resp.status().is_success() {
            anyhow::bail!("mangadex at-home for {chapter_id} returned {}", resp.status());
        }
        let body: AtHomeResponse = resp.json().await?;
        Ok(body)
    }
}

const SNIPPET_MAX_BYTES: usize = 2000;

/// Prefix of an unparseable body for the error log. Bodies carry multibyte
/// titles, so the cut must land on a char boundary.
fn body_snippet(body: &str) -> &str {
    if body.len() <= SNIPPET_MAX_BYTES {
        return body;
    }
    let mut end = SNIPPET_MAX_BYTES;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[derive(Debug, Clone, Deserialize)]
pub struct MangaDexEntity<T> {
    pub result: String,
    pub response: Option<String>,
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MangaDexList<T> {
    pub result: String,
    pub data: Vec<T>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub total: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChapterRecord {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: ChapterAttributes,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterAttributes {
    pub volume: Option<String>,
    pub chapter: Option<String>,
    pub title: Option<String>,
    pub translated_language: Option<String>,
    pub external_url: Option<String>,
    pub publish_at: Option<DateTime<Utc>>,
    pub readable_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub version: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MangaRecord {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: MangaAttributes,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MangaAttributes {
    #[serde(default)]
    pub title: HashMap<String, String>,
    #[serde(default)]
    pub alt_titles: Vec<HashMap<String, String>>,
    #[serde(default)]
    pub description: HashMap<String, String>,
    pub status: Option<String>,
    pub year: Option<i32>,
    pub original_language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtHomeResponse {
    pub result: String,
    pub base_url: String,
    pub chapter: AtHomeChapter,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AtHomeChapter {
    pub hash: String,
    #[serde(default)]
    pub data: Vec<String>,
    #[serde(rename = "dataSaver", default)]
    pub data_saver: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_snippet_respects_char_boundaries() {
        // A two-byte character straddling the cutoff must not split.
        let mut body = "a".repeat(SNIPPET_MAX_BYTES - 1);
        body.push('é');
        body.push_str("残りの本文");
        assert!(body.len() > SNIPPET_MAX_BYTES);

        let snippet = body_snippet(&body);
        assert_eq!(snippet.len(), SNIPPET_MAX_BYTES - 1);
        assert!(snippet.chars().all(|c| c == 'a'));

        // Short bodies come back whole.
        assert_eq!(body_snippet("ベルセルク"), "ベルセルク");

        // A boundary exactly at the cutoff keeps the full prefix.
        let exact = "a".repeat(SNIPPET_MAX_BYTES + 10);
        assert_eq!(body_snippet(&exact).len(), SNIPPET_MAX_BYTES);
    }

    #[test]
    fn chapter_record_deserialize() {
        let json = r#"{
            "result": "ok",
            "response": "entity",
            "data": {
                "id": "0f5b6b1b-66b2-4d4f-a1b7-0e3c11e58d64",
                "type": "chapter",
                "attributes": {
                    "volume": "1",
                    "chapter": "12.5",
                    "title": "Extra",
                    "translatedLanguage": "en",
                    "externalUrl": null,
                    "publishAt": "2021-05-28T20:32:02+00:00",
                    "readableAt": "2021-05-28T20:32:02+00:00",
                    "createdAt": "2021-05-28T20:31:57+00:00",
                    "updatedAt": "2021-05-28T20:32:02+00:00",
                    "pages": 19,
                    "version": 3
                },
                "relationships": []
            }
        }"#;

        let parsed: MangaDexEntity<ChapterRecord> = serde_json::from_str(json).expect("deserialize");
        let chapter = parsed.data;
        assert_eq!(chapter.attributes.chapter.as_deref(), Some("12.5"));
        assert_eq!(chapter.attributes.pages, 19);
        assert_eq!(chapter.attributes.translated_language.as_deref(), Some("en"));
        assert!(chapter.attributes.publish_at.is_some());
    }

    #[test]
    fn chapter_record_tolerates_nulls() {
        let json = r#"{
            "id": "32d76d19-8a05-4db0-9fc2-e0b0648fe9f0",
            "type": "chapter",
            "attributes": {
                "volume": null,
                "chapter": null,
                "title": null,
                "translatedLanguage": "en",
                "externalUrl": null,
                "publishAt": null,
                "readableAt": null,
                "createdAt": null,
                "updatedAt": null,
                "pages": 0,
                "version": 1
            }
        }"#;

        let chapter: ChapterRecord = serde_json::from_str(json).expect("deserialize");
        assert!(chapter.attributes.chapter.is_none());
        assert_eq!(chapter.attributes.pages, 0);
    }

    #[test]
    fn at_home_deserialize() {
        let json = r#"{
            "result": "ok",
            "baseUrl": "https://uploads.mangadex.org",
            "chapter": {
                "hash": "3303dd03ac8d27452cce3f2a882e94b2",
                "data": ["1-abc.png", "2-def.png"],
                "dataSaver": ["1-abc.jpg", "2-def.jpg"]
            }
        }"#;

        let parsed: AtHomeResponse = serde_json::from_str(json).expect("deserialize");
        assert_eq!(parsed.base_url, "https://uploads.mangadex.org");
        assert_eq!(parsed.chapter.data.len(), 2);
        assert_eq!(parsed.chapter.data_saver[1], "2-def.jpg");
    }

    #[test]
    fn search_response_deserialize() {
        let json = r#"{
            "result": "ok",
            "response": "collection",
            "data": [
                {
                    "id": "801513ba-a712-498c-8f57-cae55b38cc92",
                    "type": "manga",
                    "attributes": {
                        "title": { "en": "Berserk" },
                        "altTitles": [{ "ja": "ベルセルク" }],
                        "description": { "en": "His name is Guts." },
                        "status": "ongoing",
                        "year": 1989,
                        "originalLanguage": "ja"
                    }
                }
            ],
            "limit": 5,
            "offset": 0,
            "total": 1
        }"#;

        let parsed: MangaDexList<MangaRecord> = serde_json::from_str(json).expect("deserialize");
        assert_eq!(parsed.total, Some(1));
        let manga = &parsed.data[0];
        assert_eq!(manga.attributes.title.get("en").map(String::as_str), Some("Berserk"));
        assert_eq!(manga.attributes.year, Some(1989));
    }
}
