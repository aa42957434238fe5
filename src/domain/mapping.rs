// Mapping from provider DTOs to domain models. Pure functions, no I/O.

use super::models::{ChapterSummary, ChapterWithPages, Page, Title};
use crate::jikan_client;
use crate::mangadex_client::{AtHomeResponse, ChapterRecord};

/// Numeric interpretation of a chapter ordinal. Non-numeric or NaN ordinals
/// fall back to 0.0; their relative order is undefined. This matches observed
/// provider behavior, do not tighten it here.
pub fn chapter_ordinal(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| !v.is_nan())
        .unwrap_or(0.0)
}

/// A hosting-API feed record reduced to the summary form. A missing ordinal
/// defaults to "0".
pub fn chapter_summary(record: &ChapterRecord) -> ChapterSummary {
    let attrs = &record.attributes;
    ChapterSummary {
        id: record.id,
        chapter: attrs.chapter.clone().unwrap_or_else(|| "0".to_string()),
        title: attrs.title.clone(),
        volume: attrs.volume.clone(),
        page_count: (attrs.pages > 0).then_some(attrs.pages),
        publish_at: attrs.publish_at,
        readable_at: attrs.readable_at,
    }
}

/// Full page URLs from an at-home descriptor: `{base}/data/{hash}/{file}`.
/// Source order is reading order and is preserved exactly.
pub fn page_urls(response: &AtHomeResponse) -> Vec<String> {
    let base = response.base_url.trim_end_matches('/');
    let hash = &response.chapter.hash;
    response
        .chapter
        .data
        .iter()
        .map(|file| format!("{base}/data/{hash}/{file}"))
        .collect()
}

/// An opened chapter: metadata from the chapter record, pages (all pending)
/// from the at-home descriptor.
pub fn chapter_with_pages(record: &ChapterRecord, at_home: &AtHomeResponse) -> ChapterWithPages {
    ChapterWithPages {
        id: record.id,
        chapter: record
            .attributes
            .chapter
            .clone()
            .unwrap_or_else(|| "0".to_string()),
        title: record.attributes.title.clone(),
        pages: page_urls(at_home).into_iter().map(Page::new).collect(),
    }
}

pub fn title_from_record(record: &jikan_client::MangaRecord) -> Title {
    let cover_url = record
        .images
        .webp
        .image_url
        .clone()
        .or_else(|| record.images.jpg.image_url.clone());
    Title {
        id: record.mal_id,
        title: record.title.clone(),
        title_english: record.title_english.clone(),
        title_japanese: record.title_japanese.clone(),
        cover_url,
        synopsis: record.synopsis.clone(),
        score: record.score,
        chapters: record.chapters,
        volumes: record.volumes,
        status: record.status.clone(),
        kind: record.kind.clone(),
        published_from: record.published.as_ref().and_then(|p| p.from),
        published_to: record.published.as_ref().and_then(|p| p.to),
        authors: record.authors.iter().map(|a| a.name.clone()).collect(),
        genres: record.genres.iter().map(|g| g.name.clone()).collect(),
    }
}
