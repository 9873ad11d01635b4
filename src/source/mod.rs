//! Content source port
//!
//! Everything the site needs from the headless content API goes through
//! [`ContentSource`]. `PrismicClient` is the HTTP implementation; tests use
//! an in-memory one.

mod prismic;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;

use crate::content::{PostDetail, PostPage, PostSummary};
use crate::error::ContentError;

pub use prismic::PrismicClient;

/// Which neighbor of a post to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Closest older post (publication date descending)
    Previous,
    /// Closest newer post (publication date ascending)
    Next,
}

/// Parameters of a listing query
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub page_size: usize,
    /// Data fields to project; empty fetches everything
    pub fields: Vec<String>,
    /// Content ref to query; `None` means the published (master) ref
    pub content_ref: Option<String>,
}

impl ListQuery {
    /// Listing projection for `doc_type`: title, subtitle and author
    pub fn summaries(doc_type: &str, page_size: usize, content_ref: Option<&str>) -> Self {
        Self {
            page_size,
            fields: ["title", "subtitle", "author"]
                .iter()
                .map(|f| format!("{}.{}", doc_type, f))
                .collect(),
            content_ref: content_ref.map(str::to_string),
        }
    }
}

/// Adjacent posts of a given post
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Neighbors {
    pub previous: Option<PostSummary>,
    pub next: Option<PostSummary>,
}

/// Read access to the content API
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// First page of documents of `doc_type`, newest first
    async fn list_by_type(&self, doc_type: &str, query: &ListQuery)
        -> Result<PostPage, ContentError>;

    /// Follow a `next_page` cursor
    async fn fetch_page(&self, cursor: &str) -> Result<PostPage, ContentError>;

    /// Full document by its URL-safe identifier
    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        content_ref: Option<&str>,
    ) -> Result<PostDetail, ContentError>;

    /// Document by its API identifier (used to resolve preview links)
    async fn get_by_id(&self, id: &str, content_ref: Option<&str>)
        -> Result<PostSummary, ContentError>;

    /// The single document adjacent to `anchor_id`, excluding the anchor
    async fn query_neighbor(
        &self,
        doc_type: &str,
        anchor_id: &str,
        direction: Direction,
        content_ref: Option<&str>,
    ) -> Result<Option<PostSummary>, ContentError>;
}

/// Fetch both neighbors of a post concurrently. A neighbor equal to the
/// anchor itself is discarded.
pub async fn neighbors<S: ContentSource + ?Sized>(
    source: &S,
    doc_type: &str,
    anchor_id: &str,
    content_ref: Option<&str>,
) -> Result<Neighbors, ContentError> {
    let (previous, next) = tokio::try_join!(
        source.query_neighbor(doc_type, anchor_id, Direction::Previous, content_ref),
        source.query_neighbor(doc_type, anchor_id, Direction::Next, content_ref),
    )?;

    let not_anchor = |p: &PostSummary| p.id != anchor_id;
    Ok(Neighbors {
        previous: previous.filter(not_anchor),
        next: next.filter(not_anchor),
    })
}
