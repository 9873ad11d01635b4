//! In-memory content source for tests
//!
//! Holds full posts, serves them newest first in pages, and can be told to
//! fail or to respond slowly.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{ContentSource, Direction, ListQuery};
use crate::content::{
    Banner, DetailData, Document, PostDetail, PostPage, PostSummary, RichText, RichTextBlock,
    Section,
};
use crate::error::ContentError;

/// Build a post whose id and uid are both `uid`, first published on
/// 2021-01-`day` at 10:00 UTC
pub fn detail(uid: &str, title: &str, day: u32) -> PostDetail {
    let published = Utc
        .with_ymd_and_hms(2021, 1, day, 10, 0, 0)
        .single()
        .unwrap_or_default();
    Document {
        id: uid.to_string(),
        uid: Some(uid.to_string()),
        doc_type: "posts".to_string(),
        first_publication_date: Some(published),
        last_publication_date: Some(published),
        data: DetailData {
            title: title.to_string(),
            banner: Banner {
                url: Some(format!("https://images.example.com/{}.png", uid)),
                alt: None,
            },
            author: "Joseph Oliveira".to_string(),
            content: vec![Section {
                heading: Some(title.to_string()),
                body: RichText(vec![RichTextBlock::paragraph("Lorem ipsum dolor sit amet.")]),
            }],
        },
    }
}

#[derive(Default)]
pub struct MemorySource {
    posts: Vec<PostDetail>,
    previews: HashMap<String, Vec<PostDetail>>,
    failures: AtomicUsize,
    page_fetches: AtomicUsize,
    detail_fetches: AtomicUsize,
    delay: Option<Duration>,
}

impl MemorySource {
    pub fn new(posts: Vec<PostDetail>) -> Self {
        Self {
            posts,
            ..Default::default()
        }
    }

    /// Serve `posts` instead of the published ones when queried with `content_ref`
    pub fn with_preview(mut self, content_ref: &str, posts: Vec<PostDetail>) -> Self {
        self.previews.insert(content_ref.to_string(), posts);
        self
    }

    /// Sleep this long before answering page and post requests
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make the next `n` calls fail with a transport error
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Number of listing pages served so far
    pub fn page_fetches(&self) -> usize {
        self.page_fetches.load(Ordering::SeqCst)
    }

    /// Number of single-post lookups served so far
    pub fn detail_fetches(&self) -> usize {
        self.detail_fetches.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), ContentError> {
        let fail = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            Err(ContentError::Transport("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }

    /// Posts visible under `content_ref`, newest first
    fn visible(&self, content_ref: Option<&str>) -> Vec<&PostDetail> {
        let posts = content_ref
            .and_then(|r| self.previews.get(r))
            .unwrap_or(&self.posts);
        let mut sorted: Vec<&PostDetail> = posts.iter().collect();
        sorted.sort_by(|a, b| b.first_publication_date.cmp(&a.first_publication_date));
        sorted
    }

    fn page(&self, content_ref: Option<&str>, page: usize, size: usize) -> PostPage {
        let size = size.max(1);
        let posts = self.visible(content_ref);
        let start = ((page - 1) * size).min(posts.len());
        let end = (start + size).min(posts.len());
        let next_page = (end < posts.len()).then(|| {
            format!("memory:{}:{}:{}", content_ref.unwrap_or(""), page + 1, size)
        });
        PostPage {
            results: posts[start..end].iter().map(|p| p.summary()).collect(),
            next_page,
        }
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn list_by_type(
        &self,
        _doc_type: &str,
        query: &ListQuery,
    ) -> Result<PostPage, ContentError> {
        self.pause().await;
        self.check_failure()?;
        self.page_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.page(query.content_ref.as_deref(), 1, query.page_size))
    }

    async fn fetch_page(&self, cursor: &str) -> Result<PostPage, ContentError> {
        self.pause().await;
        self.check_failure()?;

        let parts: Vec<&str> = cursor
            .strip_prefix("memory:")
            .map(|rest| rest.rsplitn(3, ':').collect())
            .unwrap_or_default();
        let (size, page, content_ref) = match parts.as_slice() {
            [size, page, content_ref] => (size, page, content_ref),
            _ => return Err(ContentError::MalformedResponse(format!("bad cursor {}", cursor))),
        };
        let size: usize = size
            .parse()
            .map_err(|_| ContentError::MalformedResponse(cursor.to_string()))?;
        let page: usize = page
            .parse()
            .map_err(|_| ContentError::MalformedResponse(cursor.to_string()))?;
        let content_ref = Some(*content_ref).filter(|r| !r.is_empty());

        self.page_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.page(content_ref, page.max(1), size))
    }

    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        content_ref: Option<&str>,
    ) -> Result<PostDetail, ContentError> {
        self.pause().await;
        self.check_failure()?;
        self.detail_fetches.fetch_add(1, Ordering::SeqCst);
        self.visible(content_ref)
            .into_iter()
            .find(|p| p.uid.as_deref() == Some(uid))
            .cloned()
            .ok_or_else(|| ContentError::NotFound(format!("{}/{}", doc_type, uid)))
    }

    async fn get_by_id(
        &self,
        id: &str,
        content_ref: Option<&str>,
    ) -> Result<PostSummary, ContentError> {
        self.check_failure()?;
        self.visible(content_ref)
            .into_iter()
            .find(|p| p.id == id)
            .map(|p| p.summary())
            .ok_or_else(|| ContentError::NotFound(id.to_string()))
    }

    async fn query_neighbor(
        &self,
        _doc_type: &str,
        anchor_id: &str,
        direction: Direction,
        content_ref: Option<&str>,
    ) -> Result<Option<PostSummary>, ContentError> {
        self.check_failure()?;
        // newest first
        let posts = self.visible(content_ref);
        let Some(pos) = posts.iter().position(|p| p.id == anchor_id) else {
            return Ok(None);
        };
        let neighbor = match direction {
            Direction::Previous => posts.get(pos + 1),
            Direction::Next => pos.checked_sub(1).and_then(|i| posts.get(i)),
        };
        Ok(neighbor.map(|p| p.summary()))
    }
}
