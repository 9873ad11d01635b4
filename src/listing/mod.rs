//! Post listing aggregator
//!
//! A [`Listing`] starts from the first page of summaries and grows by one
//! page per [`Listing::load_more`] call. Pages are only ever appended, so
//! whatever a reader has already seen keeps its position.
//!
//! `load_more` takes `&mut self`: a listing owned by one caller cannot run
//! two loads at once. [`SharedListing`] is the version for concurrent
//! callers; it serializes loads and never fetches the same page twice.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::content::{PostPage, PostSummary};
use crate::error::ContentError;
use crate::helpers::{is_valid_uid, Localizer};
use crate::source::{ContentSource, ListQuery};

/// A post as shown in the listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedPost {
    pub id: String,
    pub uid: Option<String>,
    pub first_publication_date: Option<DateTime<Utc>>,
    /// `first_publication_date` formatted for display, e.g. `15 jun 2021`
    pub date: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl ListedPost {
    fn from_summary(post: PostSummary, localizer: &Localizer) -> Self {
        let uid = post.uid.filter(|uid| {
            let valid = is_valid_uid(uid);
            if !valid {
                tracing::warn!("Post {} has an unusable uid {:?}", post.id, uid);
            }
            valid
        });
        Self {
            date: post.first_publication_date.as_ref().map(|d| localizer.date(d)),
            id: post.id,
            uid,
            first_publication_date: post.first_publication_date,
            title: post.data.title,
            subtitle: post.data.subtitle,
            author: post.data.author,
        }
    }
}

/// Outcome of a load request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// A page was fetched; this many posts were appended
    Appended(usize),
    /// No cursor left; nothing was fetched
    Exhausted,
}

/// Serializable snapshot of a listing (or of its first pages)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingView {
    pub posts: Vec<ListedPost>,
    /// Number of pages included in `posts`
    pub pages: usize,
    pub has_more: bool,
}

pub struct Listing {
    posts: Vec<ListedPost>,
    next_page: Option<String>,
    /// `posts.len()` after each loaded page
    page_ends: Vec<usize>,
    localizer: Arc<Localizer>,
}

impl Listing {
    /// Build a listing from its first page
    pub fn new(first: PostPage, localizer: Arc<Localizer>) -> Self {
        let mut listing = Self {
            posts: Vec::new(),
            next_page: None,
            page_ends: Vec::new(),
            localizer,
        };
        listing.append(first);
        listing
    }

    /// Fetch the first page of `doc_type` and build a listing from it
    pub async fn fetch<S: ContentSource + ?Sized>(
        source: &S,
        doc_type: &str,
        page_size: usize,
        content_ref: Option<&str>,
        localizer: Arc<Localizer>,
    ) -> Result<Self, ContentError> {
        let query = ListQuery::summaries(doc_type, page_size, content_ref);
        let first = source.list_by_type(doc_type, &query).await?;
        Ok(Self::new(first, localizer))
    }

    pub fn posts(&self) -> &[ListedPost] {
        &self.posts
    }

    pub fn next_page(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    /// Whether a further page exists; callers offer "load more" only then
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    pub fn pages_loaded(&self) -> usize {
        self.page_ends.len()
    }

    /// Fetch the page behind the cursor and append it.
    ///
    /// On error the listing is left exactly as it was, so the call can be
    /// repeated.
    pub async fn load_more<S: ContentSource + ?Sized>(
        &mut self,
        source: &S,
    ) -> Result<LoadMore, ContentError> {
        let Some(cursor) = self.next_page.clone() else {
            return Ok(LoadMore::Exhausted);
        };

        tracing::debug!("Loading listing page {}", self.pages_loaded() + 1);
        let page = source.fetch_page(&cursor).await?;
        Ok(LoadMore::Appended(self.append(page)))
    }

    /// Snapshot of everything loaded so far
    pub fn view(&self) -> ListingView {
        self.view_pages(self.pages_loaded())
    }

    /// Snapshot limited to the first `pages` pages
    pub fn view_pages(&self, pages: usize) -> ListingView {
        let pages = pages.min(self.pages_loaded());
        let end = match pages {
            0 => 0,
            n => self.page_ends[n - 1],
        };
        ListingView {
            posts: self.posts[..end].to_vec(),
            pages,
            has_more: pages < self.pages_loaded() || self.has_more(),
        }
    }

    fn append(&mut self, page: PostPage) -> usize {
        let known: HashSet<&str> = self.posts.iter().map(|p| p.id.as_str()).collect();
        let fresh: Vec<ListedPost> = page
            .results
            .into_iter()
            .filter(|p| {
                let duplicate = known.contains(p.id.as_str());
                if duplicate {
                    tracing::debug!("Skipping {} already in the listing", p.id);
                }
                !duplicate
            })
            .map(|p| ListedPost::from_summary(p, &self.localizer))
            .collect();

        let added = fresh.len();
        self.posts.extend(fresh);
        self.page_ends.push(self.posts.len());
        self.next_page = page.next_page.filter(|c| !c.trim().is_empty());
        added
    }
}

/// A listing shared between concurrent callers
pub struct SharedListing {
    inner: Mutex<Listing>,
}

impl SharedListing {
    pub fn new(listing: Listing) -> Self {
        Self {
            inner: Mutex::new(listing),
        }
    }

    /// Load pages until at least `pages` are present or the cursor runs out,
    /// then return a view of the first `pages` pages.
    ///
    /// Callers wait for each other, so a page requested by two callers at
    /// once is fetched a single time.
    pub async fn ensure_pages<S: ContentSource + ?Sized>(
        &self,
        source: &S,
        pages: usize,
    ) -> Result<ListingView, ContentError> {
        let mut listing = self.inner.lock().await;
        while listing.pages_loaded() < pages {
            if listing.load_more(source).await? == LoadMore::Exhausted {
                break;
            }
        }
        Ok(listing.view_pages(pages))
    }

    pub async fn view(&self) -> ListingView {
        self.inner.lock().await.view()
    }
}
