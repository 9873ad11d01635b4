//! Document renderer: turns a post into display fields
//!
//! Reading time, localized dates, per-section HTML and neighbor links are
//! computed here once, so templates only lay them out.

mod state;

use serde::Serialize;
use std::sync::Arc;

use crate::config::SiteConfig;
use crate::content::{PostDetail, PostSummary, Section};
use crate::helpers::{count_words, date_xml, is_valid_uid, minutes_for, safe_url, Localizer};
use crate::source::Neighbors;

pub use state::PostState;

/// A post ready for the post template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostView {
    pub id: String,
    pub uid: String,
    pub title: String,
    pub author: String,
    /// Banner image, only when it is a web URL
    pub banner: Option<String>,
    /// Plain text of the first section with a body, for the meta description
    pub description: Option<String>,
    /// `15 jun 2021`
    pub published: Option<String>,
    /// ISO 8601 form of the publication date
    pub published_iso: Option<String>,
    /// `* editado em 15 jun 2021, às 07:00`, only for edited posts
    pub edited: Option<String>,
    pub reading_time: usize,
    pub sections: Vec<SectionView>,
    pub previous: Option<NavLink>,
    pub next: Option<NavLink>,
    pub comments: Option<CommentsWidget>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView {
    pub heading: Option<String>,
    /// Sanitized HTML of the body
    pub html: String,
}

/// Link to an adjacent post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavLink {
    pub uid: String,
    pub title: String,
}

impl NavLink {
    fn from_summary(post: &PostSummary) -> Option<Self> {
        Some(Self {
            uid: post.uid.clone().filter(|uid| is_valid_uid(uid))?,
            title: post.data.title.clone(),
        })
    }
}

/// utterances comment thread, rendered as its own container and script
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentsWidget {
    pub repo: String,
    pub issue_term: String,
    pub theme: String,
}

/// Total words of a post: headings plus plain-text bodies
pub fn word_count(content: &[Section]) -> usize {
    content
        .iter()
        .map(|section| {
            let heading = section.heading.as_deref().map(count_words).unwrap_or(0);
            heading + count_words(&section.body.as_text())
        })
        .sum()
}

/// Reading time in whole minutes, rounded up.
///
/// Any post with at least one section reads in at least one minute.
pub fn reading_time(content: &[Section], words_per_minute: usize) -> usize {
    let minutes = minutes_for(word_count(content), words_per_minute);
    if content.is_empty() {
        minutes
    } else {
        minutes.max(1)
    }
}

pub struct DocumentRenderer {
    localizer: Arc<Localizer>,
    words_per_minute: usize,
    comments: Option<CommentsWidget>,
}

impl DocumentRenderer {
    pub fn new(config: &SiteConfig, localizer: Arc<Localizer>) -> Self {
        let comments = config.comments.repo.as_ref().map(|repo| CommentsWidget {
            repo: repo.clone(),
            issue_term: config.comments.issue_term.clone(),
            theme: config.comments.theme.clone(),
        });
        Self {
            localizer,
            words_per_minute: config.words_per_minute,
            comments,
        }
    }

    /// Compute the display fields of `post`
    pub fn render(&self, post: &PostDetail, neighbors: &Neighbors) -> PostView {
        let edited = if post.was_edited() {
            post.last_publication_date
                .as_ref()
                .map(|d| self.localizer.edited(d))
        } else {
            None
        };

        let sections = post
            .data
            .content
            .iter()
            .map(|section| SectionView {
                heading: section.heading.clone().filter(|h| !h.trim().is_empty()),
                html: section.body.as_html(),
            })
            .collect();

        let description = post
            .data
            .content
            .iter()
            .map(|section| section.body.as_text())
            .find(|text| !text.trim().is_empty());

        PostView {
            id: post.id.clone(),
            uid: post.uid.clone().unwrap_or_else(|| post.id.clone()),
            title: post.data.title.clone(),
            author: post.data.author.clone(),
            banner: post
                .data
                .banner
                .url
                .as_deref()
                .and_then(safe_url)
                .map(str::to_string),
            description,
            published: post
                .first_publication_date
                .as_ref()
                .map(|d| self.localizer.date(d)),
            published_iso: post.first_publication_date.as_ref().map(date_xml),
            edited,
            reading_time: reading_time(&post.data.content, self.words_per_minute),
            sections,
            previous: neighbors.previous.as_ref().and_then(NavLink::from_summary),
            next: neighbors.next.as_ref().and_then(NavLink::from_summary),
            comments: self.comments.clone(),
        }
    }
}
