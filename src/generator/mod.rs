//! Generator module - writes the blog as static HTML using built-in Tera templates
//!
//! The listing is followed page by page: `index.html` holds the first page,
//! `page/N/index.html` everything up to page N, and each one links to the
//! next with the "load more" button. Every listed post gets
//! `post/<uid>/index.html`.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use walkdir::WalkDir;

use crate::error::ContentError;
use crate::helpers::{page_path, post_path, url_for, Localizer};
use crate::listing::{ListedPost, Listing};
use crate::render::DocumentRenderer;
use crate::source::{neighbors, ContentSource};
use crate::templates::{TemplateRenderer, LOGO_PATH, LOGO_SVG};
use crate::Blog;

/// What a generation run produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Generated {
    pub listing_pages: usize,
    pub posts: usize,
    /// Listed posts that had no uid or disappeared before they were fetched
    pub skipped: usize,
}

/// Static site generator
pub struct Generator {
    blog: Blog,
    source: Arc<dyn ContentSource>,
    renderer: TemplateRenderer,
    documents: DocumentRenderer,
    localizer: Arc<Localizer>,
}

impl Generator {
    pub fn new(blog: &Blog, source: Arc<dyn ContentSource>) -> Result<Self> {
        let localizer = blog.localizer();
        let renderer = TemplateRenderer::new(&blog.config, &blog.i18n)?;
        let documents = DocumentRenderer::new(&blog.config, localizer.clone());

        Ok(Self {
            blog: blog.clone(),
            source,
            renderer,
            documents,
            localizer,
        })
    }

    /// Generate the entire site
    pub async fn generate(&self) -> Result<Generated> {
        fs::create_dir_all(&self.blog.public_dir)?;

        self.copy_static_assets()?;

        let listing = self.generate_listing_pages().await?;
        let mut generated = self.generate_post_pages(listing.posts()).await?;
        generated.listing_pages = listing.pages_loaded();

        self.write_page("404.html", &self.renderer.render_not_found(None)?)?;

        Ok(generated)
    }

    /// Home page plus one `page/N/` per further listing page
    async fn generate_listing_pages(&self) -> Result<Listing> {
        let prismic = &self.blog.config.prismic;
        let mut listing = Listing::fetch(
            self.source.as_ref(),
            &prismic.document_type,
            prismic.page_size,
            None,
            self.localizer.clone(),
        )
        .await
        .context("Failed to fetch the first listing page")?;

        loop {
            let page = listing.pages_loaded();
            let next_href = url_for(&self.blog.config, &page_path(page + 1));
            let html = self
                .renderer
                .render_listing(&listing.view(), Some(&next_href), None)?;
            self.write_page(&format!("{}index.html", page_path(page)), &html)?;
            tracing::debug!("Generated listing page {}", page);

            if !listing.has_more() {
                break;
            }
            listing
                .load_more(self.source.as_ref())
                .await
                .with_context(|| format!("Failed to fetch listing page {}", page + 1))?;
        }

        tracing::info!(
            "Generated {} listing pages with {} posts",
            listing.pages_loaded(),
            listing.posts().len()
        );
        Ok(listing)
    }

    /// Generate individual post pages
    async fn generate_post_pages(&self, posts: &[ListedPost]) -> Result<Generated> {
        let doc_type = &self.blog.config.prismic.document_type;
        let mut generated = Generated::default();

        for listed in posts {
            let Some(uid) = listed.uid.as_deref() else {
                tracing::warn!("Post {} has no usable uid, skipping", listed.id);
                generated.skipped += 1;
                continue;
            };

            let post = match self.source.get_by_uid(doc_type, uid, None).await {
                Ok(post) => post,
                Err(ContentError::NotFound(_)) => {
                    tracing::warn!("Post {} is no longer published, skipping", uid);
                    generated.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e).with_context(|| format!("Failed to fetch post {}", uid)),
            };
            let adjacent = neighbors(self.source.as_ref(), doc_type, &post.id, None)
                .await
                .with_context(|| format!("Failed to fetch neighbors of {}", uid))?;

            let view = self.documents.render(&post, &adjacent);
            let html = self.renderer.render_post(Some(&view), None)?;
            self.write_page(&format!("{}index.html", post_path(uid)), &html)?;
            tracing::debug!("Generated post: {}", uid);
            generated.posts += 1;
        }

        tracing::info!("Generated {} posts", generated.posts);
        Ok(generated)
    }

    /// Copy the static directory as-is, then add the default logo if missing
    fn copy_static_assets(&self) -> Result<()> {
        let static_dir = &self.blog.static_dir;

        if static_dir.exists() {
            for entry in WalkDir::new(static_dir)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }

                let relative = path.strip_prefix(static_dir)?;
                let dest = self.blog.public_dir.join(relative);
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(path, &dest)
                    .with_context(|| format!("Failed to copy {:?}", path))?;
            }
        }

        let logo = self.blog.public_dir.join(LOGO_PATH);
        if !logo.exists() {
            write_file(&logo, LOGO_SVG)?;
        }
        Ok(())
    }

    fn write_page(&self, relative: &str, html: &str) -> Result<()> {
        write_file(&self.blog.public_dir.join(relative), html)
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
    }
    fs::write(path, content).map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", path, e))
}
