//! List published posts

use anyhow::Result;

use crate::listing::{ListedPost, Listing};
use crate::source::ContentSource;
use crate::Blog;

/// Print every published post, newest first
pub async fn run(blog: &Blog, preview_ref: Option<&str>) -> Result<()> {
    let source = blog.source()?;
    let posts = collect(blog, source.as_ref(), preview_ref).await?;

    println!("Posts ({}):", posts.len());
    for post in &posts {
        println!("  {}", format_line(post));
    }

    Ok(())
}

/// Follow the listing until the cursor runs out
pub async fn collect<S: ContentSource + ?Sized>(
    blog: &Blog,
    source: &S,
    preview_ref: Option<&str>,
) -> Result<Vec<ListedPost>> {
    let prismic = &blog.config.prismic;
    let mut listing = Listing::fetch(
        source,
        &prismic.document_type,
        prismic.page_size,
        preview_ref,
        blog.localizer(),
    )
    .await?;

    while listing.has_more() {
        listing.load_more(source).await?;
    }
    Ok(listing.posts().to_vec())
}

fn format_line(post: &ListedPost) -> String {
    format!(
        "{} - {} [{}]",
        post.date.as_deref().unwrap_or("--"),
        post.title,
        post.uid.as_deref().unwrap_or(&post.id)
    )
}
