//! Generate static files

use anyhow::Result;

use crate::generator::Generator;
use crate::Blog;

/// Generate the static site from the configured repository
pub async fn run(blog: &Blog) -> Result<()> {
    let start = std::time::Instant::now();

    let source = blog.source()?;
    tracing::info!("Fetching posts from {}", blog.config.prismic.endpoint);

    let generated = Generator::new(blog, source)?.generate().await?;
    if generated.skipped > 0 {
        tracing::warn!("Skipped {} posts", generated.skipped);
    }

    let duration = start.elapsed();
    tracing::info!(
        "Generated {} posts and {} listing pages in {:.2}s",
        generated.posts,
        generated.listing_pages,
        duration.as_secs_f64()
    );

    Ok(())
}
