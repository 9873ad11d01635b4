//! Initialize a new blog

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::config::{ACCESS_TOKEN_ENV, ENDPOINT_ENV};
use crate::templates::{LOGO_PATH, LOGO_SVG};

const CONFIG_TEMPLATE: &str = r#"# spacetraveling configuration

# Site
title: spacetraveling
language: pt-BR
timezone: America/Sao_Paulo
words_per_minute: 200

# URL
url: http://localhost:4000
root: /

# Directory
public_dir: public
static_dir: static

# Content API
# The endpoint and access token can also come from the environment or .env
prismic:
  endpoint: https://your-repository.cdn.prismic.io/api/v2
  document_type: posts
  page_size: 10
  timeout_secs: 10

# utterances comments, disabled until a repository is set
comments:
  # repo: owner/blog-comments
  issue_term: pathname
  theme: github-dark

# Local server
server:
  revalidate_secs: 60
  loading_grace_ms: 1500
"#;

/// Initialize a new blog in the given directory.
///
/// Existing files are left untouched.
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir)?;

    write_if_missing(&target_dir.join("_config.yml"), CONFIG_TEMPLATE)?;
    write_if_missing(
        &target_dir.join(".env.example"),
        &format!(
            "{}=https://your-repository.cdn.prismic.io/api/v2\n{}=\n",
            ENDPOINT_ENV, ACCESS_TOKEN_ENV
        ),
    )?;

    let logo = target_dir.join("static").join(LOGO_PATH);
    if let Some(parent) = logo.parent() {
        fs::create_dir_all(parent)?;
    }
    write_if_missing(&logo, LOGO_SVG)?;

    println!("Initialized blog in {:?}", target_dir);
    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        tracing::info!("Keeping existing {:?}", path);
        return Ok(());
    }
    fs::write(path, content)?;
    tracing::debug!("Created {:?}", path);
    Ok(())
}
