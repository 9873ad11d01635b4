//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable overriding `prismic.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Environment variable overriding `prismic.endpoint`
pub const ENDPOINT_ENV: &str = "PRISMIC_API_ENDPOINT";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub language: String,
    pub timezone: String,
    pub words_per_minute: usize,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,
    pub static_dir: String,

    #[serde(default)]
    pub prismic: PrismicConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            language: "pt-BR".to_string(),
            timezone: "America/Sao_Paulo".to_string(),
            words_per_minute: 200,

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),

            prismic: PrismicConfig::default(),
            comments: CommentsConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(config)
    }

    /// Apply credentials from the environment on top of the file values
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.is_empty() {
                self.prismic.access_token = Some(token);
            }
        }
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.is_empty() {
                tracing::debug!("Using content endpoint from {}", ENDPOINT_ENV);
                self.prismic.endpoint = endpoint;
            }
        }
    }

    /// Parse the configured timezone, falling back to UTC
    pub fn tz(&self) -> chrono_tz::Tz {
        match self.timezone.parse::<chrono_tz::Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                tracing::warn!("Unknown timezone {:?}, using UTC", self.timezone);
                chrono_tz::UTC
            }
        }
    }
}

/// Content API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrismicConfig {
    /// API root, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    pub document_type: String,
    pub page_size: usize,
    pub timeout_secs: u64,
}

impl Default for PrismicConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://spacetraveling.cdn.prismic.io/api/v2".to_string(),
            access_token: None,
            document_type: "posts".to_string(),
            page_size: 10,
            timeout_secs: 10,
        }
    }
}

/// utterances comment widget configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    /// `owner/name` of the GitHub repository backing the comments
    pub repo: Option<String>,
    pub issue_term: String,
    pub theme: String,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            repo: None,
            issue_term: "pathname".to_string(),
            theme: "github-dark".to_string(),
        }
    }
}

/// `server` command settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Seconds before cached listings and posts are fetched again
    pub revalidate_secs: u64,
    /// How long a post request waits for a first fetch before answering
    /// with the loading page
    pub loading_grace_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            revalidate_secs: 60,
            loading_grace_ms: 1500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "spacetraveling");
        assert_eq!(config.words_per_minute, 200);
        assert_eq!(config.prismic.document_type, "posts");
        assert!(config.comments.repo.is_none());
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
timezone: UTC
prismic:
  endpoint: https://blog.cdn.prismic.io/api/v2
  page_size: 2
comments:
  repo: someone/blog-comments
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.prismic.endpoint, "https://blog.cdn.prismic.io/api/v2");
        assert_eq!(config.prismic.page_size, 2);
        // untouched nested fields keep their defaults
        assert_eq!(config.prismic.document_type, "posts");
        assert_eq!(config.comments.repo.as_deref(), Some("someone/blog-comments"));
        assert_eq!(config.comments.theme, "github-dark");
    }

    #[test]
    fn test_timezone_fallback() {
        let mut config = SiteConfig::default();
        assert_eq!(config.tz(), chrono_tz::America::Sao_Paulo);
        config.timezone = "Mars/Olympus".to_string();
        assert_eq!(config.tz(), chrono_tz::UTC);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_config.yml");
        fs::write(&path, "title: From File\nwords_per_minute: 250\n").unwrap();
        let config = SiteConfig::load(&path).unwrap();
        assert_eq!(config.title, "From File");
        assert_eq!(config.words_per_minute, 250);
    }
}
