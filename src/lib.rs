//! spacetraveling: a blog front-end for posts stored in a Prismic repository
//!
//! Posts are read through the content API and rendered with embedded Tera
//! templates, either ahead of time into a static site (`generate`) or on
//! request by a local server (`server`).

pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod i18n;
pub mod listing;
pub mod render;
pub mod server;
pub mod source;
pub mod templates;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::helpers::Localizer;
use crate::i18n::I18n;
use crate::source::{ContentSource, PrismicClient};

/// The main blog application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration, with environment overrides applied
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Static assets copied or served as-is
    pub static_dir: PathBuf,
    pub i18n: I18n,
}

impl Blog {
    /// Create a blog from a directory, reading `_config.yml` if present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env();

        Self::with_config(base_dir, config)
    }

    /// Create a blog from an already loaded configuration
    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> Result<Self> {
        let mut i18n = I18n::new(&config.language);
        i18n.load_languages(base_dir.join("languages"))
            .context("Failed to load languages")?;

        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);

        Ok(Self {
            config,
            base_dir,
            public_dir,
            static_dir,
            i18n,
        })
    }

    /// Timezone and language used for every displayed date
    pub fn localizer(&self) -> Arc<Localizer> {
        Arc::new(Localizer::new(self.config.tz(), self.i18n.clone()))
    }

    /// Content API client for the configured repository
    pub fn source(&self) -> Result<Arc<dyn ContentSource>> {
        if self.config.prismic.endpoint.trim().is_empty() {
            anyhow::bail!(
                "No content API endpoint configured. Set prismic.endpoint in _config.yml or {}",
                config::ENDPOINT_ENV
            );
        }
        let client = PrismicClient::new(&self.config.prismic)?;
        Ok(Arc::new(client))
    }

    /// Generate the static site
    pub async fn generate(&self) -> Result<()> {
        commands::generate::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
