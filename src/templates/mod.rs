//! Built-in blog theme using the Tera template engine
//!
//! Templates are embedded in the binary. Every page gets the site data, the
//! flattened translations as `t` and the preview state; page-specific data
//! is added by the `render_*` methods.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::helpers::encode_component;
use crate::i18n::I18n;
use crate::listing::ListingView;
use crate::render::PostView;

/// Default logo, used when the static directory does not provide one
pub const LOGO_SVG: &str = include_str!("theme/assets/logo.svg");

/// Where the logo lives relative to the site root
pub const LOGO_PATH: &str = "assets/logo.svg";

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
    site: SiteData,
    translations: HashMap<String, String>,
}

/// Site-wide values available to every template as `site`
#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub language: String,
    pub url: String,
    pub root: String,
}

/// Set when a page is rendered against a preview ref
#[derive(Debug, Clone, Serialize)]
pub struct PreviewData {
    pub content_ref: String,
    /// Same page without the preview parameter
    pub exit_href: String,
}

impl TemplateRenderer {
    pub fn new(config: &SiteConfig, i18n: &I18n) -> Result<Self> {
        let mut tera = Tera::default();

        // Values are escaped explicitly in the templates; rendered rich text is not
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("theme/layout.html")),
            ("index.html", include_str!("theme/index.html")),
            ("post.html", include_str!("theme/post.html")),
            ("not_found.html", include_str!("theme/not_found.html")),
            ("error.html", include_str!("theme/error.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("theme/partials/header.html"),
            ),
            (
                "partials/preview.html",
                include_str!("theme/partials/preview.html"),
            ),
            (
                "partials/style.html",
                include_str!("theme/partials/style.html"),
            ),
        ])?;

        tera.register_filter("truncate_chars", truncate_chars_filter);

        let root = format!("{}/", config.root.trim_end_matches('/'));
        Ok(Self {
            tera,
            site: SiteData {
                title: config.title.clone(),
                language: config.language.clone(),
                url: config.url.clone(),
                root,
            },
            translations: i18n.get_all_translations(),
        })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    /// Context shared by every page
    pub fn context(&self, preview: Option<&PreviewData>) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site);
        context.insert("t", &self.translations);
        context.insert("version", env!("CARGO_PKG_VERSION"));
        context.insert("preview", &preview);
        let preview_query = preview
            .map(|p| format!("?preview={}", encode_component(&p.content_ref)))
            .unwrap_or_default();
        context.insert("preview_query", &preview_query);
        context
    }

    /// Home or `page/N/`: everything loaded so far, plus the "load more"
    /// link when `next_href` is given and the listing has more
    pub fn render_listing(
        &self,
        listing: &ListingView,
        next_href: Option<&str>,
        preview: Option<&PreviewData>,
    ) -> Result<String> {
        let mut context = self.context(preview);
        context.insert("listing", listing);
        context.insert("next_href", &next_href);
        self.render("index.html", &context)
    }

    /// A post page; `None` renders the loading page
    pub fn render_post(
        &self,
        post: Option<&PostView>,
        preview: Option<&PreviewData>,
    ) -> Result<String> {
        let mut context = self.context(preview);
        context.insert("post", &post);
        self.render("post.html", &context)
    }

    pub fn render_not_found(&self, preview: Option<&PreviewData>) -> Result<String> {
        self.render("not_found.html", &self.context(preview))
    }

    pub fn render_error(
        &self,
        retry_href: &str,
        preview: Option<&PreviewData>,
    ) -> Result<String> {
        let mut context = self.context(preview);
        context.insert("retry_href", retry_href);
        self.render("error.html", &context)
    }
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };

    if s.chars().count() <= length {
        Ok(tera::Value::String(s))
    } else {
        let truncated: String = s.chars().take(length).collect();
        Ok(tera::Value::String(format!(
            "{}{}",
            truncated.trim_end(),
            omission
        )))
    }
}
