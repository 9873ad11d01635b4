//! Blog server: renders pages on request from the content API
//!
//! Published listings are shared between requests and rebuilt once they
//! are older than `server.revalidate_secs`. Post pages go through
//! [`PostCache`]. Requests carrying `?preview=<ref>` skip both caches.

mod posts;

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, Request, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::ContentError;
use crate::helpers::{is_valid_uid, page_path, post_path, url_for, with_preview, Localizer};
use crate::listing::{ListedPost, Listing, ListingView, SharedListing};
use crate::render::{DocumentRenderer, PostState, PostView};
use crate::source::{neighbors, ContentSource};
use crate::templates::{PreviewData, TemplateRenderer, LOGO_PATH, LOGO_SVG};
use crate::Blog;

pub use posts::PostCache;

/// Server state
pub struct AppState {
    blog: Blog,
    source: Arc<dyn ContentSource>,
    renderer: TemplateRenderer,
    documents: DocumentRenderer,
    localizer: Arc<Localizer>,
    listing: RwLock<Option<(Arc<SharedListing>, Instant)>>,
    posts: PostCache,
    revalidate: Duration,
}

impl AppState {
    pub fn new(blog: &Blog, source: Arc<dyn ContentSource>) -> Result<Self> {
        let localizer = blog.localizer();
        let revalidate = Duration::from_secs(blog.config.server.revalidate_secs);
        let grace = Duration::from_millis(blog.config.server.loading_grace_ms);

        Ok(Self {
            renderer: TemplateRenderer::new(&blog.config, &blog.i18n)?,
            documents: DocumentRenderer::new(&blog.config, localizer.clone()),
            localizer,
            source,
            listing: RwLock::new(None),
            posts: PostCache::new(revalidate, grace),
            revalidate,
            blog: blog.clone(),
        })
    }

    fn doc_type(&self) -> &str {
        &self.blog.config.prismic.document_type
    }

    async fn first_listing(&self, preview: Option<&str>) -> Result<Listing, ContentError> {
        Listing::fetch(
            self.source.as_ref(),
            self.doc_type(),
            self.blog.config.prismic.page_size,
            preview,
            self.localizer.clone(),
        )
        .await
    }

    /// The published listing, rebuilt when older than the revalidate interval.
    ///
    /// A failed rebuild keeps serving the previous listing.
    async fn shared_listing(&self) -> Result<Arc<SharedListing>, ContentError> {
        if let Some((listing, built)) = self.listing.read().await.as_ref() {
            if built.elapsed() < self.revalidate {
                return Ok(listing.clone());
            }
        }

        let mut slot = self.listing.write().await;
        if let Some((listing, built)) = slot.as_ref() {
            if built.elapsed() < self.revalidate {
                return Ok(listing.clone());
            }
        }

        match self.first_listing(None).await {
            Ok(listing) => {
                tracing::debug!("Rebuilt the published listing");
                let shared = Arc::new(SharedListing::new(listing));
                *slot = Some((shared.clone(), Instant::now()));
                Ok(shared)
            }
            Err(e) => match slot.as_ref() {
                Some((stale, _)) => {
                    tracing::warn!("Listing refresh failed, serving the previous one: {}", e);
                    Ok(stale.clone())
                }
                None => Err(e),
            },
        }
    }

    /// A listing to read from: the shared published one, or a fresh one
    /// for a preview ref
    async fn listing_for(&self, preview: Option<&str>) -> Result<Arc<SharedListing>, ContentError> {
        match preview {
            Some(_) => Ok(Arc::new(SharedListing::new(
                self.first_listing(preview).await?,
            ))),
            None => self.shared_listing().await,
        }
    }

    /// The first `pages` listing pages, against `preview` when given
    async fn listing_pages(
        &self,
        pages: usize,
        preview: Option<&str>,
    ) -> Result<ListingView, ContentError> {
        self.listing_for(preview)
            .await?
            .ensure_pages(self.source.as_ref(), pages)
            .await
    }

    /// Only the posts of listing page `page`; `None` past the last page
    async fn posts_page(
        &self,
        page: usize,
        preview: Option<&str>,
    ) -> Result<Option<PostsPage>, ContentError> {
        let listing = self.listing_for(preview).await?;
        let upto = listing.ensure_pages(self.source.as_ref(), page).await?;
        if upto.pages < page {
            return Ok(None);
        }
        let before = listing
            .ensure_pages(self.source.as_ref(), page - 1)
            .await?
            .posts
            .len();

        Ok(Some(PostsPage {
            page,
            has_more: upto.has_more,
            results: upto.posts.into_iter().skip(before).collect(),
        }))
    }

    fn preview_data(&self, path: &str, preview: Option<&str>) -> Option<PreviewData> {
        preview.map(|content_ref| PreviewData {
            content_ref: content_ref.to_string(),
            exit_href: url_for(&self.blog.config, path),
        })
    }
}

/// Fetch and render one post; runs detached from the request
async fn load_post(
    state: Arc<AppState>,
    uid: String,
    preview: Option<String>,
) -> Result<PostView, ContentError> {
    let doc_type = state.doc_type();
    let post = state
        .source
        .get_by_uid(doc_type, &uid, preview.as_deref())
        .await?;
    let adjacent = neighbors(state.source.as_ref(), doc_type, &post.id, preview.as_deref()).await?;
    Ok(state.documents.render(&post, &adjacent))
}

#[derive(Debug, Default, Deserialize)]
struct PreviewQuery {
    preview: Option<String>,
}

impl PreviewQuery {
    fn content_ref(&self) -> Option<&str> {
        self.preview.as_deref().filter(|r| !r.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiPostsQuery {
    page: Option<usize>,
    preview: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreviewLinkQuery {
    token: String,
    document_id: String,
}

/// `GET /api/posts` response
#[derive(Debug, Serialize)]
struct PostsPage {
    page: usize,
    results: Vec<ListedPost>,
    has_more: bool,
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
    retryable: bool,
}

/// Build the router with all routes and the static fallback
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/page/:n", get(page_handler))
        .route("/page/:n/", get(page_handler))
        .route("/post/:uid", get(post_handler))
        .route("/post/:uid/", get(post_handler))
        .route("/api/posts", get(api_posts_handler))
        .route("/api/preview", get(api_preview_handler))
        .fallback(fallback_handler)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the server
pub async fn start(blog: &Blog, ip: &str, port: u16, open: bool) -> Result<()> {
    let source = blog.source()?;
    let state = Arc::new(AppState::new(blog, source)?);
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn index_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PreviewQuery>,
) -> Response {
    listing_response(&state, 1, query.content_ref()).await
}

async fn page_handler(
    State(state): State<Arc<AppState>>,
    Path(n): Path<String>,
    Query(query): Query<PreviewQuery>,
) -> Response {
    match n.parse::<usize>() {
        Ok(1) => Redirect::permanent(&with_preview(
            &url_for(&state.blog.config, ""),
            query.content_ref(),
        ))
        .into_response(),
        Ok(n) if n > 1 => listing_response(&state, n, query.content_ref()).await,
        _ => not_found_response(&state, query.content_ref()),
    }
}

/// Listing page `n`: everything up to page `n` with a link to `n + 1`
async fn listing_response(state: &AppState, n: usize, preview: Option<&str>) -> Response {
    let path = page_path(n);
    let preview_data = state.preview_data(&path, preview);

    let view = match state.listing_pages(n, preview).await {
        Ok(view) => view,
        Err(e) => return content_error_response(state, e, &path, preview),
    };
    if view.pages < n {
        return not_found_response(state, preview);
    }

    let next_href = with_preview(&url_for(&state.blog.config, &page_path(n + 1)), preview);
    html_response(
        StatusCode::OK,
        state
            .renderer
            .render_listing(&view, Some(&next_href), preview_data.as_ref()),
    )
}

async fn post_handler(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Query(query): Query<PreviewQuery>,
) -> Response {
    let preview = query.content_ref();
    if !is_valid_uid(&uid) {
        return not_found_response(&state, preview);
    }

    let path = post_path(&uid);
    let post_state = match preview {
        // previews are never cached and never shown half-loaded
        Some(content_ref) => {
            let mut post_state = PostState::Loading;
            post_state.resolve(
                load_post(state.clone(), uid.clone(), Some(content_ref.to_string())).await,
            );
            post_state
        }
        None => {
            let loader = state.clone();
            let key = uid.clone();
            state
                .posts
                .get(&uid, move || load_post(loader, key, None))
                .await
        }
    };

    let preview_data = state.preview_data(&path, preview);
    match post_state {
        PostState::Ready(view) => html_response(
            StatusCode::OK,
            state.renderer.render_post(Some(&view), preview_data.as_ref()),
        ),
        PostState::Loading => html_response(
            StatusCode::OK,
            state.renderer.render_post(None, preview_data.as_ref()),
        ),
        PostState::NotFound => not_found_response(&state, preview),
        PostState::Failed(message) => {
            tracing::warn!("Post {} failed: {}", uid, message);
            error_page_response(&state, &path, preview)
        }
    }
}

async fn api_posts_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ApiPostsQuery>,
) -> Response {
    let page = query.page.unwrap_or(1);
    let preview = query.preview.as_deref().filter(|r| !r.is_empty());
    if page == 0 {
        return api_error(StatusCode::BAD_REQUEST, "page starts at 1", false);
    }

    match state.posts_page(page, preview).await {
        Ok(Some(posts)) => Json(posts).into_response(),
        Ok(None) => api_error(StatusCode::NOT_FOUND, &format!("no page {}", page), false),
        Err(e) => {
            tracing::warn!("Listing page {} failed: {}", page, e);
            let status = match e {
                ContentError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::SERVICE_UNAVAILABLE,
            };
            api_error(status, &e.to_string(), e.is_retryable())
        }
    }
}

/// Entry point of the CMS preview button: resolve the document, then show
/// its page under the preview ref
async fn api_preview_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PreviewLinkQuery>,
) -> Response {
    let token = query.token.as_str();
    match state.source.get_by_id(&query.document_id, Some(token)).await {
        Ok(doc) => {
            let path = match doc.uid.as_deref() {
                Some(uid) if is_valid_uid(uid) => post_path(uid),
                _ => String::new(),
            };
            let target = with_preview(&url_for(&state.blog.config, &path), Some(token));
            tracing::info!("Preview of {} at {}", query.document_id, target);
            Redirect::temporary(&target).into_response()
        }
        Err(e) => content_error_response(&state, e, "", None),
    }
}

/// Static files, the built-in logo, and the 404 page for everything else
async fn fallback_handler(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();

    let mut service = ServeDir::new(&state.blog.static_dir);
    match service.try_call(request).await {
        Ok(response) if response.status() != StatusCode::NOT_FOUND => {
            return response.into_response()
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!("Failed to serve {}: {}", path, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response();
        }
    }

    if path.trim_start_matches('/') == LOGO_PATH {
        return ([(header::CONTENT_TYPE, "image/svg+xml")], LOGO_SVG).into_response();
    }
    not_found_response(&state, None)
}

/// Prismic uids are slugs; anything else cannot name a post
fn html_response(status: StatusCode, rendered: Result<String>) -> Response {
    match rendered {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Template error: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

fn not_found_response(state: &AppState, preview: Option<&str>) -> Response {
    let preview_data = state.preview_data("", preview);
    html_response(
        StatusCode::NOT_FOUND,
        state.renderer.render_not_found(preview_data.as_ref()),
    )
}

/// 503 page whose retry link reloads `path`
fn error_page_response(state: &AppState, path: &str, preview: Option<&str>) -> Response {
    let retry_href = with_preview(&url_for(&state.blog.config, path), preview);
    let preview_data = state.preview_data(path, preview);
    html_response(
        StatusCode::SERVICE_UNAVAILABLE,
        state
            .renderer
            .render_error(&retry_href, preview_data.as_ref()),
    )
}

fn content_error_response(
    state: &AppState,
    error: ContentError,
    path: &str,
    preview: Option<&str>,
) -> Response {
    match error {
        ContentError::NotFound(_) => not_found_response(state, preview),
        e => {
            tracing::warn!("Content API error for /{}: {}", path, e);
            error_page_response(state, path, preview)
        }
    }
}

fn api_error(status: StatusCode, error: &str, retryable: bool) -> Response {
    (
        status,
        Json(ApiError {
            error: error.to_string(),
            retryable,
        }),
    )
        .into_response()
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
