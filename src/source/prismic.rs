//! Prismic v2 document search API client

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{ContentSource, Direction, ListQuery};
use crate::config::PrismicConfig;
use crate::content::{DetailData, Document, PostDetail, PostPage, PostSummary, SummaryData};
use crate::error::ContentError;

/// How long a resolved master ref is reused before asking the API again
const MASTER_REF_TTL: Duration = Duration::from_secs(5);

/// HTTP implementation of [`ContentSource`]
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
    master_ref: Mutex<Option<(String, Instant)>>,
}

/// `GET <endpoint>` response, trimmed to what we use
#[derive(Debug, Deserialize)]
struct ApiInfo {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

/// `GET <endpoint>/documents/search` response
#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    results: Vec<Document<T>>,
    #[serde(default)]
    next_page: Option<String>,
}

impl PrismicClient {
    pub fn new(config: &PrismicConfig) -> Result<Self, ContentError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
            master_ref: Mutex::new(None),
        })
    }

    fn search_url(&self) -> String {
        format!("{}/documents/search", self.endpoint)
    }

    /// Current published ref, cached briefly
    pub async fn master_ref(&self) -> Result<String, ContentError> {
        if let Ok(cached) = self.master_ref.lock() {
            if let Some((reference, at)) = cached.as_ref() {
                if at.elapsed() < MASTER_REF_TTL {
                    return Ok(reference.clone());
                }
            }
        }

        let info: ApiInfo = self.get_json(&self.endpoint, &[]).await?;
        let reference = info
            .refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or_else(|| ContentError::MalformedResponse("no master ref".to_string()))?;

        tracing::debug!("Resolved master ref {}", reference);
        if let Ok(mut cached) = self.master_ref.lock() {
            *cached = Some((reference.clone(), Instant::now()));
        }
        Ok(reference)
    }

    async fn resolve_ref(&self, content_ref: Option<&str>) -> Result<String, ContentError> {
        match content_ref {
            Some(r) => Ok(r.to_string()),
            None => self.master_ref().await,
        }
    }

    async fn search<T: DeserializeOwned>(
        &self,
        content_ref: Option<&str>,
        params: &[(&str, String)],
    ) -> Result<SearchResponse<T>, ContentError> {
        let reference = self.resolve_ref(content_ref).await?;
        let mut query: Vec<(&str, String)> = vec![("ref", reference)];
        query.extend(params.iter().cloned());
        self.get_json(&self.search_url(), &query).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, ContentError> {
        let mut request = self.http.get(url).query(params);
        if let Some(token) = &self.access_token {
            if !url.contains("access_token=") {
                request = request.query(&[("access_token", token)]);
            }
        }

        tracing::debug!("GET {}", url);
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!("Content API returned {} for {}", status, url);
            Err(ContentError::Transport(format!(
                "{} - {}",
                status.as_u16(),
                message.trim()
            )))
        }
    }
}

/// `[[at(path,"value")]]` predicate; values must not break the quoting
fn at(path: &str, value: &str) -> Result<String, ContentError> {
    if value.contains('"') || value.contains('\\') {
        return Err(ContentError::NotFound(value.to_string()));
    }
    Ok(format!(r#"[[at({},"{}")]]"#, path, value))
}

fn ordering(direction: Direction) -> String {
    match direction {
        Direction::Previous => "[document.first_publication_date desc]".to_string(),
        Direction::Next => "[document.first_publication_date]".to_string(),
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn list_by_type(
        &self,
        doc_type: &str,
        query: &ListQuery,
    ) -> Result<PostPage, ContentError> {
        let mut params = vec![
            ("q", at("document.type", doc_type)?),
            ("pageSize", query.page_size.max(1).to_string()),
            ("orderings", ordering(Direction::Previous)),
        ];
        if !query.fields.is_empty() {
            params.push(("fetch", query.fields.join(",")));
        }

        let response: SearchResponse<SummaryData> =
            self.search(query.content_ref.as_deref(), &params).await?;
        tracing::debug!(
            "Listed {} {} (more: {})",
            response.results.len(),
            doc_type,
            response.next_page.is_some()
        );
        Ok(PostPage {
            results: response.results,
            next_page: response.next_page,
        })
    }

    async fn fetch_page(&self, cursor: &str) -> Result<PostPage, ContentError> {
        // Cursors come back from the API itself; anything else is refused
        let origin = self.endpoint.split("/api").next().unwrap_or(&self.endpoint);
        if !cursor.starts_with(&format!("{}/", origin)) {
            return Err(ContentError::MalformedResponse(format!(
                "cursor outside {}: {}",
                origin, cursor
            )));
        }

        let response: SearchResponse<SummaryData> = self.get_json(cursor, &[]).await?;
        Ok(PostPage {
            results: response.results,
            next_page: response.next_page,
        })
    }

    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        content_ref: Option<&str>,
    ) -> Result<PostDetail, ContentError> {
        let params = [
            ("q", at(&format!("my.{}.uid", doc_type), uid)?),
            ("pageSize", "1".to_string()),
        ];
        let response: SearchResponse<DetailData> = self.search(content_ref, &params).await?;
        response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ContentError::NotFound(format!("{}/{}", doc_type, uid)))
    }

    async fn get_by_id(
        &self,
        id: &str,
        content_ref: Option<&str>,
    ) -> Result<PostSummary, ContentError> {
        let params = [("q", at("document.id", id)?), ("pageSize", "1".to_string())];
        let response: SearchResponse<SummaryData> = self.search(content_ref, &params).await?;
        response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ContentError::NotFound(id.to_string()))
    }

    async fn query_neighbor(
        &self,
        doc_type: &str,
        anchor_id: &str,
        direction: Direction,
        content_ref: Option<&str>,
    ) -> Result<Option<PostSummary>, ContentError> {
        let params = [
            ("q", at("document.type", doc_type)?),
            ("pageSize", "1".to_string()),
            ("after", anchor_id.to_string()),
            ("orderings", ordering(direction)),
        ];
        let response: SearchResponse<SummaryData> = self.search(content_ref, &params).await?;
        Ok(response.results.into_iter().next())
    }
}
