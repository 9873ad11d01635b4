//! Post documents as returned by the content API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::richtext::RichText;

/// A document envelope: identity and publication metadata around `data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<T> {
    /// API identifier, unique per repository
    pub id: String,

    /// URL-safe identifier used in post routes
    #[serde(default)]
    pub uid: Option<String>,

    #[serde(rename = "type", default)]
    pub doc_type: String,

    #[serde(default, with = "publication_date")]
    pub first_publication_date: Option<DateTime<Utc>>,

    #[serde(default, with = "publication_date")]
    pub last_publication_date: Option<DateTime<Utc>>,

    pub data: T,
}

/// Fields fetched for listings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryData {
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// Fields of a full post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailData {
    pub title: String,
    pub banner: Banner,
    pub author: String,
    pub content: Vec<Section>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Banner {
    pub url: Option<String>,
    pub alt: Option<String>,
}

/// One headed section of a post body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Section {
    pub heading: Option<String>,
    pub body: RichText,
}

pub type PostSummary = Document<SummaryData>;
pub type PostDetail = Document<DetailData>;

/// One page of a listing plus its continuation cursor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostPage {
    pub results: Vec<PostSummary>,
    /// URL of the following page; `None` on the last page
    #[serde(default)]
    pub next_page: Option<String>,
}

impl<T> Document<T> {
    /// Whether the document was edited after its first publication
    pub fn was_edited(&self) -> bool {
        match (self.first_publication_date, self.last_publication_date) {
            (Some(first), Some(last)) => first != last,
            (None, Some(_)) => true,
            _ => false,
        }
    }
}

impl PostDetail {
    /// Reduce a full post to the listing projection
    pub fn summary(&self) -> PostSummary {
        Document {
            id: self.id.clone(),
            uid: self.uid.clone(),
            doc_type: self.doc_type.clone(),
            first_publication_date: self.first_publication_date,
            last_publication_date: self.last_publication_date,
            data: SummaryData {
                title: self.data.title.clone(),
                subtitle: String::new(),
                author: self.data.author.clone(),
            },
        }
    }
}

/// Publication timestamps come as `2021-03-25T19:25:28+0000`; RFC 3339 is
/// accepted as well.
pub mod publication_date {
    use super::*;

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z")
            .or_else(|_| DateTime::parse_from_rfc3339(s))
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(
        date: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => serializer.serialize_some(&d.format("%Y-%m-%dT%H:%M:%S%z").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.is_empty() => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_api_timestamp() {
        let expected = Utc.with_ymd_and_hms(2021, 3, 25, 19, 25, 28).unwrap();
        assert_eq!(
            publication_date::parse("2021-03-25T19:25:28+0000"),
            Some(expected)
        );
        assert_eq!(
            publication_date::parse("2021-03-25T16:25:28-03:00"),
            Some(expected)
        );
        assert_eq!(publication_date::parse("25/03/2021"), None);
    }

    #[test]
    fn test_deserialize_summary() {
        let json = r#"{
            "id": "YF1",
            "uid": "como-utilizar-hooks",
            "type": "posts",
            "first_publication_date": "2021-03-15T19:25:28+0000",
            "last_publication_date": null,
            "data": {"title": "Como utilizar Hooks", "subtitle": "Pensando em sincronização", "author": "Joseph Oliveira"}
        }"#;
        let post: PostSummary = serde_json::from_str(json).unwrap();
        assert_eq!(post.uid.as_deref(), Some("como-utilizar-hooks"));
        assert_eq!(post.data.author, "Joseph Oliveira");
        assert!(post.first_publication_date.is_some());
        assert!(post.last_publication_date.is_none());
    }

    #[test]
    fn test_bad_timestamp_is_rejected() {
        let json = r#"{"id": "a", "first_publication_date": "yesterday", "data": {}}"#;
        assert!(serde_json::from_str::<PostSummary>(json).is_err());
    }

    #[test]
    fn test_deserialize_detail_with_missing_heading() {
        let json = r#"{
            "id": "YF2",
            "uid": "criando-um-app",
            "data": {
                "title": "Criando um app",
                "banner": {"url": "https://images.prismic.io/banner.png"},
                "author": "Danilo Vieira",
                "content": [
                    {"heading": null, "body": [{"type": "paragraph", "text": "Olá", "spans": []}]},
                    {"heading": "Fim", "body": []}
                ]
            }
        }"#;
        let post: PostDetail = serde_json::from_str(json).unwrap();
        assert_eq!(post.data.content.len(), 2);
        assert!(post.data.content[0].heading.is_none());
        assert_eq!(
            post.data.banner.url.as_deref(),
            Some("https://images.prismic.io/banner.png")
        );
    }

    #[test]
    fn test_was_edited() {
        let first = Utc.with_ymd_and_hms(2021, 6, 15, 10, 0, 0).unwrap();
        let mut post = PostSummary {
            id: "a".into(),
            uid: None,
            doc_type: "posts".into(),
            first_publication_date: Some(first),
            last_publication_date: Some(first),
            data: SummaryData::default(),
        };
        assert!(!post.was_edited());
        post.last_publication_date = Some(first + chrono::Duration::hours(2));
        assert!(post.was_edited());
        post.last_publication_date = None;
        assert!(!post.was_edited());
    }
}
