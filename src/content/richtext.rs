//! Structured rich text: plain-text and HTML rendering
//!
//! The content API stores bodies as a list of blocks. Each block carries its
//! text plus span annotations (bold, italic, links) addressed by character
//! offsets into that text. Rendering escapes every piece of text and
//! attribute, so the resulting HTML can be inserted into pages verbatim.

use serde::{Deserialize, Serialize};

use crate::helpers::{escape_html, safe_url};

/// A rich-text field: an ordered list of blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub Vec<RichTextBlock>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
    /// Image source
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub oembed: Option<Embed>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "preformatted")]
    Preformatted,
    #[serde(rename = "heading1")]
    Heading1,
    #[serde(rename = "heading2")]
    Heading2,
    #[serde(rename = "heading3")]
    Heading3,
    #[serde(rename = "heading4")]
    Heading4,
    #[serde(rename = "heading5")]
    Heading5,
    #[serde(rename = "heading6")]
    Heading6,
    #[serde(rename = "list-item")]
    ListItem,
    #[serde(rename = "o-list-item")]
    OrderedListItem,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "embed")]
    Embed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default)]
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    Label,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanData {
    pub url: Option<String>,
    pub target: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Embed {
    pub embed_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub html: Option<String>,
}

impl RichTextBlock {
    pub fn new(kind: BlockKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
            spans: Vec::new(),
            url: None,
            alt: None,
            oembed: None,
        }
    }

    pub fn paragraph(text: &str) -> Self {
        Self::new(BlockKind::Paragraph, text)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.spans.push(span);
        self
    }
}

impl RichText {
    pub fn blocks(&self) -> &[RichTextBlock] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Plain text of all blocks joined with a single space
    pub fn as_text(&self) -> String {
        self.0
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render to escaped HTML. Consecutive list items share one list.
    pub fn as_html(&self) -> String {
        let mut html = String::new();
        let mut open_list: Option<BlockKind> = None;

        for block in &self.0 {
            let list = match block.kind {
                BlockKind::ListItem | BlockKind::OrderedListItem => Some(block.kind),
                _ => None,
            };
            if open_list != list {
                if let Some(kind) = open_list {
                    html.push_str(list_tag(kind, true));
                }
                if let Some(kind) = list {
                    html.push_str(list_tag(kind, false));
                }
                open_list = list;
            }
            render_block(block, &mut html);
        }

        if let Some(kind) = open_list {
            html.push_str(list_tag(kind, true));
        }

        html
    }
}

fn list_tag(kind: BlockKind, close: bool) -> &'static str {
    match (kind, close) {
        (BlockKind::OrderedListItem, false) => "<ol>",
        (BlockKind::OrderedListItem, true) => "</ol>",
        (_, false) => "<ul>",
        (_, true) => "</ul>",
    }
}

fn render_block(block: &RichTextBlock, out: &mut String) {
    let inner = || render_spans(&block.text, &block.spans);
    match block.kind {
        BlockKind::Paragraph => wrap(out, "p", &inner()),
        BlockKind::Preformatted => wrap(out, "pre", &inner()),
        BlockKind::Heading1 => wrap(out, "h1", &inner()),
        BlockKind::Heading2 => wrap(out, "h2", &inner()),
        BlockKind::Heading3 => wrap(out, "h3", &inner()),
        BlockKind::Heading4 => wrap(out, "h4", &inner()),
        BlockKind::Heading5 => wrap(out, "h5", &inner()),
        BlockKind::Heading6 => wrap(out, "h6", &inner()),
        BlockKind::ListItem | BlockKind::OrderedListItem => wrap(out, "li", &inner()),
        BlockKind::Image => {
            if let Some(src) = block.url.as_deref().and_then(safe_url) {
                out.push_str(&format!(
                    r#"<p class="block-img"><img src="{}" alt="{}"></p>"#,
                    escape_html(src),
                    escape_html(block.alt.as_deref().unwrap_or(""))
                ));
            }
        }
        BlockKind::Embed => {
            // Third-party embed markup is not trusted; link to the source instead.
            if let Some(embed) = &block.oembed {
                if let Some(url) = embed.embed_url.as_deref().and_then(safe_url) {
                    let url = escape_html(url);
                    out.push_str(&format!(
                        r#"<div data-oembed="{}" data-oembed-type="{}"><a href="{}">{}</a></div>"#,
                        url,
                        escape_html(embed.kind.as_deref().unwrap_or("link")),
                        url,
                        url
                    ));
                }
            }
        }
        BlockKind::Unknown => {
            if !block.text.is_empty() {
                wrap(out, "p", &inner());
            }
        }
    }
}

fn wrap(out: &mut String, tag: &str, inner: &str) {
    out.push_str(&format!("<{}>{}</{}>", tag, inner, tag));
}

/// Only web and mail links survive; `javascript:` and friends are dropped
fn open_span(span: &Span) -> Option<String> {
    match span.kind {
        SpanKind::Strong => Some("<strong>".to_string()),
        SpanKind::Em => Some("<em>".to_string()),
        SpanKind::Hyperlink => {
            let data = span.data.as_ref()?;
            let url = data.url.as_deref().and_then(safe_url)?;
            let target = match data.target.as_deref() {
                Some(t) => format!(r#" target="{}" rel="noopener""#, escape_html(t)),
                None => String::new(),
            };
            Some(format!(r#"<a href="{}"{}>"#, escape_html(url), target))
        }
        SpanKind::Label => {
            let label = span
                .data
                .as_ref()
                .and_then(|d| d.label.as_deref())
                .unwrap_or("");
            Some(format!(r#"<span class="{}">"#, escape_html(label)))
        }
        SpanKind::Unknown => None,
    }
}

fn close_span(span: &Span) -> &'static str {
    match span.kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Hyperlink => "</a>",
        SpanKind::Label => "</span>",
        SpanKind::Unknown => "",
    }
}

/// Apply spans to `text`. Offsets count characters; spans that overlap
/// without nesting are closed and reopened at the crossing point.
fn render_spans(text: &str, spans: &[Span]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    let mut spans: Vec<(&Span, String)> = spans
        .iter()
        .filter(|s| s.start < s.end && s.start < len)
        .filter_map(|s| open_span(s).map(|open| (s, open)))
        .collect();
    // Outer spans first: earlier start, then longer extent
    spans.sort_by(|(a, _), (b, _)| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut out = String::new();
    let mut stack: Vec<usize> = Vec::new();
    let mut next = 0;

    for (pos, ch) in chars.iter().enumerate() {
        // Close spans ending here, reopening any inner ones still running
        if stack.iter().any(|&i| spans[i].0.end.min(len) == pos) {
            let mut reopen = Vec::new();
            while let Some(i) = stack.pop() {
                out.push_str(close_span(spans[i].0));
                if spans[i].0.end.min(len) != pos {
                    reopen.push(i);
                }
            }
            for i in reopen.into_iter().rev() {
                out.push_str(&spans[i].1);
                stack.push(i);
            }
        }
        while next < spans.len() && spans[next].0.start == pos {
            out.push_str(&spans[next].1);
            stack.push(next);
            next += 1;
        }
        out.push_str(&escape_html(&ch.to_string()));
    }

    while let Some(i) = stack.pop() {
        out.push_str(close_span(spans[i].0));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize, kind: SpanKind) -> Span {
        Span {
            start,
            end,
            kind,
            data: None,
        }
    }

    fn link(start: usize, end: usize, url: &str) -> Span {
        Span {
            start,
            end,
            kind: SpanKind::Hyperlink,
            data: Some(SpanData {
                url: Some(url.to_string()),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_as_text_joins_blocks() {
        let rt = RichText(vec![
            RichTextBlock::paragraph("Primeiro parágrafo."),
            RichTextBlock::new(BlockKind::Heading2, "Título"),
        ]);
        assert_eq!(rt.as_text(), "Primeiro parágrafo. Título");
        assert_eq!(RichText::default().as_text(), "");
    }

    #[test]
    fn test_paragraph_is_escaped() {
        let rt = RichText(vec![RichTextBlock::paragraph("a < b & \"c\"")]);
        assert_eq!(rt.as_html(), "<p>a &lt; b &amp; &quot;c&quot;</p>");
    }

    #[test]
    fn test_spans_render_and_nest() {
        let block = RichTextBlock::paragraph("Hello bold world")
            .with_span(span(6, 16, SpanKind::Strong))
            .with_span(span(11, 16, SpanKind::Em));
        let html = RichText(vec![block]).as_html();
        assert_eq!(
            html,
            "<p>Hello <strong>bold <em>world</em></strong></p>"
        );
    }

    #[test]
    fn test_crossing_spans_stay_well_formed() {
        let block = RichTextBlock::paragraph("abcdef")
            .with_span(span(0, 4, SpanKind::Strong))
            .with_span(span(2, 6, SpanKind::Em));
        let html = RichText(vec![block]).as_html();
        assert_eq!(
            html,
            "<p><strong>ab<em>cd</em></strong><em>ef</em></p>"
        );
    }

    #[test]
    fn test_span_offsets_are_characters() {
        let block = RichTextBlock::paragraph("ação rápida").with_span(span(5, 11, SpanKind::Em));
        assert_eq!(
            RichText(vec![block]).as_html(),
            "<p>ação <em>rápida</em></p>"
        );
    }

    #[test]
    fn test_hyperlink_and_unsafe_link() {
        let block = RichTextBlock::paragraph("site e script")
            .with_span(link(0, 4, "https://example.com/?a=1&b=2"))
            .with_span(link(7, 13, "javascript:alert(1)"));
        let html = RichText(vec![block]).as_html();
        assert_eq!(
            html,
            r#"<p><a href="https://example.com/?a=1&amp;b=2">site</a> e script</p>"#
        );
    }

    #[test]
    fn test_list_items_are_grouped() {
        let rt = RichText(vec![
            RichTextBlock::new(BlockKind::ListItem, "um"),
            RichTextBlock::new(BlockKind::ListItem, "dois"),
            RichTextBlock::new(BlockKind::OrderedListItem, "três"),
            RichTextBlock::paragraph("fim"),
        ]);
        assert_eq!(
            rt.as_html(),
            "<ul><li>um</li><li>dois</li></ul><ol><li>três</li></ol><p>fim</p>"
        );
    }

    #[test]
    fn test_image_block() {
        let mut image = RichTextBlock::new(BlockKind::Image, "");
        image.url = Some("https://images.prismic.io/x.png".to_string());
        image.alt = Some("um \"foguete\"".to_string());
        assert_eq!(
            RichText(vec![image]).as_html(),
            r#"<p class="block-img"><img src="https://images.prismic.io/x.png" alt="um &quot;foguete&quot;"></p>"#
        );
    }

    #[test]
    fn test_deserialize_unknown_kinds() {
        let json = r#"[
            {"type": "paragraph", "text": "oi", "spans": [{"start": 0, "end": 2, "type": "strong"}]},
            {"type": "table", "text": ""},
            {"type": "preformatted", "text": "let x = 1;", "spans": [{"start": 0, "end": 3, "type": "weird"}]}
        ]"#;
        let rt: RichText = serde_json::from_str(json).unwrap();
        assert_eq!(rt.blocks()[1].kind, BlockKind::Unknown);
        assert_eq!(
            rt.as_html(),
            "<p><strong>oi</strong></p><pre>let x = 1;</pre>"
        );
    }
}
