//! Content module - post documents and rich text

mod post;
pub mod richtext;

pub use post::publication_date;
pub use post::{
    Banner, DetailData, Document, PostDetail, PostPage, PostSummary, Section, SummaryData,
};
pub use richtext::{RichText, RichTextBlock};
