//! Helper functions shared by the renderer, generator and templates

mod date;
mod html;
mod text;
mod url;

pub use date::*;
pub use html::*;
pub use text::*;
pub use url::*;
