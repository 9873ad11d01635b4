//! Lifecycle of a post page generated on demand

use std::sync::Arc;

use super::PostView;
use crate::error::ContentError;

/// A post page is `Loading` until its fetch resolves, then settles once.
#[derive(Debug, Clone, PartialEq)]
pub enum PostState {
    Loading,
    Ready(Arc<PostView>),
    NotFound,
    /// The fetch failed; the message is shown once and the page retried
    Failed(String),
}

impl PostState {
    /// Settle a `Loading` state with the fetch outcome.
    ///
    /// Returns `false` and leaves the state alone if it already settled.
    pub fn resolve(&mut self, outcome: Result<PostView, ContentError>) -> bool {
        if !self.is_loading() {
            return false;
        }
        *self = match outcome {
            Ok(view) => PostState::Ready(Arc::new(view)),
            Err(ContentError::NotFound(_)) => PostState::NotFound,
            Err(e) => PostState::Failed(e.to_string()),
        };
        true
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, PostState::Loading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::helpers::Localizer;
    use crate::render::DocumentRenderer;
    use crate::source::memory::detail;
    use crate::source::Neighbors;

    fn view() -> PostView {
        DocumentRenderer::new(&SiteConfig::default(), Arc::new(Localizer::default()))
            .render(&detail("a", "A", 1), &Neighbors::default())
    }

    #[test]
    fn test_loading_resolves_once() {
        let mut state = PostState::Loading;
        assert!(state.resolve(Ok(view())));
        assert!(matches!(state, PostState::Ready(_)));

        // a second outcome does not overwrite the settled page
        assert!(!state.resolve(Err(ContentError::NotFound("posts/a".into()))));
        assert!(matches!(state, PostState::Ready(_)));
    }

    #[test]
    fn test_resolve_errors() {
        let mut state = PostState::Loading;
        state.resolve(Err(ContentError::NotFound("posts/x".into())));
        assert_eq!(state, PostState::NotFound);

        let mut state = PostState::Loading;
        state.resolve(Err(ContentError::Transport("timeout".into())));
        assert!(matches!(state, PostState::Failed(ref m) if m.contains("timeout")));
    }
}
