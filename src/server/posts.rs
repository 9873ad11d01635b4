//! On-demand post pages
//!
//! The first request for a post starts its fetch in the background and
//! waits a short grace period for it. If the fetch is still running, the
//! caller gets `PostState::Loading` and the next request picks up the
//! result. Only `Ready` pages stay cached, until they go stale.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{watch, RwLock};

use crate::error::ContentError;
use crate::render::{PostState, PostView};

struct Entry {
    generation: u64,
    state: watch::Receiver<PostState>,
    started: Instant,
}

impl Entry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.state.borrow().is_loading() || self.started.elapsed() < ttl
    }
}

pub struct PostCache {
    entries: RwLock<HashMap<String, Entry>>,
    generations: AtomicU64,
    ttl: Duration,
    grace: Duration,
}

impl PostCache {
    pub fn new(ttl: Duration, grace: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            generations: AtomicU64::new(0),
            ttl,
            grace,
        }
    }

    /// State of the page for `uid`, starting `fetch` if nothing usable is
    /// cached
    pub async fn get<F, Fut>(&self, uid: &str, fetch: F) -> PostState
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PostView, ContentError>> + Send + 'static,
    {
        let (generation, receiver) = self.entry(uid, fetch).await;
        let state = settle(receiver, self.grace).await;

        match state {
            PostState::Ready(_) | PostState::Loading => {}
            // shown once; the next request fetches again
            PostState::NotFound | PostState::Failed(_) => self.forget(uid, generation).await,
        }
        state
    }

    /// Number of cached pages, including ones still loading
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn entry<F, Fut>(&self, uid: &str, fetch: F) -> (u64, watch::Receiver<PostState>)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PostView, ContentError>> + Send + 'static,
    {
        if let Some(entry) = self.entries.read().await.get(uid) {
            if entry.is_fresh(self.ttl) {
                return (entry.generation, entry.state.clone());
            }
        }

        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(uid) {
            if entry.is_fresh(self.ttl) {
                return (entry.generation, entry.state.clone());
            }
        }

        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = watch::channel(PostState::Loading);
        let pending = fetch();
        let key = uid.to_string();
        tokio::spawn(async move {
            let mut state = PostState::Loading;
            state.resolve(pending.await);
            tracing::debug!("Post {} settled", key);
            let _ = sender.send(state);
        });

        tracing::debug!("Fetching post {}", uid);
        entries.insert(
            uid.to_string(),
            Entry {
                generation,
                state: receiver.clone(),
                started: Instant::now(),
            },
        );
        (generation, receiver)
    }

    async fn forget(&self, uid: &str, generation: u64) {
        let mut entries = self.entries.write().await;
        if entries.get(uid).map(|e| e.generation) == Some(generation) {
            entries.remove(uid);
        }
    }
}

/// Wait up to `grace` for the page to leave `Loading`
async fn settle(mut receiver: watch::Receiver<PostState>, grace: Duration) -> PostState {
    match tokio::time::timeout(grace, receiver.wait_for(|s| !s.is_loading())).await {
        Ok(Ok(state)) => state.clone(),
        Ok(Err(_)) => PostState::Failed("post fetch was interrupted".to_string()),
        Err(_) => PostState::Loading,
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
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn view(uid: &str) -> PostView {
        DocumentRenderer::new(&SiteConfig::default(), Arc::new(Localizer::default()))
            .render(&detail(uid, "Título", 1), &Neighbors::default())
    }

    fn cache() -> PostCache {
        PostCache::new(Duration::from_secs(60), Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_ready_page_is_cached() {
        let cache = cache();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let state = cache
                .get("a", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(view("a"))
                })
                .await;
            assert!(matches!(state, PostState::Ready(ref v) if v.uid == "a"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_fetch_shows_loading_then_ready() {
        let cache = PostCache::new(Duration::from_secs(60), Duration::from_millis(300));
        let state = cache
            .get("a", || async {
                tokio::time::sleep(Duration::from_millis(400)).await;
                Ok(view("a"))
            })
            .await;
        assert_eq!(state, PostState::Loading);

        // in flight: a second request waits for the first fetch
        let state = cache.get("a", || async { Ok(view("other")) }).await;
        assert!(matches!(state, PostState::Ready(ref v) if v.uid == "a"));
    }

    #[tokio::test]
    async fn test_failure_is_shown_once() {
        let cache = cache();
        let state = cache
            .get("a", || async { Err::<PostView, _>(ContentError::Transport("timeout".into())) })
            .await;
        assert!(matches!(state, PostState::Failed(_)));
        assert_eq!(cache.len().await, 0);

        let state = cache.get("a", || async { Ok(view("a")) }).await;
        assert!(matches!(state, PostState::Ready(_)));
    }

    #[tokio::test]
    async fn test_not_found_is_not_kept() {
        let cache = cache();
        let state = cache
            .get("nope", || async {
                Err::<PostView, _>(ContentError::NotFound("posts/nope".into()))
            })
            .await;
        assert_eq!(state, PostState::NotFound);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_stale_page_is_fetched_again() {
        let cache = PostCache::new(Duration::from_millis(10), Duration::from_millis(200));
        cache.get("a", || async { Ok(view("a")) }).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        let mut updated = view("a");
        updated.title = "Atualizado".to_string();
        let state = cache.get("a", move || async move { Ok(updated) }).await;
        assert!(matches!(state, PostState::Ready(ref v) if v.title == "Atualizado"));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let cache = Arc::new(cache());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get("a", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(view("a"))
                    })
                    .await
            }));
        }
        for handle in handles {
            assert!(matches!(handle.await.unwrap(), PostState::Ready(_)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
