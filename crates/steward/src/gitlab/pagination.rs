//! Page-numbered collection walking.
//!
//! GitLab listings are exhausted by requesting `page=1, 2, ...` until the
//! server answers with an empty array. The walker relies on that contract and
//! enforces no page cap: a server that never returns an empty page keeps the
//! loop going.

use std::future::Future;

use super::error::GitLabError;
use crate::fleet::{FleetProgress, ProgressCallback, emit};

/// First page number requested by every walk.
pub const FIRST_PAGE: u32 = 1;

/// Drive `fetch_page` from [`FIRST_PAGE`] until it yields an empty page.
///
/// The first failing page aborts the walk; entities gathered so far are
/// discarded because a partial fleet is not a usable base set.
pub async fn walk_pages<T, F, Fut>(
    collection: &str,
    mut fetch_page: F,
    on_progress: Option<&ProgressCallback>,
) -> Result<Vec<T>, GitLabError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, GitLabError>>,
{
    emit(
        on_progress,
        FleetProgress::WalkingCollection {
            collection: collection.to_string(),
        },
    );

    let mut entities = Vec::new();
    let mut page = FIRST_PAGE;

    loop {
        let batch = fetch_page(page).await?;
        if batch.is_empty() {
            break;
        }

        let count = batch.len();
        entities.extend(batch);
        tracing::debug!(collection, page, count, total = entities.len(), "Fetched page");
        emit(
            on_progress,
            FleetProgress::FetchedPage {
                collection: collection.to_string(),
                page,
                count,
                total_so_far: entities.len(),
            },
        );

        page += 1;
    }

    emit(
        on_progress,
        FleetProgress::WalkComplete {
            collection: collection.to_string(),
            total: entities.len(),
        },
    );

    Ok(entities)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Serve `total` sequential ids in pages of `page_size`, then empty pages.
    fn paged_source(total: u64, page_size: u64, page: u32) -> Vec<u64> {
        let start = (u64::from(page) - 1) * page_size;
        (start..total.min(start + page_size)).collect()
    }

    #[tokio::test]
    async fn test_walk_returns_every_item_once_for_any_page_size() {
        for total in [0u64, 1, 7, 20, 101] {
            for page_size in [1u64, 3, 20, 100] {
                let items = walk_pages(
                    "projects",
                    |page| async move { Ok(paged_source(total, page_size, page)) },
                    None,
                )
                .await
                .unwrap();

                assert_eq!(items.len() as u64, total, "total={total} size={page_size}");
                let unique: HashSet<_> = items.iter().copied().collect();
                assert_eq!(unique.len() as u64, total);
            }
        }
    }

    #[tokio::test]
    async fn test_walk_starts_at_first_page_and_stops_after_empty_page() {
        let requested = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requested);

        let items = walk_pages(
            "groups",
            move |page| {
                seen.lock().unwrap().push(page);
                async move { Ok(paged_source(5, 2, page)) }
            },
            None,
        )
        .await
        .unwrap();

        assert_eq!(items, vec![0, 1, 2, 3, 4]);
        assert_eq!(*requested.lock().unwrap(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_walk_propagates_page_failure() {
        let result: Result<Vec<u64>, _> = walk_pages(
            "projects",
            |page| async move {
                if page == 2 {
                    Err(GitLabError::Transport("connection reset".to_string()))
                } else {
                    Ok(paged_source(10, 3, page))
                }
            },
            None,
        )
        .await;

        assert!(matches!(result, Err(GitLabError::Transport(_))));
    }

    #[tokio::test]
    async fn test_walk_emits_page_progress() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let capture = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |event| {
            capture.lock().unwrap().push(event);
        });

        walk_pages(
            "projects",
            |page| async move { Ok(paged_source(3, 2, page)) },
            Some(&callback),
        )
        .await
        .unwrap();

        let events = events.lock().unwrap();
        assert!(matches!(events[0], FleetProgress::WalkingCollection { .. }));
        let pages = events
            .iter()
            .filter(|e| matches!(e, FleetProgress::FetchedPage { .. }))
            .count();
        assert_eq!(pages, 2);
        assert!(matches!(
            events.last(),
            Some(FleetProgress::WalkComplete { total: 3, .. })
        ));
    }
}
