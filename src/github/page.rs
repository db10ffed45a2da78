//! Page handles for host collections.
//!
//! Every listing on the host is a finite sequence fetched one page at a time, always
//! restartable from page 1. Callers accumulate only what they need.

use super::errors::GitHubError;
use std::future::Future;

/// Page size used for every listing unless a caller asks otherwise.
pub const DEFAULT_PER_PAGE: u32 = 100;

/// One page of results plus the number of the page that follows it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub next: Option<u32>,
}

impl<T> Page<T> {
    pub fn last(content: Vec<T>) -> Self {
        Self {
            content,
            next: None,
        }
    }

    /// A short page (fewer items than requested) is the last one.
    pub fn from_items(content: Vec<T>, page: u32, per_page: u32) -> Self {
        let next = if per_page > 0 && content.len() as u32 >= per_page {
            Some(page + 1)
        } else {
            None
        };
        Self { content, next }
    }

    /// Pages of a listing that reports its total size up front.
    pub fn from_total(content: Vec<T>, page: u32, per_page: u32, total_count: u64) -> Self {
        let seen = u64::from(page) * u64::from(per_page);
        let next = if !content.is_empty() && seen < total_count {
            Some(page + 1)
        } else {
            None
        };
        Self { content, next }
    }

    /// Slice an in-memory collection the way the host would page it.
    pub fn slice(items: &[T], page: u32, per_page: u32) -> Self
    where
        T: Clone,
    {
        let per_page = per_page.max(1) as usize;
        let start = (page.max(1) as usize - 1) * per_page;
        let content: Vec<T> = items.iter().skip(start).take(per_page).cloned().collect();
        let next = if start + content.len() < items.len() {
            Some(page.max(1) + 1)
        } else {
            None
        };
        Self { content, next }
    }
}

/// Walk a paginated listing from page 1 until the host reports no further page.
pub async fn collect_all<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, GitHubError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, GitHubError>>,
{
    let mut items = Vec::new();
    let mut page = Some(1);
    while let Some(number) = page {
        let current = fetch(number).await?;
        items.extend(current.content);
        page = current.next;
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_reports_next_page_until_exhausted() {
        let items: Vec<u32> = (1..=5).collect();

        let first = Page::slice(&items, 1, 2);
        assert_eq!(first.content, vec![1, 2]);
        assert_eq!(first.next, Some(2));

        let last = Page::slice(&items, 3, 2);
        assert_eq!(last.content, vec![5]);
        assert_eq!(last.next, None);

        let beyond = Page::slice(&items, 4, 2);
        assert!(beyond.content.is_empty());
        assert_eq!(beyond.next, None);
    }

    #[test]
    fn test_from_total_stops_at_reported_count() {
        let page = Page::from_total(vec![1, 2], 1, 2, 3);
        assert_eq!(page.next, Some(2));
        let page = Page::from_total(vec![3], 2, 2, 3);
        assert_eq!(page.next, None);
    }

    #[tokio::test]
    async fn test_collect_all_walks_every_page() {
        let items: Vec<u32> = (1..=7).collect();
        let collected = collect_all(|page| {
            let items = items.clone();
            async move { Ok::<_, GitHubError>(Page::slice(&items, page, 3)) }
        })
        .await
        .unwrap();
        assert_eq!(collected, items);
    }

    #[tokio::test]
    async fn test_collect_all_propagates_page_failure() {
        let result = collect_all(|page| async move {
            if page == 2 {
                Err(GitHubError::NetworkError("reset".to_string()))
            } else {
                Ok(Page::from_items(vec![page], page, 1))
            }
        })
        .await;
        assert!(matches!(result, Err(GitHubError::NetworkError(_))));
    }
}
