//! Link-following pagination over the retrying fetcher.

use std::future::Future;

use tracing::{debug, info, warn};

use super::retry::{with_retry, RetryPolicy};
use crate::context::CancelFlag;
use crate::error::{ApiError, FetchError};

/// One page of records plus the link to the next page, if any.
#[derive(Debug)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub next_link: Option<String>,
}

/// Page size hint and safety cap on pages fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub page_size: u32,
    pub max_pages: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            page_size: 999,
            max_pages: 10_000,
        }
    }
}

/// Records accumulated in page-delivery order.
#[derive(Debug)]
pub struct ResultSet<T> {
    records: Vec<T>,
    pages: usize,
    complete: bool,
}

impl<T> ResultSet<T> {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            pages: 0,
            complete: false,
        }
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn into_records(self) -> Vec<T> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    /// False when the run was cancelled before the last page.
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// Fetch every page starting at `initial_url`.
///
/// Each page goes through [`with_retry`]. A next link equal to the link just
/// fetched, or more than `limits.max_pages` pages, fails with
/// [`FetchError::PaginationLoopSuspected`]. When `cancel` is set, between
/// pages or during a backoff wait, the records gathered so far are returned
/// with `is_complete() == false`.
pub async fn paginate<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    initial_url: String,
    limits: &PageLimits,
    cancel: &CancelFlag,
    mut fetch_page: F,
) -> Result<ResultSet<T>, FetchError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Page<T>, ApiError>>,
{
    let mut result = ResultSet::new();
    let mut url = initial_url;

    loop {
        if cancel.is_cancelled() {
            return Ok(cancelled(operation, result));
        }

        if result.pages >= limits.max_pages {
            return Err(FetchError::PaginationLoopSuspected {
                operation: operation.to_string(),
                pages: result.pages,
                link: url,
            });
        }

        debug!("Fetching page {} of {}: {}", result.pages + 1, operation, url);
        let page = match with_retry(policy, operation, cancel, || fetch_page(url.clone())).await {
            Ok(page) => page,
            Err(FetchError::Cancelled { .. }) => return Ok(cancelled(operation, result)),
            Err(e) => return Err(e),
        };

        result.pages += 1;
        result.records.extend(page.records);

        match page.next_link {
            None => {
                info!(
                    "{}: {} records in {} pages",
                    operation,
                    result.records.len(),
                    result.pages
                );
                result.complete = true;
                return Ok(result);
            }
            Some(next) if next == url => {
                return Err(FetchError::PaginationLoopSuspected {
                    operation: operation.to_string(),
                    pages: result.pages,
                    link: next,
                });
            }
            Some(next) => url = next,
        }
    }
}

fn cancelled<T>(operation: &str, result: ResultSet<T>) -> ResultSet<T> {
    warn!(
        "{} cancelled after {} pages ({} records)",
        operation,
        result.pages,
        result.records.len()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn page(records: &[u32], next: Option<&str>) -> Page<u32> {
        Page {
            records: records.to_vec(),
            next_link: next.map(String::from),
        }
    }

    /// Serves canned pages keyed by URL.
    fn serve(
        pages: HashMap<&'static str, (Vec<u32>, Option<&'static str>)>,
    ) -> impl FnMut(String) -> std::future::Ready<Result<Page<u32>, ApiError>> {
        move |url: String| {
            let result = match pages.get(url.as_str()) {
                Some((records, next)) => Ok(page(records, *next)),
                None => Err(ApiError::NotFound(url)),
            };
            std::future::ready(result)
        }
    }

    #[tokio::test]
    async fn test_concatenates_pages_in_order() {
        let pages = HashMap::from([
            ("p1", (vec![1, 2], Some("p2"))),
            ("p2", (vec![3], Some("p3"))),
            ("p3", (vec![4, 5], None)),
        ]);

        let result = paginate(
            &RetryPolicy::immediate(0),
            "list",
            "p1".to_string(),
            &PageLimits::default(),
            &CancelFlag::new(),
            serve(pages),
        )
        .await
        .unwrap();

        assert_eq!(result.records(), &[1, 2, 3, 4, 5]);
        assert_eq!(result.pages(), 3);
        assert!(result.is_complete());
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let pages = HashMap::from([("p1", (vec![7, 7], Some("p2"))), ("p2", (vec![7], None))]);

        let result = paginate(
            &RetryPolicy::immediate(0),
            "list",
            "p1".to_string(),
            &PageLimits::default(),
            &CancelFlag::new(),
            serve(pages),
        )
        .await
        .unwrap();

        assert_eq!(result.into_records(), vec![7, 7, 7]);
    }

    #[tokio::test]
    async fn test_empty_first_page() {
        let pages = HashMap::from([("p1", (vec![], None))]);

        let result = paginate(
            &RetryPolicy::immediate(0),
            "list",
            "p1".to_string(),
            &PageLimits::default(),
            &CancelFlag::new(),
            serve(pages),
        )
        .await
        .unwrap();

        assert!(result.is_empty());
        assert_eq!(result.pages(), 1);
        assert!(result.is_complete());
    }

    #[tokio::test]
    async fn test_repeated_token_is_loop() {
        let pages = HashMap::from([
            ("p1", (vec![1], Some("tok"))),
            ("tok", (vec![2], Some("tok"))),
        ]);

        let err = paginate(
            &RetryPolicy::immediate(0),
            "list",
            "p1".to_string(),
            &PageLimits::default(),
            &CancelFlag::new(),
            serve(pages),
        )
        .await
        .unwrap_err();

        match err {
            FetchError::PaginationLoopSuspected { pages, link, .. } => {
                assert_eq!(pages, 2);
                assert_eq!(link, "tok");
            }
            other => panic!("expected PaginationLoopSuspected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_page_cap() {
        let calls = AtomicU32::new(0);
        let limits = PageLimits {
            page_size: 10,
            max_pages: 3,
        };

        // Every page links to a fresh URL forever
        let err = paginate(
            &RetryPolicy::immediate(0),
            "list",
            "start".to_string(),
            &limits,
            &CancelFlag::new(),
            |_url: String| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Ok::<_, ApiError>(page(&[n], Some(&format!("next-{}", n)))))
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, FetchError::PaginationLoopSuspected { pages: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_transient_page_is_retried() {
        let calls = AtomicU32::new(0);

        let result = paginate(
            &RetryPolicy::immediate(3),
            "list",
            "p1".to_string(),
            &PageLimits::default(),
            &CancelFlag::new(),
            |_url: String| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                let outcome = if n == 0 {
                    Err(ApiError::Throttled {
                        status: 429,
                        retry_after: None,
                    })
                } else {
                    Ok(page(&[9], None))
                };
                std::future::ready(outcome)
            },
        )
        .await
        .unwrap();

        assert_eq!(result.records(), &[9]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancel_returns_partial() {
        let cancel = CancelFlag::new();
        let handle = cancel.clone();

        let result = paginate(
            &RetryPolicy::immediate(0),
            "list",
            "p1".to_string(),
            &PageLimits::default(),
            &cancel,
            |url: String| {
                // Operator cancels while the first page is in flight
                handle.cancel();
                std::future::ready(Ok::<_, ApiError>(page(&[1, 2], Some(&format!("{}-next", url)))))
            },
        )
        .await
        .unwrap();

        assert_eq!(result.records(), &[1, 2]);
        assert!(!result.is_complete());
    }

    #[tokio::test]
    async fn test_cancel_during_backoff_keeps_fetched_pages() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: std::time::Duration::from_secs(60),
            max_delay: std::time::Duration::from_secs(300),
        };
        let cancel = CancelFlag::new();
        let handle = cancel.clone();

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            paginate(
                &policy,
                "list",
                "p1".to_string(),
                &PageLimits::default(),
                &cancel,
                |_url: String| {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n > 0 {
                        // Second page is throttled; operator interrupts the wait
                        let handle = handle.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                            handle.cancel();
                        });
                    }
                    let outcome = if n == 0 {
                        Ok(page(&[1, 2], Some("p2")))
                    } else {
                        Err(ApiError::Throttled {
                            status: 429,
                            retry_after: None,
                        })
                    };
                    std::future::ready(outcome)
                },
            ),
        )
        .await
        .expect("paginate should stop waiting once cancelled")
        .unwrap();

        assert_eq!(result.records(), &[1, 2]);
        assert_eq!(result.pages(), 1);
        assert!(!result.is_complete());
    }
}
