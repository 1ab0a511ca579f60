//! Paginated query management
//!
//! This module provides an infinite-list query in the style of TanStack
//! Query's `useInfiniteQuery`: state is keyed by [`Filter`], pages accumulate
//! through [`PaginatedQuery::fetch_next_page`], and every transition is
//! published as a [`QuerySnapshot`] on a `watch` channel.
//!
//! Every request is tagged with the generation that was current when it was
//! issued. Changing the filter, refetching, or resetting bumps the generation,
//! so a late response for an older request is dropped instead of leaking into
//! newer state.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;
use universities_client::retry::retry_transient;
use universities_client::{
    Filter, Page, RemoteError, RetryPolicy, UniversityApi, UniversityRecord, PAGE_SIZE,
};

// =============================================================================
// Fetcher Seam
// =============================================================================

/// Source of pages for a filter
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page starting at `offset`
    async fn fetch_page(&self, filter: &Filter, offset: u32) -> Result<Page, RemoteError>;
}

#[async_trait]
impl PageFetcher for UniversityApi {
    async fn fetch_page(&self, filter: &Filter, offset: u32) -> Result<Page, RemoteError> {
        UniversityApi::fetch_page(self, filter, offset).await
    }
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for Arc<F> {
    async fn fetch_page(&self, filter: &Filter, offset: u32) -> Result<Page, RemoteError> {
        (**self).fetch_page(filter, offset).await
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// What `refetch` reloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefetchScope {
    /// Reload every loaded page from offset 0, replacing them all
    #[default]
    AllPages,
    /// Reload only the last loaded page in place
    LatestPage,
}

/// Query configuration
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Records per page; a shorter page marks the end of the list
    pub page_size: u32,

    /// Refetch behaviour
    pub refetch_scope: RefetchScope,

    /// Retry policy applied around each page fetch (no retries by default)
    pub retry: RetryPolicy,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            refetch_scope: RefetchScope::AllPages,
            retry: RetryPolicy::default(),
        }
    }
}

impl QueryConfig {
    /// Set the refetch scope
    pub fn with_refetch_scope(mut self, scope: RefetchScope) -> Self {
        self.refetch_scope = scope;
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Query status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// No enabled filter; nothing fetched
    Idle,

    /// First page for the current filter is loading
    Loading,

    /// Pages loaded, nothing in flight
    Ready,

    /// Loading the page after the last loaded one
    FetchingNextPage,

    /// Reloading already loaded pages
    Refetching,

    /// Last fetch failed; see `error`
    Errored,
}

/// Immutable view of the query state
///
/// `pages` is replaced (never mutated in place) on every change, so
/// `Arc::ptr_eq` between two snapshots tells whether the data moved.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    /// Filter this state belongs to
    pub filter: Filter,

    /// Current status
    pub status: QueryStatus,

    /// Loaded pages in offset order
    pub pages: Arc<Vec<Page>>,

    /// Whether the last loaded page was full
    pub has_next_page: bool,

    /// Most recent fetch failure
    pub error: Option<RemoteError>,
}

impl QuerySnapshot {
    fn new(filter: Filter) -> Self {
        Self {
            filter,
            status: QueryStatus::Idle,
            pages: Arc::new(Vec::new()),
            has_next_page: false,
            error: None,
        }
    }

    /// First page is loading
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    /// Next page is loading
    pub fn is_fetching_next_page(&self) -> bool {
        self.status == QueryStatus::FetchingNextPage
    }

    /// A refetch is running
    pub fn is_refetching(&self) -> bool {
        self.status == QueryStatus::Refetching
    }

    /// Any request is in flight
    pub fn is_fetching(&self) -> bool {
        matches!(
            self.status,
            QueryStatus::Loading | QueryStatus::FetchingNextPage | QueryStatus::Refetching
        )
    }

    /// All loaded records, flattened in order
    pub fn records(&self) -> impl Iterator<Item = &UniversityRecord> {
        self.pages.iter().flatten()
    }

    /// All loaded records as an owned list
    pub fn data(&self) -> Vec<UniversityRecord> {
        self.records().cloned().collect()
    }

    /// Number of loaded records
    pub fn record_count(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    /// Number of loaded pages
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Unique countries among the loaded records, sorted
    pub fn countries(&self) -> Vec<String> {
        self.records()
            .map(|r| r.country.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

// =============================================================================
// Query
// =============================================================================

#[derive(Debug)]
struct QueryInner {
    snapshot: QuerySnapshot,
    generation: u64,
    in_flight: bool,
}

/// Request handle tying a response to the state that issued it
#[derive(Debug, Clone)]
pub(crate) struct Ticket {
    filter: Filter,
    generation: u64,
}

/// Paginated query over a [`PageFetcher`]
///
/// Cloning is cheap; clones share state. Operations are async and drive the
/// fetch on the caller's task. The internal lock is never held across an
/// await.
///
/// # Example
///
/// ```no_run
/// use app_state::query::{PaginatedQuery, QueryConfig};
/// use universities_client::{ApiClient, ApiClientConfig, Filter, UniversityApi};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let api = UniversityApi::new(ApiClient::new(ApiClientConfig::default())?);
/// let query = PaginatedQuery::new(api, QueryConfig::default());
///
/// query.set_filter(Filter::by_name("oxford")).await;
/// loop {
///     let snapshot = query.snapshot();
///     if !snapshot.has_next_page || snapshot.error.is_some() {
///         break;
///     }
///     query.fetch_next_page().await;
/// }
/// println!("{} universities", query.snapshot().record_count());
/// # Ok(())
/// # }
/// ```
pub struct PaginatedQuery<F> {
    fetcher: Arc<F>,
    config: QueryConfig,
    inner: Arc<Mutex<QueryInner>>,
    snapshot_tx: Arc<watch::Sender<QuerySnapshot>>,
}

impl<F> Clone for PaginatedQuery<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            config: self.config.clone(),
            inner: Arc::clone(&self.inner),
            snapshot_tx: Arc::clone(&self.snapshot_tx),
        }
    }
}

impl<F: PageFetcher> PaginatedQuery<F> {
    /// Create an idle query
    pub fn new(fetcher: F, config: QueryConfig) -> Self {
        let snapshot = QuerySnapshot::new(Filter::default());
        let (snapshot_tx, _) = watch::channel(snapshot.clone());

        Self {
            fetcher: Arc::new(fetcher),
            config,
            inner: Arc::new(Mutex::new(QueryInner {
                snapshot,
                generation: 0,
                in_flight: false,
            })),
            snapshot_tx: Arc::new(snapshot_tx),
        }
    }

    /// Current state
    pub fn snapshot(&self) -> QuerySnapshot {
        self.inner.lock().snapshot.clone()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<QuerySnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Query configuration
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Switch to `filter`, loading its first page if it is enabled
    ///
    /// Setting the filter that is already active does nothing. Any other
    /// filter discards the current state entirely.
    pub async fn set_filter(&self, filter: Filter) {
        if let Some(ticket) = self.begin_filter(filter) {
            self.finish_filter(ticket).await;
        }
    }

    /// Synchronous half of [`set_filter`](Self::set_filter)
    ///
    /// Returns the ticket for the initial load when a fetch is needed.
    pub(crate) fn begin_filter(&self, filter: Filter) -> Option<Ticket> {
        let mut inner = self.inner.lock();
        if inner.snapshot.filter == filter {
            return None;
        }

        inner.generation += 1;
        let enabled = filter.is_enabled();
        let mut snapshot = QuerySnapshot::new(filter.clone());
        if enabled {
            snapshot.status = QueryStatus::Loading;
        }
        inner.snapshot = snapshot;
        inner.in_flight = enabled;
        self.publish(&inner);

        tracing::debug!(%filter, generation = inner.generation, enabled, "filter changed");

        enabled.then(|| Ticket {
            filter,
            generation: inner.generation,
        })
    }

    /// Async half of [`set_filter`](Self::set_filter)
    pub(crate) async fn finish_filter(&self, ticket: Ticket) {
        let result = self.load(&ticket.filter, 0).await;
        let page_size = self.page_size();

        self.apply(&ticket, |snapshot| match result {
            Ok(page) => {
                snapshot.has_next_page = page.len() == page_size as usize;
                snapshot.pages = Arc::new(vec![page]);
                snapshot.error = None;
                snapshot.status = QueryStatus::Ready;
            }
            Err(error) => {
                snapshot.has_next_page = false;
                snapshot.error = Some(error);
                snapshot.status = QueryStatus::Errored;
            }
        });
    }

    /// Load the page after the last loaded one
    ///
    /// Does nothing when there is no next page, a request is already in
    /// flight, or the last fetch failed (pagination stays halted until
    /// [`refetch`](Self::refetch) or a filter change).
    pub async fn fetch_next_page(&self) {
        let (ticket, offset) = {
            let mut inner = self.inner.lock();
            let snapshot = &inner.snapshot;
            if !snapshot.filter.is_enabled()
                || inner.in_flight
                || !snapshot.has_next_page
                || snapshot.error.is_some()
            {
                tracing::trace!(filter = %snapshot.filter, "fetch_next_page skipped");
                return;
            }

            let offset = self.page_size() * snapshot.pages.len() as u32;
            let ticket = Ticket {
                filter: snapshot.filter.clone(),
                generation: inner.generation,
            };
            inner.in_flight = true;
            inner.snapshot.status = QueryStatus::FetchingNextPage;
            self.publish(&inner);
            (ticket, offset)
        };

        let result = self.load(&ticket.filter, offset).await;
        let page_size = self.page_size();

        self.apply(&ticket, |snapshot| match result {
            Ok(page) => {
                snapshot.has_next_page = page.len() == page_size as usize;
                let mut pages = Vec::clone(&snapshot.pages);
                pages.push(page);
                snapshot.pages = Arc::new(pages);
                snapshot.error = None;
                snapshot.status = QueryStatus::Ready;
            }
            Err(error) => {
                snapshot.error = Some(error);
                snapshot.status = QueryStatus::Errored;
            }
        });
    }

    /// Reload already loaded data
    ///
    /// Always settles; the outcome is visible on the snapshot. A failed
    /// refetch keeps the previously loaded pages. Any next-page request still
    /// in flight is invalidated.
    pub async fn refetch(&self) {
        let (ticket, loaded) = {
            let mut inner = self.inner.lock();
            if !inner.snapshot.filter.is_enabled() {
                return;
            }

            inner.generation += 1;
            inner.in_flight = true;
            let loaded = inner.snapshot.pages.len();
            inner.snapshot.status = if loaded == 0 {
                QueryStatus::Loading
            } else {
                QueryStatus::Refetching
            };
            self.publish(&inner);

            let ticket = Ticket {
                filter: inner.snapshot.filter.clone(),
                generation: inner.generation,
            };
            (ticket, loaded)
        };

        tracing::debug!(filter = %ticket.filter, loaded, scope = ?self.config.refetch_scope, "refetching");

        match self.config.refetch_scope {
            RefetchScope::LatestPage if loaded > 0 => self.refetch_latest(ticket, loaded).await,
            _ => self.refetch_all(ticket, loaded.max(1)).await,
        }
    }

    async fn refetch_all(&self, ticket: Ticket, page_count: usize) {
        let page_size = self.page_size();
        let mut pages = Vec::with_capacity(page_count);
        let mut failure = None;

        for index in 0..page_count {
            match self.load(&ticket.filter, page_size * index as u32).await {
                Ok(page) => {
                    let short = page.len() < page_size as usize;
                    pages.push(page);
                    if short {
                        break;
                    }
                }
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }

        self.apply(&ticket, |snapshot| match failure {
            None => {
                snapshot.has_next_page = pages
                    .last()
                    .is_some_and(|page| page.len() == page_size as usize);
                snapshot.pages = Arc::new(pages);
                snapshot.error = None;
                snapshot.status = QueryStatus::Ready;
            }
            Some(error) => {
                snapshot.error = Some(error);
                snapshot.status = QueryStatus::Errored;
            }
        });
    }

    async fn refetch_latest(&self, ticket: Ticket, loaded: usize) {
        let page_size = self.page_size();
        let last = loaded - 1;
        let result = self.load(&ticket.filter, page_size * last as u32).await;

        self.apply(&ticket, |snapshot| match result {
            Ok(page) => {
                snapshot.has_next_page = page.len() == page_size as usize;
                let mut pages = Vec::clone(&snapshot.pages);
                pages.truncate(last);
                pages.push(page);
                snapshot.pages = Arc::new(pages);
                snapshot.error = None;
                snapshot.status = QueryStatus::Ready;
            }
            Err(error) => {
                snapshot.error = Some(error);
                snapshot.status = QueryStatus::Errored;
            }
        });
    }

    /// Drop all state and return to idle
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.in_flight = false;
        inner.snapshot = QuerySnapshot::new(Filter::default());
        self.publish(&inner);
    }

    async fn load(&self, filter: &Filter, offset: u32) -> Result<Page, RemoteError> {
        retry_transient(&self.config.retry, || self.fetcher.fetch_page(filter, offset)).await
    }

    /// Apply a response if its ticket is still current
    fn apply(&self, ticket: &Ticket, update: impl FnOnce(&mut QuerySnapshot)) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != ticket.generation || inner.snapshot.filter != ticket.filter {
            tracing::debug!(
                filter = %ticket.filter,
                generation = ticket.generation,
                current = inner.generation,
                "discarding stale response"
            );
            return false;
        }

        update(&mut inner.snapshot);
        inner.in_flight = false;

        if let Some(error) = &inner.snapshot.error {
            tracing::warn!(filter = %ticket.filter, status = ?error.status(), "query failed: {}", error);
        }

        self.publish(&inner);
        true
    }

    fn publish(&self, inner: &QueryInner) {
        self.snapshot_tx.send_replace(inner.snapshot.clone());
    }

    fn page_size(&self) -> u32 {
        self.config.page_size
    }
}
