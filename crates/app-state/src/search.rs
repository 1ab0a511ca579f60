//! Search session
//!
//! Ties the debounced search box and the country selector to a
//! [`PaginatedQuery`]. A relay task listens for settled queries and switches
//! the query's filter; everything else is a thin delegate the list view can
//! call directly (load more on scroll, pull to refresh, clear).

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use universities_client::Filter;

use crate::debounce::SearchInput;
use crate::query::{PaginatedQuery, PageFetcher, QuerySnapshot};

#[derive(Debug, Default)]
struct Selection {
    name: String,
    country: Option<String>,
}

impl Selection {
    fn filter(&self) -> Filter {
        Filter::by_name(self.name.clone()).with_country(self.country.clone())
    }
}

/// Explore-screen search state
///
/// Dropping the session stops the relay; a debounced query that has not
/// settled yet is discarded.
pub struct SearchSession<F> {
    input: SearchInput,
    query: PaginatedQuery<F>,
    selection: Arc<Mutex<Selection>>,
    relay: JoinHandle<()>,
}

impl<F> SearchSession<F>
where
    F: PageFetcher + 'static,
{
    /// Start a session; must be called inside a tokio runtime
    pub fn new(query: PaginatedQuery<F>, input: SearchInput) -> Self {
        let selection = Arc::new(Mutex::new(Selection::default()));
        let relay = tokio::spawn(relay(input.subscribe(), query.clone(), selection.clone()));

        Self {
            input,
            query,
            selection,
            relay,
        }
    }

    /// Search text changed
    pub fn set_text(&self, text: impl Into<String>) {
        self.input.set_text(text);
    }

    /// Pick a country (or none) and reload right away
    pub async fn select_country(&self, country: Option<String>) {
        let filter = {
            let mut selection = self.selection.lock();
            selection.country = country;
            selection.filter()
        };
        self.query.set_filter(filter).await;
    }

    /// Clear both the text and the country
    pub async fn clear(&self) {
        {
            let mut selection = self.selection.lock();
            selection.name.clear();
            selection.country = None;
        }
        self.input.clear();
        self.query.set_filter(Filter::default()).await;
    }

    /// Load the next page, if any (end of list reached)
    pub async fn load_more(&self) {
        self.query.fetch_next_page().await;
    }

    /// Pull to refresh; ignored while the search text is empty
    pub async fn refresh(&self) {
        if self.selection.lock().name.is_empty() {
            return;
        }
        self.query.refetch().await;
    }

    /// Current query state
    pub fn snapshot(&self) -> QuerySnapshot {
        self.query.snapshot()
    }

    /// Subscribe to query state
    pub fn subscribe(&self) -> watch::Receiver<QuerySnapshot> {
        self.query.subscribe()
    }

    /// Countries available for the dropdown
    pub fn countries(&self) -> Vec<String> {
        self.query.snapshot().countries()
    }

    /// The active filter
    pub fn filter(&self) -> Filter {
        self.selection.lock().filter()
    }

    /// Underlying query
    pub fn query(&self) -> &PaginatedQuery<F> {
        &self.query
    }
}

impl<F> Drop for SearchSession<F> {
    fn drop(&mut self) {
        self.relay.abort();
    }
}

async fn relay<F>(
    mut settled: watch::Receiver<String>,
    query: PaginatedQuery<F>,
    selection: Arc<Mutex<Selection>>,
) where
    F: PageFetcher + 'static,
{
    while settled.changed().await.is_ok() {
        let name = settled.borrow_and_update().clone();
        let filter = {
            let mut selection = selection.lock();
            selection.name = name;
            selection.filter()
        };

        tracing::debug!(%filter, "search settled");

        // Switch synchronously so filter changes apply in order; the load
        // itself runs on its own task so a slow response never delays the
        // next keystroke.
        if let Some(ticket) = query.begin_filter(filter) {
            let query = query.clone();
            tokio::spawn(async move { query.finish_filter(ticket).await });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{MockPageFetcher, QueryConfig, QueryStatus};
    use std::time::Duration;
    use tokio::time::timeout;
    use universities_client::{RemoteError, UniversityRecord};

    fn record(name: &str, country: &str) -> UniversityRecord {
        UniversityRecord {
            name: name.to_string(),
            country: country.to_string(),
            domains: vec![],
            web_pages: vec![],
            alpha_two_code: String::new(),
            state_province: None,
        }
    }

    fn session(mock: MockPageFetcher) -> SearchSession<MockPageFetcher> {
        let query = PaginatedQuery::new(mock, QueryConfig::default());
        SearchSession::new(query, SearchInput::new(Duration::from_millis(500), 0))
    }

    async fn wait_until(
        rx: &mut watch::Receiver<QuerySnapshot>,
        done: impl Fn(&QuerySnapshot) -> bool,
    ) -> QuerySnapshot {
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if done(&snapshot) {
                    return snapshot.clone();
                }
            }
            rx.changed().await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_fetches_once_after_settling() {
        let mut mock = MockPageFetcher::new();
        mock.expect_fetch_page()
            .withf(|filter, offset| filter == &Filter::by_name("oxf") && *offset == 0)
            .times(1)
            .returning(|_, _| Ok(vec![record("University of Oxford", "United Kingdom")]));

        let session = session(mock);
        let mut rx = session.subscribe();

        session.set_text("o");
        session.set_text("ox");
        session.set_text("oxf");

        let snapshot = wait_until(&mut rx, |s| s.status == QueryStatus::Ready).await;
        assert_eq!(snapshot.record_count(), 1);
        assert_eq!(session.filter(), Filter::by_name("oxf"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_country_selection_refilters() {
        let mut mock = MockPageFetcher::new();
        mock.expect_fetch_page().returning(|filter, _| {
            let mut page = vec![record("Uni A", "Peru")];
            if filter.country.is_none() {
                page.push(record("Uni B", "Chile"));
            }
            Ok(page)
        });

        let session = session(mock);
        let mut rx = session.subscribe();

        session.set_text("uni");
        wait_until(&mut rx, |s| s.status == QueryStatus::Ready).await;
        assert_eq!(session.countries(), vec!["Chile", "Peru"]);

        session.select_country(Some("Peru".to_string())).await;
        let snapshot = session.snapshot();
        assert_eq!(snapshot.filter, Filter::new("uni", Some("Peru")));
        assert_eq!(snapshot.record_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_returns_to_idle() {
        let mut mock = MockPageFetcher::new();
        mock.expect_fetch_page()
            .times(1)
            .returning(|_, _| Ok(vec![record("Uni", "Peru")]));

        let session = session(mock);
        let mut rx = session.subscribe();

        session.set_text("uni");
        wait_until(&mut rx, |s| s.status == QueryStatus::Ready).await;

        session.clear().await;
        assert_eq!(session.snapshot().status, QueryStatus::Idle);
        assert_eq!(session.filter(), Filter::default());
        assert_eq!(rx.borrow_and_update().status, QueryStatus::Idle);

        // The relay sees the cleared text but the filter is already empty
        let more = timeout(Duration::from_secs(2), rx.changed()).await;
        assert!(more.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_ignored_without_text() {
        let mut mock = MockPageFetcher::new();
        mock.expect_fetch_page().times(0);

        let session = session(mock);
        session.refresh().await;
        session.load_more().await;

        assert_eq!(session.snapshot().status, QueryStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_clears_error() {
        let mut mock = MockPageFetcher::new();
        let mut calls = 0;
        mock.expect_fetch_page().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(RemoteError::new(Some(503), "maintenance", None))
            } else {
                Ok(vec![record("Uni", "Peru")])
            }
        });

        let session = session(mock);
        let mut rx = session.subscribe();

        session.set_text("uni");
        let failed = wait_until(&mut rx, |s| s.status == QueryStatus::Errored).await;
        assert_eq!(failed.error.unwrap().message(), "maintenance");

        session.refresh().await;
        let snapshot = session.snapshot();
        assert_eq!(snapshot.status, QueryStatus::Ready);
        assert!(snapshot.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_discards_unsettled_query() {
        let mut mock = MockPageFetcher::new();
        mock.expect_fetch_page().times(0);

        let session = session(mock);
        let query = session.query().clone();

        session.set_text("harvard");
        drop(session);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(query.snapshot().status, QueryStatus::Idle);
    }
}
