//! University listing endpoint
//!
//! One call fetches one page. No retries happen here; the query layer owns
//! that policy.

use crate::client::{ApiClient, RemoteError};
use crate::types::{Filter, Page, PAGE_SIZE};

/// Path of the listing endpoint, relative to the base URL
pub const SEARCH_PATH: &str = "search";

/// Typed access to the university listing
///
/// # Example
///
/// ```no_run
/// # use universities_client::{ApiClient, ApiClientConfig, Filter, UniversityApi};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ApiClient::new(ApiClientConfig::default())?;
/// let api = UniversityApi::new(client);
/// let page = api.fetch_page(&Filter::by_name("oxford"), 0).await?;
/// for university in &page {
///     println!("{} ({})", university.name, university.country);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct UniversityApi {
    client: ApiClient,
    page_size: u32,
}

impl UniversityApi {
    /// Create the API over a shared client
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            page_size: PAGE_SIZE,
        }
    }

    /// Records requested per page
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Underlying HTTP client
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Fetch one page of universities matching `filter`, starting at `offset`
    ///
    /// An empty or `null` body is an empty page, not an error.
    pub async fn fetch_page(&self, filter: &Filter, offset: u32) -> Result<Page, RemoteError> {
        let mut params: Vec<(&str, String)> = filter
            .query_params()
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect();
        params.push(("limit", self.page_size.to_string()));
        params.push(("offset", offset.to_string()));

        let page = self
            .client
            .get_json::<Page>(SEARCH_PATH, &params)
            .await?
            .unwrap_or_default();

        tracing::debug!(%filter, offset, count = page.len(), "fetched page");
        Ok(page)
    }
}
