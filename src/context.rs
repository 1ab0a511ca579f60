//! Application context
//!
//! Everything the screens need, built once at startup and torn down
//! explicitly. There is no global state: hosts hold the [`AppContext`] and
//! hand out references.

use anyhow::{Context, Result};
use app_state::{
    FavoritesState, PaginatedQuery, QueryConfig, SearchInput, SearchSession, ThemeState,
};
use storage::{KvConfig, KvStore};
use universities_client::{ApiClient, ApiClientConfig, RetryPolicy, UniversityApi};

use crate::config::AppConfig;

/// Application context
pub struct AppContext {
    config: AppConfig,
    kv: KvStore,
    favorites: FavoritesState,
    theme: ThemeState,
    search: SearchSession<UniversityApi>,
}

impl AppContext {
    /// Open storage, load persisted state and start the search session
    ///
    /// Must be called inside a tokio runtime.
    pub fn init(config: AppConfig) -> Result<Self> {
        let kv_path = config.kv_path.to_string_lossy().into_owned();
        let kv = KvStore::new(KvConfig::new(kv_path.clone()))
            .with_context(|| format!("Failed to open key-value store at {kv_path}"))?;

        let client = ApiClient::new(
            ApiClientConfig::new(config.api_url.clone())
                .with_timeout(config.request_timeout)
                .with_logs(config.enable_api_logs),
        )
        .with_context(|| format!("Failed to create API client for {}", config.api_url))?;
        let api = UniversityApi::new(client);

        let favorites = FavoritesState::load(kv.clone());
        let theme = ThemeState::load(kv.clone());

        let query = PaginatedQuery::new(
            api,
            QueryConfig::default().with_retry(RetryPolicy::new(config.max_retries)),
        );
        let input = SearchInput::new(config.debounce_window, config.min_query_length);
        let search = SearchSession::new(query, input);

        tracing::info!(
            api_url = %config.api_url,
            favorites = favorites.len(),
            theme = %theme.preference(),
            "application context ready"
        );

        Ok(Self {
            config,
            kv,
            favorites,
            theme,
            search,
        })
    }

    /// Stop the search session and flush storage
    pub fn shutdown(self) -> Result<()> {
        let Self { search, kv, .. } = self;
        drop(search);

        kv.flush().context("Failed to flush key-value store")?;
        tracing::info!("application context shut down");
        Ok(())
    }

    /// Active configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Favorites state
    pub fn favorites(&self) -> &FavoritesState {
        &self.favorites
    }

    /// Theme state
    pub fn theme(&self) -> &ThemeState {
        &self.theme
    }

    /// Explore-screen search
    pub fn search(&self) -> &SearchSession<UniversityApi> {
        &self.search
    }

    /// Underlying key-value store
    pub fn kv(&self) -> &KvStore {
        &self.kv
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("favorites", &self.favorites)
            .field("theme", &self.theme)
            .finish_non_exhaustive()
    }
}
