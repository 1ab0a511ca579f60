//! Theme preference state

use std::sync::Arc;
use storage::{keys, KvStore, ThemeMode, ThemePreference};
use tokio::sync::watch;

/// Current theme preference, persisted on change
#[derive(Clone)]
pub struct ThemeState {
    kv: KvStore,
    preference_tx: Arc<watch::Sender<ThemePreference>>,
}

impl ThemeState {
    /// Load the stored preference
    ///
    /// Unknown or unreadable values fall back to [`ThemePreference::System`].
    pub fn load(kv: KvStore) -> Self {
        let preference = match kv.get_string(keys::THEME_PREFERENCE) {
            Ok(Some(stored)) => stored.parse::<ThemePreference>().unwrap_or_else(|e| {
                tracing::debug!("Ignoring stored theme: {}", e);
                ThemePreference::default()
            }),
            Ok(None) => ThemePreference::default(),
            Err(e) => {
                tracing::warn!("Failed to load theme preference: {}", e);
                ThemePreference::default()
            }
        };

        let (preference_tx, _) = watch::channel(preference);
        Self {
            kv,
            preference_tx: Arc::new(preference_tx),
        }
    }

    /// Current preference
    pub fn preference(&self) -> ThemePreference {
        *self.preference_tx.borrow()
    }

    /// Change the preference
    ///
    /// The in-memory value always changes; a failed write is only logged.
    pub fn set(&self, preference: ThemePreference) {
        self.preference_tx.send_if_modified(|current| {
            let changed = *current != preference;
            *current = preference;
            changed
        });

        if let Err(e) = self.kv.set(keys::THEME_PREFERENCE, preference.as_str()) {
            tracing::warn!("Failed to persist theme preference: {}", e);
        }
    }

    /// Concrete mode for the current system color scheme
    pub fn resolve(&self, system_is_dark: bool) -> ThemeMode {
        self.preference().resolve(system_is_dark)
    }

    /// Subscribe to preference changes
    pub fn subscribe(&self) -> watch::Receiver<ThemePreference> {
        self.preference_tx.subscribe()
    }
}

impl std::fmt::Debug for ThemeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeState")
            .field("preference", &self.preference())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_system() {
        let theme = ThemeState::load(KvStore::in_memory().unwrap());
        assert_eq!(theme.preference(), ThemePreference::System);
        assert_eq!(theme.resolve(true), ThemeMode::Dark);
        assert_eq!(theme.resolve(false), ThemeMode::Light);
    }

    #[test]
    fn test_set_persists_lowercase_string() {
        let kv = KvStore::in_memory().unwrap();
        let theme = ThemeState::load(kv.clone());

        theme.set(ThemePreference::Dark);
        assert_eq!(theme.resolve(false), ThemeMode::Dark);
        assert_eq!(kv.get_string(keys::THEME_PREFERENCE).unwrap(), Some("dark".to_string()));

        let reloaded = ThemeState::load(kv);
        assert_eq!(reloaded.preference(), ThemePreference::Dark);
    }

    #[test]
    fn test_unknown_stored_value_ignored() {
        let kv = KvStore::in_memory().unwrap();
        kv.set(keys::THEME_PREFERENCE, "sepia").unwrap();

        let theme = ThemeState::load(kv);
        assert_eq!(theme.preference(), ThemePreference::System);
    }

    #[test]
    fn test_non_string_stored_value_ignored() {
        let kv = KvStore::in_memory().unwrap();
        kv.set(keys::THEME_PREFERENCE, &1).unwrap();

        let theme = ThemeState::load(kv);
        assert_eq!(theme.preference(), ThemePreference::System);
    }

    #[tokio::test]
    async fn test_subscribers_only_see_real_changes() {
        let theme = ThemeState::load(KvStore::in_memory().unwrap());
        let mut rx = theme.subscribe();

        theme.set(ThemePreference::System);
        assert!(!rx.has_changed().unwrap());

        theme.set(ThemePreference::Light);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), ThemePreference::Light);
    }
}
