//! Persisted user preferences
//!
//! Storage keys and the value types written under them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage keys used by the application
pub mod keys {
    /// JSON array of favorite universities
    pub const FAVORITES: &str = "favorites";
    /// Theme preference, stored as a lowercase string
    pub const THEME_PREFERENCE: &str = "theme_preference";
}

/// User theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    /// Follow system color scheme
    #[default]
    System,
    /// Always use light mode
    Light,
    /// Always use dark mode
    Dark,
}

/// Concrete theme mode after resolving the preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeMode {
    /// Light palette
    Light,
    /// Dark palette
    Dark,
}

impl ThemePreference {
    /// Resolve to a concrete mode given the system color scheme
    pub fn resolve(self, system_is_dark: bool) -> ThemeMode {
        match self {
            ThemePreference::System if system_is_dark => ThemeMode::Dark,
            ThemePreference::System | ThemePreference::Light => ThemeMode::Light,
            ThemePreference::Dark => ThemeMode::Dark,
        }
    }

    /// Stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemePreference::System => "system",
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
        }
    }
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized stored preference
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown theme preference: {0}")]
pub struct UnknownThemePreference(pub String);

impl FromStr for ThemePreference {
    type Err = UnknownThemePreference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(ThemePreference::System),
            "light" => Ok(ThemePreference::Light),
            "dark" => Ok(ThemePreference::Dark),
            other => Err(UnknownThemePreference(other.to_string())),
        }
    }
}
