//! Core types for the university listing API
//!
//! `Filter` identifies one logical search and doubles as the cache key for the
//! query layer, so it compares by value. `UniversityRecord` mirrors the JSON
//! shape returned by the listing endpoint.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of records requested per page
pub const PAGE_SIZE: u32 = 10;

/// One batch of records returned by a single fetch
pub type Page = Vec<UniversityRecord>;

// =============================================================================
// Filter
// =============================================================================

/// Search filter (name, country)
///
/// An empty country is normalized to `None`, so `Filter::new("x", Some(""))`
/// and `Filter::new("x", None)` are the same key.
///
/// # Examples
/// ```
/// use universities_client::Filter;
///
/// let a = Filter::new("cambridge", Some("United Kingdom"));
/// let b = Filter::new("cambridge", Some("United Kingdom".to_string()));
/// assert_eq!(a, b);
/// assert!(a.is_enabled());
/// assert!(!Filter::default().is_enabled());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    /// Name fragment to search for
    pub name: String,
    /// Optional exact country
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Filter {
    /// Create a new filter
    pub fn new<C: Into<String>>(name: impl Into<String>, country: Option<C>) -> Self {
        let country = country.map(Into::into).filter(|c| !c.is_empty());
        Self {
            name: name.into(),
            country,
        }
    }

    /// Filter on name only
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            country: None,
        }
    }

    /// Replace the country, keeping the name
    pub fn with_country(mut self, country: Option<String>) -> Self {
        self.country = country.filter(|c| !c.is_empty());
        self
    }

    /// Whether this filter should hit the network at all
    pub fn is_enabled(&self) -> bool {
        !self.name.is_empty() || self.country.as_deref().is_some_and(|c| !c.is_empty())
    }

    /// Query parameters for this filter, empty values omitted
    pub fn query_params(&self) -> Vec<(&'static str, &str)> {
        let mut params = Vec::with_capacity(2);
        if !self.name.is_empty() {
            params.push(("name", self.name.as_str()));
        }
        if let Some(country) = self.country.as_deref().filter(|c| !c.is_empty()) {
            params.push(("country", country));
        }
        params
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "name={:?}", self.name)?;
        if let Some(country) = &self.country {
            write!(f, " country={:?}", country)?;
        }
        Ok(())
    }
}

// =============================================================================
// University Record
// =============================================================================

/// A university as returned by the listing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniversityRecord {
    /// Display name
    pub name: String,
    /// Country name
    pub country: String,
    /// Email / web domains
    #[serde(default)]
    pub domains: Vec<String>,
    /// Website URLs
    #[serde(default)]
    pub web_pages: Vec<String>,
    /// ISO 3166-1 alpha-2 country code
    #[serde(default)]
    pub alpha_two_code: String,
    /// State or province, when the source provides one
    #[serde(rename = "state-province", default)]
    pub state_province: Option<String>,
}

impl UniversityRecord {
    /// First website, with a scheme prepended when the source omitted it
    pub fn primary_website(&self) -> Option<String> {
        let page = self.web_pages.first()?;
        if page.starts_with("http") {
            Some(page.clone())
        } else {
            Some(format!("https://{}", page))
        }
    }
}
