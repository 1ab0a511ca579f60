//! Application state for Whitebeard
//!
//! This crate provides the non-visual core of the explore and favorites
//! screens: a debounced search input, a paginated query over the universities
//! API, the session wiring the two together, and the persisted favorites and
//! theme state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod debounce;
pub mod favorites;
pub mod query;
pub mod search;
pub mod theme;

pub use debounce::{Debouncer, SearchInput, DEFAULT_QUIESCENCE};
pub use favorites::{FavoritesError, FavoritesState};
pub use query::{
    PageFetcher, PaginatedQuery, QueryConfig, QuerySnapshot, QueryStatus, RefetchScope,
};
pub use search::SearchSession;
pub use theme::ThemeState;
