//! Whitebeard
//!
//! Core of a university directory app: debounced search over the public
//! universities API with infinite-scroll pagination, a persisted favorites
//! list and a persisted theme preference.
//!
//! # Example
//!
//! ```no_run
//! use whitebeard::{AppConfig, AppContext};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     whitebeard::logging::init();
//!
//!     let context = AppContext::init(AppConfig::from_env()?)?;
//!     context.search().set_text("oxford");
//!
//!     let mut results = context.search().subscribe();
//!     results.changed().await?;
//!
//!     context.shutdown()
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod logging;

pub use config::AppConfig;
pub use context::AppContext;

pub use app_state;
pub use storage;
pub use universities_client;
