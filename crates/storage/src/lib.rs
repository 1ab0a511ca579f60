//! Storage layer for Whitebeard
//!
//! This crate provides the sled-backed key-value store and the persisted
//! preference types written into it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod kv;
pub mod preferences;

pub use kv::{KvConfig, KvError, KvStore};
pub use preferences::{keys, ThemeMode, ThemePreference};
