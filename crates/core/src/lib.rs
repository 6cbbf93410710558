#![warn(clippy::all, missing_docs)]

//! Core domain logic for SnowSeeker.
//!
//! This crate hosts the resort catalog, the favorites store and its
//! persistence adapters, the list projection (sort + search), and
//! configuration handling used by the terminal UI and any future frontends.

pub mod catalog;
pub mod config;
pub mod favorites;
pub mod models;
pub mod projection;
pub mod storage;

pub use catalog::{Catalog, CatalogError};
pub use config::AppConfig;
pub use favorites::{ChangeKind, FavoritesChange, FavoritesError, FavoritesStore, ListenerId};
pub use models::Resort;
pub use projection::{project, SortOrder};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
