//! sift-store - SQLite persistence for sift.
//!
//! Implements [`sift_core::traits::EntityStore`] and
//! [`sift_core::traits::ProjectStore`] over a single SQLite database.
//!
//! # Example
//!
//! ```ignore
//! use sift_store::SqliteStore;
//!
//! let store = SqliteStore::new("~/.sift/sift.db")?;
//! let project = store.create_project("AcmeCo")?;
//! ```

mod sqlite;

pub use sqlite::SqliteStore;
