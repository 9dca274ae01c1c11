//! In-memory key-value map persisted to a single file.
//!
//! Open a store, use it like a map, and it takes care of the file: prior state
//! is loaded on open, an optional background thread rewrites the file on a
//! timer, and a final save runs when the handle is closed or dropped.
//!
//! ```rust,no_run
//! use file_map::FileMap;
//! use std::time::Duration;
//!
//! let db = FileMap::<String, String>::open_with_interval(
//!     "state/db.bin",
//!     Duration::from_secs(30),
//! )
//! .unwrap();
//! db.insert("hello".into(), "world".into());
//! db.close().unwrap();
//! ```
//!
//! The encoding is pluggable through [`Codec`]: bincode by default, JSON via
//! [`JsonCodec`], or any function pair via [`FnCodec`].
//!
//! **Single-process only.** If multiple processes open the same file they will
//! clobber each other. Saves rewrite the file in place, so a crash during a
//! save can leave it torn.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod codec;
pub mod error;
pub mod persist;
pub mod store;
pub mod worker;

pub use backend::MapBackend;
pub use codec::{BincodeCodec, Codec, DataMode, FnCodec, JsonCodec};
pub use error::{Error, Result};
pub use indexmap::IndexMap;
pub use store::{FileMap, FileMapBuilder, FileMapHandle};

/// Default backend: an insertion-ordered map behind a reader-writer lock, so
/// every save sees an atomic snapshot and writes entries in a stable order.
pub type DefaultBackend<K, V> = parking_lot::RwLock<IndexMap<K, V>>;
