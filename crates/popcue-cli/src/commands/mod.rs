pub mod config;
pub mod session;
pub mod simulate;

use std::path::Path;

use popcue_core::{SqliteStore, StoreError};

/// Open `db`, or the default session database when no path is given.
pub(crate) fn open_store(db: Option<&Path>) -> Result<SqliteStore, StoreError> {
    match db {
        Some(path) => SqliteStore::open(path),
        None => SqliteStore::open_default(),
    }
}
