//! Dispatch error taxonomy.
//!
//! Race losses, duplicate completions, and duplicate ratings are NOT
//! errors; they are expected protocol branches carried in outcome enums.

use sapar_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Malformed input (bad price, bad phone, out-of-range rating).
    /// Surfaced to the originating caller; never a system fault.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced order or driver does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store failed. Fatal to this one operation; every store write is
    /// a single atomic statement, so no partial state is left behind.
    #[error("store error: {0}")]
    Store(DbError),
}

impl From<DbError> for DispatchError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => DispatchError::NotFound(what),
            other => DispatchError::Store(other),
        }
    }
}
