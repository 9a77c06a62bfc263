//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{CacheDocument, FirestoreDb, SessionDocument};

/// Collection names as constants.
///
/// Both collections need a Firestore TTL policy on `expires_at`.
pub mod collections {
    pub const SESSIONS: &str = "sessions";
    /// Response cache, keyed by the URL-encoded cache key
    pub const CACHE: &str = "cache";
}
