//! Session storage for the bearer token and other per-user values.
//!
//! # Data Flow
//! ```text
//! CLI `token set` / embedding app
//!     → SessionStore::set("token", ...)
//!     → ApiTransport reads auth.token_key on every call
//!     → Authorization: Bearer <token>
//! ```

pub mod file;
pub mod memory;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

/// Opaque key-value store the transport reads session data from.
///
/// Writes report storage failures; a failed write leaves the previous value
/// in place.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> std::io::Result<()>;

    fn remove(&self, key: &str) -> std::io::Result<()>;
}
