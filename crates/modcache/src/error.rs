//! Error types for collection cache operations.
//!
//! All fallible functions in this crate return [`Result<T>`], which uses [`Error`]
//! as the error type. Errors from the path and metadata crates, `std::io::Error`,
//! `serde_json` and `toml` are converted via `From` impls.

use modcache_core::{CollectionId, ModKey};
use modcache_meta::MetaError;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A virtual path failed normalization.
    #[error("Path error: {0}")]
    Core(#[from] modcache_core::Error),

    /// A metadata manipulation was rejected or a base table failed to parse.
    #[error("Metadata error: {0}")]
    Meta(#[from] MetaError),

    /// Filesystem I/O failed (reading or writing the configuration file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize a debug snapshot.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration file is malformed.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// The configuration could not be written back out.
    #[error("Config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// No cache exists for the requested collection.
    #[error("Unknown collection: {0}")]
    UnknownCollection(CollectionId),

    /// The mod storage has no mod under this key.
    #[error("Unknown mod: {0}")]
    UnknownMod(ModKey),

    /// A redirect payload renders longer than the host's path buffer.
    #[error("Payload for '{path}' is {len} bytes long, the limit is {max}")]
    PayloadTooLong {
        path: String,
        payload: String,
        len: usize,
        max: usize,
    },
}
