//! Core value types shared by the layered mod resolution cache.
//!
//! This crate holds the leaf types every other crate in the workspace keys its
//! maps with: normalized [`VirtualPath`]s, the [`Payload`] a path resolves to,
//! and the identities of mods ([`ModKey`]) and collections ([`CollectionId`]).

mod error;
mod keys;
mod path;

pub use error::{Error, Result};
pub use keys::{CollectionId, ModKey};
pub use path::{Payload, SyntheticPath, VirtualPath, MAX_PATH_LENGTH};
