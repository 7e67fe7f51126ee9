//! Virtual path normalization and resolved payloads.
//!
//! Virtual paths are the exact keys the host uses to look up resources. They
//! are normalized once on construction so that every map in the workspace can
//! compare them byte-for-byte:
//!
//! - `\` separators become `/`, repeated and leading/trailing separators are dropped
//! - ASCII letters are lower-cased (lookups are case-insensitive)
//! - non-ASCII input is rejected, as is anything longer than [`MAX_PATH_LENGTH`]

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Maximum length in bytes of a normalized virtual path.
pub const MAX_PATH_LENGTH: usize = 256;

/// A normalized, case-insensitive resource key.
///
/// Cloning is cheap; the normalized string is shared.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualPath(Arc<str>);

impl VirtualPath {
    /// Normalize `raw` into a virtual path.
    pub fn new(raw: &str) -> Result<Self> {
        if !raw.is_ascii() {
            return Err(Error::NonAsciiPath(raw.to_string()));
        }

        let mut normalized = String::with_capacity(raw.len());
        for segment in raw.split(['/', '\\']).filter(|s| !s.is_empty()) {
            if !normalized.is_empty() {
                normalized.push('/');
            }
            normalized.extend(segment.chars().map(|c| c.to_ascii_lowercase()));
        }

        if normalized.is_empty() {
            return Err(Error::InvalidPath(raw.to_string()));
        }
        if normalized.len() > MAX_PATH_LENGTH {
            return Err(Error::PathTooLong {
                len: normalized.len(),
                max: MAX_PATH_LENGTH,
            });
        }

        Ok(Self(normalized.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// File extension of the last segment, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let file_name = self.0.rsplit('/').next()?;
        let (_, ext) = file_name.rsplit_once('.')?;
        (!ext.is_empty()).then_some(ext)
    }
}

impl fmt::Debug for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtualPath({:?})", &*self.0)
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VirtualPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for VirtualPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for VirtualPath {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl Serialize for VirtualPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// In-memory file instance produced by the metadata cache.
///
/// Rendered as `|{collection}_{counter}|{path}`. The counter changes with every
/// edit so the host never serves a stale cached copy of an earlier instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyntheticPath {
    pub collection: Arc<str>,
    pub counter: u64,
    pub path: VirtualPath,
}

impl SyntheticPath {
    pub fn new(collection: impl Into<Arc<str>>, counter: u64, path: VirtualPath) -> Self {
        Self {
            collection: collection.into(),
            counter,
            path,
        }
    }

    /// Parse the rendered `|{collection}_{counter}|{path}` form.
    pub fn parse(s: &str) -> Option<Self> {
        let rest = s.strip_prefix('|')?;
        let (prefix, path) = rest.split_once('|')?;
        let (collection, counter) = prefix.rsplit_once('_')?;
        Some(Self {
            collection: collection.into(),
            counter: counter.parse().ok()?,
            path: VirtualPath::new(path).ok()?,
        })
    }
}

impl fmt::Display for SyntheticPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "|{}_{}|{}", self.collection, self.counter, self.path)
    }
}

/// What a virtual path resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Payload {
    /// A replacement file on disk.
    Real(Utf8PathBuf),
    /// A file reconstructed in memory by the metadata cache.
    Synthetic(SyntheticPath),
}

impl Payload {
    pub fn real(path: impl Into<Utf8PathBuf>) -> Self {
        Payload::Real(path.into())
    }

    pub fn as_real(&self) -> Option<&Utf8Path> {
        match self {
            Payload::Real(path) => Some(path),
            Payload::Synthetic(_) => None,
        }
    }

    pub fn as_synthetic(&self) -> Option<&SyntheticPath> {
        match self {
            Payload::Real(_) => None,
            Payload::Synthetic(synthetic) => Some(synthetic),
        }
    }

    /// Length of the rendered payload string, as handed to the host loader.
    pub fn rendered_len(&self) -> usize {
        match self {
            Payload::Real(path) => path.as_str().len(),
            Payload::Synthetic(synthetic) => {
                // "|" + collection + "_" + counter + "|" + path
                3 + synthetic.collection.len()
                    + synthetic.counter.to_string().len()
                    + synthetic.path.len()
            }
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Real(path) => write!(f, "{}", path),
            Payload::Synthetic(synthetic) => write!(f, "{}", synthetic),
        }
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_separators_and_case() {
        let path = VirtualPath::new("\\Chara\\Equipment//e0001/Model/C0101E0001_MET.mdl/").unwrap();
        assert_eq!(
            path.as_str(),
            "chara/equipment/e0001/model/c0101e0001_met.mdl"
        );
    }

    #[test]
    fn test_case_insensitive_equality() {
        let a = VirtualPath::new("ui/icon/000000/000001.tex").unwrap();
        let b = VirtualPath::new("UI/Icon/000000/000001.TEX").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_reject_empty() {
        assert!(matches!(VirtualPath::new("//"), Err(Error::InvalidPath(_))));
        assert!(matches!(VirtualPath::new(""), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_reject_non_ascii() {
        assert!(matches!(
            VirtualPath::new("chara/é.tex"),
            Err(Error::NonAsciiPath(_))
        ));
    }

    #[test]
    fn test_reject_too_long() {
        let raw = "a".repeat(MAX_PATH_LENGTH + 1);
        assert_eq!(
            VirtualPath::new(&raw),
            Err(Error::PathTooLong {
                len: MAX_PATH_LENGTH + 1,
                max: MAX_PATH_LENGTH
            })
        );
        assert!(VirtualPath::new(&raw[..MAX_PATH_LENGTH]).is_ok());
    }

    #[test]
    fn test_extension() {
        let path = VirtualPath::new("chara/equipment/e0001/e0001.imc").unwrap();
        assert_eq!(path.extension(), Some("imc"));
        let path = VirtualPath::new("chara/equipment/e0001").unwrap();
        assert_eq!(path.extension(), None);
    }

    #[test]
    fn test_synthetic_path_display_and_parse() {
        let path = VirtualPath::new("chara/equipment/e0001/e0001.imc").unwrap();
        let synthetic = SyntheticPath::new("My_Collection", 17, path.clone());
        let rendered = synthetic.to_string();
        assert_eq!(rendered, "|My_Collection_17|chara/equipment/e0001/e0001.imc");

        let parsed = SyntheticPath::parse(&rendered).unwrap();
        assert_eq!(parsed, synthetic);
        assert_eq!(Payload::Synthetic(parsed).rendered_len(), rendered.len());
    }

    #[test]
    fn test_synthetic_parse_rejects_plain_paths() {
        assert!(SyntheticPath::parse("chara/equipment/e0001/e0001.imc").is_none());
        assert!(SyntheticPath::parse("|nocounter|a.imc").is_none());
    }

    #[test]
    fn test_payload_serializes_as_string() {
        let payload = Payload::real("C:/mods/x/f1.mdl");
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, "\"C:/mods/x/f1.mdl\"");
    }
}
