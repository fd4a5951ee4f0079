//! Content-derived clip identity used as the proxy cache key.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clip::Clip;
use crate::keys;

/// Stable fingerprint of a clip's content and parameters.
///
/// Two clips with equal identity share a proxy file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipIdentity(String);

impl ClipIdentity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of this identity with the given suffix.
    pub fn file_name(&self, suffix: &str) -> String {
        format!("{}{}", self.0, suffix)
    }
}

impl fmt::Display for ClipIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of clip identities.
///
/// The hashing algorithm lives outside this workspace; implementors only need
/// to return the same identity for interchangeable clips.
pub trait IdentityProvider: Send + Sync {
    /// Identity of `clip`, `None` when it cannot be determined.
    fn identity(&self, clip: &Clip) -> Option<ClipIdentity>;
}

/// Reads the hash the host application cached on the clip.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredHashIdentity;

impl IdentityProvider for StoredHashIdentity {
    fn identity(&self, clip: &Clip) -> Option<ClipIdentity> {
        clip.get(keys::HASH)
            .filter(|hash| !hash.trim().is_empty())
            .map(ClipIdentity::new)
    }
}

impl<F> IdentityProvider for F
where
    F: Fn(&Clip) -> Option<ClipIdentity> + Send + Sync,
{
    fn identity(&self, clip: &Clip) -> Option<ClipIdentity> {
        self(clip)
    }
}
