//! Content Digests
//!
//! A form is addressed by the SHA-256 of its content, written as 64
//! lowercase hex characters. The digest is used verbatim as a path segment
//! when fetching, so validation is exact: no case folding, no trimming.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of hex characters in a digest (SHA-256, 32 bytes).
pub const DIGEST_LENGTH: usize = 64;

/// Returns true if `candidate` is a well-formed digest.
pub fn is_digest(candidate: &str) -> bool {
    candidate.len() == DIGEST_LENGTH
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// A validated content digest.
///
/// Can only be constructed through [`Digest::parse`], so holding one means
/// the value passed [`is_digest`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Parse a digest, rejecting anything that is not exactly 64 lowercase
    /// hex characters.
    pub fn parse(candidate: &str) -> Option<Self> {
        is_digest(candidate).then(|| Self(candidate.to_string()))
    }

    /// The digest as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Digest::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid digest: {:?}", raw)))
    }
}
