use std::fmt::{self, Display, Formatter};
use std::ops::Deref;

use sha2::{Digest, Sha256};

use crate::http::{Method, Request};

/// Lookup key of a request: hex encoded SHA-256 of the method followed by
/// the full URI. Request headers play no part in it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(method: &Method, url: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(method.as_str());
        hasher.update(url);
        let hash = hasher.finalize();
        CacheKey(format!("{hash:x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Request> for CacheKey {
    fn from(request: &Request) -> Self {
        CacheKey::new(request.method(), request.url())
    }
}

impl Deref for CacheKey {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
