use derive_more::{Display, From};
use thiserror::Error;

/// A store key.
///
/// Keys are `/` separated paths relative to the root of a store, e.g. `image/0/.zarray`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct StoreKey(String);

/// An invalid store key.
#[derive(Debug, From, Error)]
#[error("invalid store key {0}")]
pub struct StoreKeyError(String);

/// A list of [`StoreKey`].
pub type StoreKeys = Vec<StoreKey>;

impl StoreKey {
    /// Create a new store key from `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreKeyError`] if `key` is not valid according to [`StoreKey::validate()`].
    pub fn new(key: impl Into<String>) -> Result<Self, StoreKeyError> {
        let key = key.into();
        if Self::validate(&key) {
            Ok(Self(key))
        } else {
            Err(StoreKeyError(key))
        }
    }

    /// Create a store key under the node at `path` (e.g. `/image/0`) with the final component `name`.
    ///
    /// Leading and trailing `/` of `path` are ignored, so the root node is `""` or `"/"`.
    ///
    /// # Errors
    /// Returns [`StoreKeyError`] if the joined key is not valid.
    pub fn under_node(path: &str, name: &str) -> Result<Self, StoreKeyError> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            Self::new(name)
        } else {
            Self::new(format!("{path}/{name}"))
        }
    }

    /// Extracts a string slice of the underlying key [`String`].
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a key:
    /// - a key is a Unicode string, where the final character is not a `/` character,
    /// - a key cannot start with `/`, and
    /// - a key cannot be an empty string.
    #[must_use]
    pub fn validate(key: &str) -> bool {
        !key.starts_with('/') && !key.ends_with('/') && !key.eq("")
    }
}

impl TryFrom<&str> for StoreKey {
    type Error = StoreKeyError;

    fn try_from(key: &str) -> Result<Self, Self::Error> {
        Self::new(key)
    }
}
