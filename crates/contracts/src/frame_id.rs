//! FrameId - Cheap-to-clone coordinate frame name
//!
//! Uses Arc<str> internally for O(1) clone operations. Frame names are
//! compared the way transform trees resolve them: a single leading `/` is
//! not significant, so `"/odom"` and `"odom"` name the same frame.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Spatial frame identifier with cheap cloning.
///
/// # Examples
/// ```
/// use contracts::FrameId;
///
/// let id: FrameId = "/base_link".into();
/// assert_eq!(id, "base_link");
/// assert_eq!(id.as_str(), "/base_link");
/// assert_eq!(id.resolved(), "base_link");
/// ```
#[derive(Clone, Default)]
pub struct FrameId(Arc<str>);

impl FrameId {
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Name as configured, including any leading slash.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name with the leading slash removed.
    #[inline]
    pub fn resolved(&self) -> &str {
        resolve(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.resolved().is_empty()
    }
}

fn resolve(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}

impl Deref for FrameId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for FrameId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FrameId {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for FrameId {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameId({:?})", self.0)
    }
}

impl PartialEq for FrameId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.resolved() == other.resolved()
    }
}

impl Eq for FrameId {}

impl PartialEq<str> for FrameId {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.resolved() == resolve(other)
    }
}

impl PartialEq<&str> for FrameId {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.resolved() == resolve(other)
    }
}

impl PartialEq<String> for FrameId {
    #[inline]
    fn eq(&self, other: &String) -> bool {
        self.resolved() == resolve(other)
    }
}

// Hash must agree with the slash-insensitive equality above.
impl Hash for FrameId {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resolved().hash(state)
    }
}

impl Serialize for FrameId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FrameId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}
