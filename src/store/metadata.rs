use serde::{Deserialize, Serialize};

/// Sidecar record written next to each object by [`super::LocalFileStorage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Object key as given to `put`; the file name is its hash.
    #[serde(default)]
    pub key: String,
    pub content_type: String,
    pub size: usize,
    pub created_at: String,
}
