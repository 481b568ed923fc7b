use std::sync::Arc;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::error::StoreError;

use super::{BlobStore, DEFAULT_CONTENT_TYPE, FileType, SIGNATURES, StoredBlob, compute_hash, detect_type};

/// `Cache-Control` for objects served by key. Keys are content-derived, so
/// the bytes behind a key never change.
pub const OBJECT_CACHE_CONTROL: &str = "public, max-age=7776000";

/// Standard alphabet with optional padding and stray trailing bits ignored.
/// Callers strip ASCII whitespace first, which together matches browser `atob`.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

const DIGEST_HEX_LEN: usize = 64;

/// Width and height hints, copied verbatim into the object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimensions {
    width: String,
    height: String,
}

impl Dimensions {
    pub fn new(width: impl Into<String>, height: impl Into<String>) -> Self {
        Self {
            width: width.into(),
            height: height.into(),
        }
    }

    /// Builds dimensions only when both values are present. Empty strings
    /// count as absent, and a lone value is ignored.
    pub fn from_optional(width: Option<&str>, height: Option<&str>) -> Option<Self> {
        let width = width.filter(|value| !value.is_empty())?;
        let height = height.filter(|value| !value.is_empty())?;
        Some(Self::new(width, height))
    }

    pub fn width(&self) -> &str {
        &self.width
    }

    pub fn height(&self) -> &str {
        &self.height
    }
}

/// `digest[_WxH][.suffix]`
pub fn object_key(digest: &str, dimensions: Option<&Dimensions>, file_type: Option<FileType>) -> String {
    let mut key = digest.to_string();
    if let Some(dimensions) = dimensions {
        key.push_str(&format!("_{}x{}", dimensions.width, dimensions.height));
    }
    if let Some(file_type) = file_type {
        key.push('.');
        key.push_str(file_type.suffix);
    }
    key
}

/// Whether `key` could have come from [`object_key`]: a lowercase hex digest,
/// then nothing, a dimension segment, or a suffix.
///
/// Dimensions are free text, so the tail is not parsed further. Backends must
/// not use keys as raw paths.
pub fn is_object_key(key: &str) -> bool {
    let Some(digest) = key.get(..DIGEST_HEX_LEN) else {
        return false;
    };
    if !digest.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
        return false;
    }
    let rest = &key[DIGEST_HEX_LEN..];
    if let Some(suffix) = rest.strip_prefix('.') {
        return SIGNATURES.iter().any(|(_, file_type)| file_type.suffix == suffix);
    }
    rest.is_empty() || rest.starts_with('_')
}

/// Content-addressed object storage over a [`BlobStore`].
#[derive(Clone)]
pub struct ContentStore {
    blobs: Arc<dyn BlobStore>,
}

impl ContentStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Stores a base64 payload and returns its key.
    ///
    /// ASCII whitespace is dropped first, so line-wrapped base64 is accepted.
    /// The type is sniffed from the base64 text before decoding. Nothing is
    /// written unless the payload decodes.
    pub async fn put(
        &self,
        payload: &str,
        dimensions: Option<&Dimensions>,
    ) -> Result<String, StoreError> {
        let payload: String = payload
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        if payload.is_empty() {
            return Err(StoreError::EmptyPayload);
        }
        let file_type = detect_type(&payload);
        let bytes = PAYLOAD_ENGINE.decode(&payload)?;
        let key = object_key(&compute_hash(&bytes), dimensions, file_type);
        let content_type = file_type
            .map(|file_type| file_type.mime_type)
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        self.blobs.put(&key, &bytes, content_type).await?;
        tracing::debug!(%key, content_type, size = bytes.len(), "stored object");
        Ok(key)
    }

    /// Looks up an object. Keys that `put` could never produce are reported
    /// as missing without reaching the backend.
    pub async fn get(&self, key: &str) -> Result<Option<StoredBlob>, StoreError> {
        if !is_object_key(key) {
            return Ok(None);
        }
        Ok(self.blobs.get(key).await?)
    }
}
