pub mod blob;
pub mod content;
pub mod hash;
pub mod metadata;
pub mod signature;

pub use blob::{BlobStore, DEFAULT_CONTENT_TYPE, LocalFileStorage, MemoryBlobStore, StoredBlob};
pub use content::{ContentStore, Dimensions, OBJECT_CACHE_CONTROL, is_object_key, object_key};
pub use hash::compute_hash;
pub use metadata::ObjectMetadata;
pub use signature::{FileType, SIGNATURES, detect_type};
