pub mod auth;
pub mod file;
pub mod line;

pub use auth::{EncodeKeyRequest, EncodeKeyResponse, VerifyCredentialsRequest, VerifyCredentialsResponse};
pub use file::{UploadRequest, UploadResponse};
pub use line::SendMessageRequest;
