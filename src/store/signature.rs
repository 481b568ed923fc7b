use serde::Serialize;

/// MIME type and file suffix of a recognised payload format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileType {
    #[serde(rename = "mimeType")]
    pub mime_type: &'static str,
    pub suffix: &'static str,
}

const fn file_type(mime_type: &'static str, suffix: &'static str) -> FileType {
    FileType { mime_type, suffix }
}

/// Base64 prefixes of known formats, matched against the encoded text.
///
/// Order matters: the first matching prefix wins, so an entry that is a prefix
/// of a later one shadows it. Keep this a slice.
pub const SIGNATURES: &[(&str, FileType)] = &[
    ("R0lGODdh", file_type("image/gif", "gif")),
    ("R0lGODlh", file_type("image/gif", "gif")),
    ("iVBORw0KGgo", file_type("image/png", "png")),
    ("/9j/", file_type("image/jpg", "jpg")),
    ("UklGRg==", file_type("image/webp", "webp")),
    ("JVBERi0xLjQK", file_type("application/pdf", "pdf")),
    ("AAABAAEAEBAAA", file_type("audio/wav", "wav")),
    ("TVqQAAMAAAAEAAAA", file_type("video/mp4", "mp4")),
    ("fZCjDZO7M4Z4gI0", file_type("application/zip", "zip")),
    (
        "UEsDBBQAAAA",
        file_type(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "docx",
        ),
    ),
    ("SUQzBAAAAAAA", file_type("audio/mpeg", "mp3")),
    ("VGV4dCBmaWxl", file_type("text/plain", "txt")),
];

/// Sniffs the format of a base64 payload from its leading characters.
///
/// The comparison runs on the base64 text itself. That only works because
/// every prefix in [`SIGNATURES`] encodes a fixed run of leading bytes; a new
/// entry must be checked against the real encoded signature.
pub fn detect_type(payload: &str) -> Option<FileType> {
    SIGNATURES
        .iter()
        .find(|(prefix, _)| payload.starts_with(prefix))
        .map(|(_, file_type)| *file_type)
}
