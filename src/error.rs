use http::StatusCode;
use thiserror::Error;

/// Form-tree Error
#[derive(Debug, Error)]
pub enum Error {
    /// A key is used both as a value and as a container
    #[error("invalid multiple values in tree, key `{key}` is used as a value and as a container")]
    Conflict {
        /// The first path segment where the conflict was found
        key: String,
    },

    /// IO Error
    #[error(transparent)]
    Stream(#[from] std::io::Error),

    /// Urlencoded body Error
    #[error(transparent)]
    UrlEncoded(#[from] serde_urlencoded::de::Error),

    /// JSON encoding Error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Invalid part header
    #[error("invalid part header")]
    InvalidHeader,

    /// Invalid content disposition
    #[error("invalid content disposition")]
    InvalidContentDisposition,

    /// Missing boundary parameter
    #[error("missing multipart boundary")]
    MissingBoundary,

    /// Invalid boundary delimiter
    #[error("invalid multipart boundary")]
    InvalidBoundary,

    /// Body ended in the middle of a part
    #[error("unexpected end of multipart body")]
    UnexpectedEof,

    /// Payload too large
    #[error("payload is too large, limit to `{0}`")]
    PayloadTooLarge(u64),

    /// Field too large
    #[error("field is too large, limit to `{0}`")]
    FieldTooLarge(usize),

    /// Parts too many
    #[error("parts is too many, limit to `{0}`")]
    PartsTooMany(usize),

    /// Fields too many
    #[error("fields is too many, limit to `{0}`")]
    FieldsTooMany(usize),

    /// Files too many
    #[error("files is too many, limit to `{0}`")]
    FilesTooMany(usize),

    /// Field name is too long
    #[error("field name is too long, limit to `{0}`")]
    FieldNameTooLong(usize),

    /// Try Lock Error
    #[error("`{0}`")]
    TryLockError(String),
}

/// Which failure class an [`Error`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Structural conflict between keys of one request.
    Conflict,
    /// The body could not be parsed as its content-type demands.
    Decode,
    /// Failures unrelated to the request contents.
    Internal,
}

impl Error {
    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Json(_) | Self::TryLockError(_) => ErrorKind::Internal,
            _ => ErrorKind::Decode,
        }
    }

    /// Checks if the error is a key conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// Suggested response status for the calling layer.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ if self.kind() == ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
