//! Error types for folio operations.
//!
//! Every failure the versioning core can surface is a variant of [`FolioError`].
//! Each variant carries a stable [`ErrorCode`] for programmatic handling.

use thiserror::Error;

use crate::types::ItemId;

/// Result type alias for folio operations.
pub type FolioResult<T> = Result<T, FolioError>;

/// Main error type for all folio operations.
#[derive(Error, Debug)]
pub enum FolioError {
    /// An item could not be encoded into a version blob.
    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A version blob could not be decoded back into an item tree.
    #[error("Deserialization error: {message}")]
    Deserialization {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A rebuilt version references a master item that no longer exists.
    #[error("Dangling master: item {item_id} referenced by a version no longer exists")]
    DanglingMaster { item_id: ItemId, code: ErrorCode },

    /// A version already exists for this master and version index.
    #[error("Version conflict: master {master_id} already has version {version_index}")]
    Conflict {
        master_id: ItemId,
        version_index: i32,
        code: ErrorCode,
    },

    /// No version matched the lookup.
    #[error("Version not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        master_id: Option<ItemId>,
        version_index: Option<i32>,
    },

    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        suggestion: Option<String>,
    },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Serialization (SER_xxx)
    SerUnsupportedValue,
    SerEncodingFailed,

    // Deserialization (DES_xxx)
    DesMalformedBlob,
    DesDanglingMaster,
    DesUnsupportedFormat,
    DesIndexMismatch,

    // Versions (VER_xxx)
    VerConflict,
    VerNotFound,

    // Validation (VAL_xxx)
    ValMissingIdentity,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::SerUnsupportedValue => "SER_001",
            ErrorCode::SerEncodingFailed => "SER_002",
            ErrorCode::DesMalformedBlob => "DES_001",
            ErrorCode::DesDanglingMaster => "DES_002",
            ErrorCode::DesUnsupportedFormat => "DES_003",
            ErrorCode::DesIndexMismatch => "DES_004",
            ErrorCode::VerConflict => "VER_001",
            ErrorCode::VerNotFound => "VER_002",
            ErrorCode::ValMissingIdentity => "VAL_001",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl FolioError {
    /// Create a serialization error for a value the blob format cannot carry.
    pub fn unsupported_value(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
            code: ErrorCode::SerUnsupportedValue,
            source: None,
        }
    }

    /// Create a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization {
            message: message.into(),
            code: ErrorCode::DesMalformedBlob,
            source: None,
        }
    }

    /// Create a dangling master error.
    pub fn dangling_master(item_id: ItemId) -> Self {
        Self::DanglingMaster {
            item_id,
            code: ErrorCode::DesDanglingMaster,
        }
    }

    /// Create a conflict error.
    pub fn conflict(master_id: ItemId, version_index: i32) -> Self {
        Self::Conflict {
            master_id,
            version_index,
            code: ErrorCode::VerConflict,
        }
    }

    /// Create a not found error for the latest version of a master.
    pub fn not_found(master_id: ItemId) -> Self {
        Self::NotFound {
            message: format!("No versions exist for master {}", master_id),
            code: ErrorCode::VerNotFound,
            master_id: Some(master_id),
            version_index: None,
        }
    }

    /// Create a not found error for an exact version lookup.
    pub fn version_not_found(master_id: ItemId, version_index: i32) -> Self {
        Self::NotFound {
            message: format!("Master {} has no version {}", master_id, version_index),
            code: ErrorCode::VerNotFound,
            master_id: Some(master_id),
            version_index: Some(version_index),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Serialization { code, .. } => *code,
            Self::Deserialization { code, .. } => *code,
            Self::DanglingMaster { code, .. } => *code,
            Self::Conflict { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::Database { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether this error is a not-found outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this error is a version conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Conflict { .. } => {
                Some("Advance the item's version index before saving another version")
            }
            Self::NotFound { .. } => Some("Check the master id and version index"),
            Self::DanglingMaster { .. } => {
                Some("The master item was removed from the item store after the version was saved")
            }
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for FolioError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        // Encode paths map their own failures; a bare conversion is a decode.
        Self::Deserialization {
            message: err.to_string(),
            code: ErrorCode::DesMalformedBlob,
            source: Some(Box::new(err)),
        }
    }
}
