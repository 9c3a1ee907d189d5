//! Error types for ibgib-space

use crate::ibgib::Address;
use crate::special::SpecialType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GibError {
    #[error("IbGib not found: {0}")]
    NotFound(Address),

    #[error("Ambiguous timeline: {0}")]
    AmbiguousTimeline(String),

    #[error("Operation not valid on a primitive: {0}")]
    PrimitiveRoot(Address),

    #[error("IbGib has no rel8ns: {0}")]
    MissingRelations(Address),

    #[error("IbGib has no past, is not a tjp and has no tjp rel8n: {0}")]
    NoPast(Address),

    #[error("Space failure: {message}")]
    SpaceFailure {
        message: String,
        warnings: Vec<String>,
        partial: Vec<Address>,
    },

    #[error("Special index {0} is already being initialized")]
    ConcurrentInitialization(SpecialType),

    #[error("Special index {0} is not initialized")]
    SpecialNotInitialized(SpecialType),

    #[error("Space does not support delete: {0}")]
    DeleteUnsupported(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Invalid roots: {0}")]
    InvalidRoots(String),

    #[error("Bootstrap error: {0}")]
    Bootstrap(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
}

pub type Result<T> = std::result::Result<T, GibError>;
