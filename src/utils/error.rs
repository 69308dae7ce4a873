use thiserror::Error;

use crate::element::DeviceTag;

/// Coarse error classification, stable across the wrapped payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    IllegalArgs,
    NotReady,
    Expired,
    BadAlloc,
    InvalidType,
    ExDev,
    Shape,
    Unsupported,
    Codec,
}

#[derive(Error, Debug)]
pub enum BoxError {
    #[error("Illegal arguments: {0}")]
    IllegalArgs(String),

    #[error("Box data is not ready")]
    NotReady,

    #[error("Box handle holds no data")]
    Expired,

    #[error("Failed to allocate {bytes} bytes on {device}")]
    BadAlloc { device: DeviceTag, bytes: usize },

    #[error("Invalid element type: {0}")]
    InvalidType(String),

    #[error("Device mismatch: {0}")]
    ExDev(String),

    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    Shape { expected: Vec<u32>, found: Vec<u32> },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

impl BoxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BoxError::IllegalArgs(_) => ErrorKind::IllegalArgs,
            BoxError::NotReady => ErrorKind::NotReady,
            BoxError::Expired => ErrorKind::Expired,
            BoxError::BadAlloc { .. } => ErrorKind::BadAlloc,
            BoxError::InvalidType(_) => ErrorKind::InvalidType,
            BoxError::ExDev(_) => ErrorKind::ExDev,
            BoxError::Shape { .. } => ErrorKind::Shape,
            BoxError::Unsupported(_) => ErrorKind::Unsupported,
            BoxError::Codec(_) => ErrorKind::Codec,
        }
    }
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Binary packet error: {0}")]
    Binary(#[from] bincode::Error),

    #[error("JSON packet error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed packet: {0}")]
    Malformed(String),
}

// Codec failures surface through `BoxError` at the public boundary
impl From<bincode::Error> for BoxError {
    fn from(e: bincode::Error) -> Self {
        BoxError::Codec(CodecError::Binary(e))
    }
}

impl From<serde_json::Error> for BoxError {
    fn from(e: serde_json::Error) -> Self {
        BoxError::Codec(CodecError::Json(e))
    }
}
