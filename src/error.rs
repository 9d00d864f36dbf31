use crate::{
    awg::{import::ImportError, validate::ValidationError},
    store::StoreError,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("import error: {0}")]
    ImportError(#[from] ImportError),

    #[error("store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("encode error: {0}")]
    EncodeError(#[from] bincode::error::EncodeError),

    #[error("decode error: {0}")]
    DecodeError(#[from] bincode::error::DecodeError),

    #[error("key service error: {0}")]
    KeyServiceError(String),

    #[error("{0}: {1}")]
    InvalidField(&'static str, ValidationError),
}
