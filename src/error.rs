// SPDX-License-Identifier: MPL-2.0
use crate::domain::modality::Modality;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("I/O Error: {0}")]
    Io(String),

    #[error("Config Error: {0}")]
    Config(String),

    /// No weight file exists for the resolved modality.
    #[error("Model checkpoint not found for modality {modality}: {}", path.display())]
    CheckpointNotFound { modality: Modality, path: PathBuf },

    /// Decode failure or unsupported/corrupt image content.
    #[error("Invalid or unsupported image file: {0}")]
    InvalidImage(String),

    /// Inference requested against a reference that was never uploaded.
    #[error("Uploaded file not found: {0}")]
    UnknownFileReference(String),

    /// Upload rejected by the extension allow-list.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Model Error: {0}")]
    Model(String),

    #[error("Dataset Error: {0}")]
    Dataset(String),
}

/// How an [`Error`] surfaces at the inference boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown file reference, or no checkpoint for the detected modality.
    NotFound,
    /// Unreadable, corrupt or rejected input.
    Invalid,
    /// Anything else.
    Internal,
}

impl Error {
    /// Classifies the error for callers that map it onto a transport status.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::CheckpointNotFound { .. } | Error::UnknownFileReference(_) => {
                ErrorKind::NotFound
            }
            Error::InvalidImage(_) | Error::UnsupportedFileType(_) => ErrorKind::Invalid,
            Error::Io(_) | Error::Config(_) | Error::Model(_) | Error::Dataset(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<image_rs::ImageError> for Error {
    fn from(err: image_rs::ImageError) -> Self {
        match err {
            image_rs::ImageError::IoError(io) => Error::Io(io.to_string()),
            other => Error::InvalidImage(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
