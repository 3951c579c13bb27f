//! Manifest module - Kubernetes objects parsed from rendered YAML.

mod object;
mod objects;
mod order;

pub use object::*;
pub use objects::*;
pub use order::*;

use thiserror::Error;

/// Kind of the objects applied and awaited before the rest of a manifest.
pub const CRD_KIND: &str = "CustomResourceDefinition";

/// ManifestError reports a problem decoding or changing manifest objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("failed to decode manifest document: {message}\n{document}")]
    Decode { document: String, message: String },

    #[error("manifest document is not an object:\n{document}")]
    NotAnObject { document: String },

    #[error("duplicate object {hash}")]
    Duplicate { hash: String },

    #[error("{hash}: invalid field {field}: {message}")]
    InvalidField {
        hash: String,
        field: String,
        message: String,
    },

    #[error("failed to serialize {hash}: {message}")]
    Serialize { hash: String, message: String },
}

impl ManifestError {
    pub fn invalid_field(
        hash: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ManifestError::InvalidField {
            hash: hash.into(),
            field: field.into(),
            message: message.into(),
        }
    }
}
