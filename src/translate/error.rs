//! Translation errors.

use std::fmt;
use thiserror::Error;

/// TranslateError is a problem found while translating one field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslateError {
    #[error("{path}: unsupported type: {what}")]
    UnsupportedType { path: String, what: String },

    #[error("{path}: cannot apply {element} to a {found} node")]
    TypeMismatch {
        path: String,
        element: String,
        found: String,
    },

    #[error("{path}: {message}")]
    InvalidValue { path: String, message: String },

    #[error("cannot decode configuration: {message}")]
    Decode { message: String },
}

impl TranslateError {
    pub fn unsupported_type(path: impl Into<String>, what: impl Into<String>) -> Self {
        TranslateError::UnsupportedType {
            path: path.into(),
            what: what.into(),
        }
    }

    pub fn type_mismatch(
        path: impl Into<String>,
        element: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        TranslateError::TypeMismatch {
            path: path.into(),
            element: element.into(),
            found: found.into(),
        }
    }

    pub fn invalid_value(path: impl Into<String>, message: impl Into<String>) -> Self {
        TranslateError::InvalidValue {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        TranslateError::Decode {
            message: message.into(),
        }
    }
}

/// TranslateErrors collects every error of a translation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslateErrors {
    errors: Vec<TranslateError>,
}

impl TranslateErrors {
    pub fn new() -> Self {
        TranslateErrors { errors: Vec::new() }
    }

    pub fn add(&mut self, error: TranslateError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, other: TranslateErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TranslateError> {
        self.errors.iter()
    }

    /// Returns `Ok(())` when no error was collected.
    pub fn into_result(self) -> Result<(), TranslateErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl IntoIterator for TranslateErrors {
    type Item = TranslateError;
    type IntoIter = std::vec::IntoIter<TranslateError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl fmt::Display for TranslateErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for TranslateErrors {}
