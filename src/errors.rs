//! All errors that can occur in the immunosim library.

use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum ImmuneError {
    ImplementationError(String),
    InitializationError(String),
    InconsistencyError(String),
    ReadError(String),
    WriteError(String),
}

pub type Result<T> = std::result::Result<T, ImmuneError>;

impl fmt::Display for ImmuneError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ImmuneError::ImplementationError(message) => {
                write!(f, "ImplementationError: {}", message)
            }
            ImmuneError::InitializationError(message) => {
                write!(f, "InitializationError: {}", message)
            }
            ImmuneError::InconsistencyError(message) => {
                write!(f, "InconsistencyError: {}", message)
            }
            ImmuneError::ReadError(message) => write!(f, "ReadError: {}", message),
            ImmuneError::WriteError(message) => write!(f, "WriteError: {}", message),
        }
    }
}

impl std::error::Error for ImmuneError {}

