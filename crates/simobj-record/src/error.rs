//! Errors surfaced by [`Record`](crate::Record).

use std::error::Error;
use std::fmt;

use simobj_cache::CacheError;
use simobj_core::FieldError;

use crate::config::ConfigError;

/// Any failure of a record operation.
#[derive(Debug)]
pub enum RecordError {
    /// Field resolution, masking, or a transform failed.
    Field(FieldError),
    /// Locking, loading, or persisting the cache failed.
    Cache(CacheError),
    /// The configuration is invalid.
    Config(ConfigError),
}

impl RecordError {
    /// The field error, if this is one.
    pub fn as_field(&self) -> Option<&FieldError> {
        match self {
            Self::Field(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(e) => write!(f, "{e}"),
            Self::Cache(e) => write!(f, "cache: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl Error for RecordError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Field(e) => Some(e),
            Self::Cache(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

impl From<FieldError> for RecordError {
    fn from(e: FieldError) -> Self {
        Self::Field(e)
    }
}

impl From<CacheError> for RecordError {
    fn from(e: CacheError) -> Self {
        Self::Cache(e)
    }
}

impl From<ConfigError> for RecordError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
