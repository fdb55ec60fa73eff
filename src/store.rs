//! Persisted-state store for network parameters.
//!
//! Weights are serialized as an ordered sequence of nested matrices,
//! biases as an ordered sequence of column vectors (each entry a
//! one-element row), matching the layout the surrounding application
//! writes. Shape validation happens in `Network::set_weights` /
//! `set_biases` before any loaded value is used.

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Network parameters in the persisted-state layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedParams {
    /// One matrix per layer transition, shape `(sizes[i+1], sizes[i])`.
    pub weights: Vec<Vec<Vec<f32>>>,
    /// One column vector per layer transition, shape `(sizes[i+1], 1)`.
    pub biases: Vec<Vec<Vec<f32>>>,
}

/// Errors produced while reading or writing a parameter store.
#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "store io error: {e}"),
            StoreError::Json(e) => write!(f, "store serialization error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            StoreError::Json(e) => Some(e),
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Json(e)
    }
}

/// Where trained parameters live between runs.
///
/// A missing persisted state is not an error: `load` returns `None`
/// and a freshly constructed model's random init stands in.
pub trait ParamStore {
    fn save(&mut self, params: &SavedParams) -> Result<(), StoreError>;

    fn load(&self) -> Result<Option<SavedParams>, StoreError>;
}

/// File-backed JSON store.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ParamStore for JsonFileStore {
    fn save(&mut self, params: &SavedParams) -> Result<(), StoreError> {
        let json = serde_json::to_string(params)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<SavedParams>, StoreError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&json)?))
    }
}
