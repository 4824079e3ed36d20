//! Storage backends for parsed trace records
//!
//! Every backend hands records back correlated by call number, in
//! ascending call-number order, with raw values already mapped to types.
//! When a call number is appended twice the first record is kept.

mod file;
mod memory;

use std::path::PathBuf;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use super::{TraceEntryRecord, TraceReturnRecord};
use crate::model::PhpTypeValue;
use crate::AnalyzeError;

/// Errors raised by a storage backend
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record in {path}:{line}: {source}")]
    Malformed {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
}

impl From<StorageError> for AnalyzeError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => AnalyzeError::Io(e),
            malformed @ StorageError::Malformed { .. } => {
                AnalyzeError::InvalidArgument(malformed.to_string())
            }
        }
    }
}

/// Callback receiving one entry, its parameter types and its return type
pub type CorrelatedFn<'a> =
    dyn FnMut(&TraceEntryRecord, &[PhpTypeValue], Option<&PhpTypeValue>) + 'a;

/// Common contract of trace storage backends
pub trait TraceStorage {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    fn append_entry(&mut self, entry: TraceEntryRecord) -> Result<(), StorageError>;

    fn append_return(&mut self, record: TraceReturnRecord) -> Result<(), StorageError>;

    /// Called once the whole trace has been read
    fn finish(&mut self) -> Result<(), StorageError>;

    /// Visit every stored entry with its mapped parameters and return type
    fn for_each_correlated(&self, f: &mut CorrelatedFn<'_>) -> Result<(), StorageError>;

    /// Drop every stored record
    fn clear(&mut self) -> Result<(), StorageError>;
}
