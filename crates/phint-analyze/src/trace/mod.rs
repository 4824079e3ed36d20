//! Xdebug function trace ingestion
//!
//! The trace is read in "computerized" format (`xdebug.trace_format=1`):
//! tab-separated entry and return records, correlated by call number.

mod mocks;
mod name;
mod parser;
pub mod storage;
mod type_mapper;

use serde::{Deserialize, Serialize};

pub use mocks::MockRegistry;
pub use name::{parse_function_name, CallKind, FunctionName};
pub use parser::TraceParser;
pub use storage::{FileStorage, MemoryStorage, StorageError, TraceStorage};
pub use type_mapper::TypeMapper;

/// A function entry line of the trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntryRecord {
    pub call_number: u64,
    pub function_name: String,
    pub user_defined: bool,
    pub file_path: String,
    /// Raw parameter values as printed by Xdebug
    pub parameters: Vec<String>,
}

/// A function return line of the trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceReturnRecord {
    pub call_number: u64,
    pub return_value: String,
}

/// Counters collected while parsing a trace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceStats {
    pub lines: usize,
    pub entries_seen: usize,
    pub entries_retained: usize,
    pub returns_retained: usize,
    pub mocks_detected: usize,
}
