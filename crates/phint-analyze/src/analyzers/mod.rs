//! Analyzers feeding the collection
//!
//! Each analyzer contributes observations through
//! [`AnalyzedFunctionCollection::add`]; none of them decides anything.

mod docblock;
mod source;
mod trace;

pub use docblock::{resolve_doc_type, DocblockAnalyzer};
pub use source::{ParsedFile, SourceAnalyzer};
pub use trace::{TraceAnalyzer, TraceStorageKind};

use crate::collection::AnalyzedFunctionCollection;
use crate::Result;

/// A source of type observations
pub trait Analyzer: Send + Sync {
    /// Short name for logs and reports
    fn name(&self) -> &'static str;

    /// Add this analyzer's observations to the collection
    fn analyze(&self, collection: &mut AnalyzedFunctionCollection) -> Result<()>;
}
