//! phint-analyze: Type inference for loosely-typed PHP projects
//!
//! Observations about parameter and return types are gathered from several
//! sources and merged into one canonical graph of classes and methods:
//!
//! - Source declarations (class hierarchy, existing hints, doc comments)
//! - Doc comment `@param` / `@return` tags, inherited from ancestors when absent
//! - An Xdebug function trace recorded while running the project's tests
//!
//! The decision step only annotates what every observation agrees on, and the
//! editor writes those decisions back into the source with targeted text edits.
//!
//! # Example
//!
//! ```no_run
//! use phint_analyze::{
//!     analyzers::{DocblockAnalyzer, SourceAnalyzer, TraceAnalyzer},
//!     editor::CodeEditor,
//!     exclude::PathFilter,
//!     index::DeclarationIndex,
//!     project::{DecisionOptions, ProjectAnalyzer},
//! };
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! let roots = vec![PathBuf::from("src/")];
//! let filter = PathFilter::new(vec!["vendor/".to_string()]);
//! let index = Arc::new(DeclarationIndex::build(&roots, &filter));
//!
//! let mut project = ProjectAnalyzer::new(DecisionOptions::default());
//! project.add_analyzer(Box::new(SourceAnalyzer::new(roots, filter.clone())));
//! project.add_analyzer(Box::new(DocblockAnalyzer::new(index.clone())));
//! project.add_analyzer(Box::new(TraceAnalyzer::in_memory("trace.xt", index.clone(), filter)));
//!
//! let report = project.run().unwrap();
//! let mut editor = CodeEditor::new(index, false);
//! for instruction in &report.instructions {
//!     editor.apply(instruction, None).unwrap();
//! }
//! ```

pub mod analyzers;
pub mod collection;
pub mod docblock;
pub mod editor;
pub mod exclude;
pub mod index;
pub mod logging;
pub mod model;
pub mod project;
mod scan;
pub mod trace;

pub use collection::AnalyzedFunctionCollection;
pub use model::{
    CallObservation, ClassId, ClassKind, ClassNode, FunctionRecord, InferredType, Instruction,
    Parameter, PhpTypeValue, ReturnObservation, ScalarKind, UnresolvableReason,
};

/// Errors that can occur during analysis
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to apply edit: {0}")]
    Edit(#[from] phint_core::EditError),
}

pub type Result<T> = std::result::Result<T, AnalyzeError>;
