//! phint-core: Core primitives shared by the phint crates
//!
//! This crate provides:
//! - `Edit`: A byte-range replacement in a source file
//! - `apply_edits()`: Apply a batch of non-overlapping edits
//! - `DeclarationVisitor`: Walk the declarations of a parsed PHP file

mod edit;
mod visitor;

pub use edit::{apply_edits, offset_to_line_column, Edit, EditError};
pub use visitor::{namespace_name, walk_declarations, DeclarationVisitor};
