//! Data model shared by every analyzer
//!
//! Classes live in a single arena keyed by [`ClassId`]; inheritance edges
//! are ids, never owned references, so mutually referencing classes need no
//! shared ownership.

pub mod class_node;
pub mod function;
pub mod instruction;
pub mod types;

pub use class_node::{ClassId, ClassKind, ClassNode};
pub use function::{CallObservation, FunctionRecord, Parameter, ReturnObservation};
pub use instruction::{InferredType, Instruction, InstructionSurface};
pub use types::{PhpTypeValue, ScalarKind, UnresolvableReason};
