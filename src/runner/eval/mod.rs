//! Evaluation module: walks the AST against an [`EvalContext`](crate::runner::plugin::types::EvalContext).

pub mod expression;
pub mod function;
pub mod statement;
pub mod types;

pub use statement::execute_program;
pub use types::{Completion, CompletionType, Reference, ReferenceBase};
