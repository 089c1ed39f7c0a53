use std::fmt;

use crate::runner::ds::value::JsValue;

/// Abrupt outcome of evaluating script code.
///
/// The first five variants are script-level errors that `try/catch` can observe: the named ones
/// are materialized into error objects of the matching constructor when caught. The remaining
/// variants abort the whole evaluation and are never visible to script code.
#[derive(Debug, Clone, PartialEq)]
pub enum JErrorType {
    ReferenceError(String),
    TypeError(String),
    RangeError(String),
    SyntaxError(String),
    /// A value thrown by a `throw` statement (or an error object created by the engine).
    Thrown(JsValue),
    /// The per-evaluation step budget ran out.
    BudgetExceeded,
    /// The heap refused an allocation.
    OutOfMemory,
    /// Broken engine invariant (stale handle, root bookkeeping failure).
    Internal(String),
}

impl JErrorType {
    /// Whether script `catch` clauses may observe this error.
    pub fn is_catchable(&self) -> bool {
        !matches!(
            self,
            JErrorType::BudgetExceeded | JErrorType::OutOfMemory | JErrorType::Internal(_)
        )
    }

    /// Constructor name for the engine-raised variants.
    pub fn error_name(&self) -> Option<&'static str> {
        match self {
            JErrorType::ReferenceError(_) => Some("ReferenceError"),
            JErrorType::TypeError(_) => Some("TypeError"),
            JErrorType::RangeError(_) => Some("RangeError"),
            JErrorType::SyntaxError(_) => Some("SyntaxError"),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            JErrorType::ReferenceError(m)
            | JErrorType::TypeError(m)
            | JErrorType::RangeError(m)
            | JErrorType::SyntaxError(m) => m.to_string(),
            JErrorType::Thrown(v) => v.to_string(),
            JErrorType::BudgetExceeded => "step budget exceeded".to_string(),
            JErrorType::OutOfMemory => "out of memory".to_string(),
            JErrorType::Internal(m) => m.to_string(),
        }
    }
}

impl fmt::Display for JErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JErrorType::ReferenceError(m) => write!(f, "Uncaught reference error: {}.", m),
            JErrorType::TypeError(m) => write!(f, "Uncaught type error: {}.", m),
            JErrorType::RangeError(m) => write!(f, "Uncaught range error: {}.", m),
            JErrorType::SyntaxError(m) => write!(f, "Uncaught syntax error: {}.", m),
            JErrorType::Thrown(v) => write!(f, "Uncaught exception: {}.", v),
            JErrorType::BudgetExceeded => write!(f, "Step budget exceeded."),
            JErrorType::OutOfMemory => write!(f, "Out of memory."),
            JErrorType::Internal(m) => write!(f, "Internal engine error: {}.", m),
        }
    }
}
