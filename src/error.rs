//! Errors returned by the host-facing API.

use thiserror::Error;

use crate::marshal::MarshalError;
use crate::runner::ds::error::JErrorType;

/// Coarse classification of a [`ScriptError`], used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad name or argument; nothing was changed.
    InvalidArgument,
    OutOfMemory,
    /// The script did not compile; nothing ran.
    SyntaxError,
    /// The script raised an exception; details are in the pending exception slot.
    ScriptException,
    /// The step budget ran out.
    SecurityViolation,
    /// Expected failure such as an undefined variable or a read-only target; nothing was
    /// changed.
    NonFatal,
    /// The context is corrupt and refuses further use.
    Fatal,
    /// Lock or runtime failure outside the engine.
    System,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("out of memory")]
    OutOfMemory,
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },
    #[error("uncaught exception: {message}")]
    Exception { message: String },
    #[error("step budget exceeded")]
    BudgetExceeded,
    #[error("'{0}' is not defined")]
    NotFound(String),
    #[error("'{0}' is read-only")]
    ReadOnly(String),
    #[error("value cannot be converted: {0}")]
    NotConvertible(MarshalError),
    #[error("runtime still owns {0} live context(s)")]
    RuntimeInUse(usize),
    #[error("context is unusable: {0}")]
    Fatal(String),
    #[error("system error: {0}")]
    System(String),
}

impl ScriptError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScriptError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ScriptError::OutOfMemory => ErrorKind::OutOfMemory,
            ScriptError::Syntax { .. } => ErrorKind::SyntaxError,
            ScriptError::Exception { .. } => ErrorKind::ScriptException,
            ScriptError::BudgetExceeded => ErrorKind::SecurityViolation,
            ScriptError::NotFound(_)
            | ScriptError::ReadOnly(_)
            | ScriptError::NotConvertible(_)
            | ScriptError::RuntimeInUse(_) => ErrorKind::NonFatal,
            ScriptError::Fatal(_) => ErrorKind::Fatal,
            ScriptError::System(_) => ErrorKind::System,
        }
    }

    /// Whether the context may keep being used after this error.
    pub fn is_recoverable(&self) -> bool {
        self.kind() != ErrorKind::Fatal
    }
}

impl From<MarshalError> for ScriptError {
    fn from(e: MarshalError) -> Self {
        match e {
            MarshalError::Engine(JErrorType::OutOfMemory) => ScriptError::OutOfMemory,
            MarshalError::Engine(inner) => ScriptError::Fatal(inner.message()),
            e => ScriptError::NotConvertible(e),
        }
    }
}

/// Fallback mapping for engine errors that reach the host without being captured as a
/// pending exception.
impl From<JErrorType> for ScriptError {
    fn from(e: JErrorType) -> Self {
        match e {
            JErrorType::BudgetExceeded => ScriptError::BudgetExceeded,
            JErrorType::OutOfMemory => ScriptError::OutOfMemory,
            JErrorType::Internal(m) => ScriptError::Fatal(m),
            e => ScriptError::Exception { message: e.message() },
        }
    }
}
