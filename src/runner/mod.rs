//! The script interpreter: object model, evaluator and standard library.

pub mod ds;
pub mod eval;
pub mod plugin;
pub mod std_lib;
