//! # voxscript - scoped ECMAScript for voice dialog hosts
//!
//! An ECMAScript interpreter embedded behind a small host API:
//! - a [`Runtime`] shared by sessions, owning the object budget and the concurrency discipline
//! - a [`Context`] per session, with a chain of named scopes over its global object
//! - [`Value`], a tagged value the host marshals in and out of scripts
//! - a step budget that aborts runaway scripts, and exception capture for uncaught errors
//!
//! ## Quick Start
//!
//! ```
//! use voxscript::{Context, ContextConfig, Runtime, RuntimeConfig, ScopeKind, Value};
//!
//! let runtime = Runtime::new(RuntimeConfig::new()).unwrap();
//! let mut ctx = Context::new(&runtime, ContextConfig::new()).unwrap();
//!
//! ctx.push_scope("session", ScopeKind::Nested).unwrap();
//! ctx.create_var("caller", Some(&Value::from("alice"))).unwrap();
//!
//! let greeting = ctx.eval("'hello ' + caller").unwrap();
//! assert_eq!(greeting, Some(Value::from("hello alice")));
//!
//! ctx.pop_scope().unwrap();
//! assert!(ctx.check_var("caller").is_err());
//! ```
//!
//! ## Architecture
//!
//! - **[`parser`]** - PEG parser and AST types
//! - **[`runner`]** - the interpreter
//!   - **[`runner::ds`]** - values, objects and the collected heap
//!   - **[`runner::eval`]** - tree-walking evaluator
//!   - **[`runner::plugin`]** - built-in registry and the evaluation context
//!   - **[`runner::std_lib`]** - the standard library
//! - **[`scope`]** - the scope chain
//! - **[`marshal`]** - conversions between [`Value`] and script values
//! - **[`dom`]** - read-only document trees exposed to scripts

#[macro_use]
pub mod diagnostics;

pub mod config;
pub mod context;
pub mod dom;
pub mod error;
pub mod marshal;
pub mod parser;
pub mod runner;
pub mod runtime;
pub mod scope;
pub mod value;

pub use config::{ConcurrencyModel, ContextConfig, RuntimeConfig};
pub use context::Context;
pub use diagnostics::DiagnosticConfig;
pub use dom::DocumentNode;
pub use error::{ErrorKind, ScriptError};
pub use runtime::Runtime;
pub use scope::ScopeKind;
pub use value::{Content, Value, ValueMap, ValueType, ValueVector};
