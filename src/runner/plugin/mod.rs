//! Built-in objects and the context they run against.
//!
//! Built-ins are described declaratively as [`BuiltInObject`]s and collected in a
//! [`BuiltInRegistry`]. A new realm installs every registered object: constructors become
//! native function objects, prototype methods land on the matching prototype, and members of
//! the `global` entry are defined directly on the global object.
//!
//! ```
//! use voxscript::runner::plugin::{BuiltInObject, BuiltInRegistry};
//! use voxscript::runner::plugin::types::EvalContext;
//! use voxscript::runner::ds::value::JsValue;
//! use voxscript::runner::ds::error::JErrorType;
//!
//! fn double(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
//!     let n = ctx.to_number(args.first().unwrap_or(&JsValue::Undefined))?;
//!     Ok(JsValue::from_f64(n * 2.0))
//! }
//!
//! let mut registry = BuiltInRegistry::with_core();
//! registry.register_object(BuiltInObject::new("Utils").add_method("double", double));
//! assert!(registry.has_method("Utils", "double"));
//! ```

pub mod registry;
pub mod types;

pub use registry::BuiltInRegistry;
pub use types::{BuiltInObject, EvalContext, NativeFn};
