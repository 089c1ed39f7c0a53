//! Standard library built-in objects.
//!
//! ES3-level built-ins: Object, Function, Array, String, Number, Boolean, Math, the Error
//! family, the global functions, and a `console` routed to `tracing`.

pub mod array;
pub mod console;
pub mod core;
pub mod error;
pub mod math;
pub mod number;
pub mod object;
pub mod string;

pub use self::core::register_core_builtins;

use crate::runner::ds::value::JsValue;

/// The `i`th argument, `undefined` when absent.
pub(crate) fn arg(args: &[JsValue], i: usize) -> JsValue {
    args.get(i).cloned().unwrap_or(JsValue::Undefined)
}
