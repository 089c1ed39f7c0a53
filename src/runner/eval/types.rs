//! Completion and reference records passed between statement and expression evaluation.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::ObjectId;
use crate::runner::ds::value::JsValue;

/// How a statement finished. Thrown values never become completions; they travel as
/// `Err(JErrorType)` so budget and memory failures unwind the same way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompletionType {
    Normal,
    Return,
    Break,
    Continue,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub completion_type: CompletionType,
    /// Value of the last expression statement, if any.
    pub value: Option<JsValue>,
}

impl Completion {
    pub fn normal() -> Self {
        Completion {
            completion_type: CompletionType::Normal,
            value: None,
        }
    }

    pub fn normal_with_value(value: JsValue) -> Self {
        Completion {
            completion_type: CompletionType::Normal,
            value: Some(value),
        }
    }

    pub fn return_value(value: JsValue) -> Self {
        Completion {
            completion_type: CompletionType::Return,
            value: Some(value),
        }
    }

    pub fn break_completion() -> Self {
        Completion {
            completion_type: CompletionType::Break,
            value: None,
        }
    }

    pub fn continue_completion() -> Self {
        Completion {
            completion_type: CompletionType::Continue,
            value: None,
        }
    }

    pub fn is_normal(&self) -> bool {
        self.completion_type == CompletionType::Normal
    }

    pub fn is_abrupt(&self) -> bool {
        !self.is_normal()
    }

    /// The carried value, `undefined` when there is none.
    pub fn get_value(&self) -> JsValue {
        self.value.clone().unwrap_or(JsValue::Undefined)
    }

    /// Fills in the value of a completion that carries none.
    pub fn update_empty(self, value: Option<JsValue>) -> Self {
        if self.value.is_none() {
            Completion { value, ..self }
        } else {
            self
        }
    }
}

/// What a reference resolves against.
#[derive(Debug, Clone)]
pub enum ReferenceBase {
    /// Property of a value (`a.b`, `a[b]`).
    Object(JsValue),
    /// Binding found on an environment object of the scope chain.
    Environment(ObjectId),
    /// Identifier not bound anywhere on the chain.
    Unresolvable,
}

/// A resolved assignment target: the base it lives on plus the name within it.
#[derive(Debug, Clone)]
pub struct Reference {
    pub base: ReferenceBase,
    pub referenced_name: String,
}

impl Reference {
    pub fn property(base: JsValue, name: impl Into<String>) -> Self {
        Reference {
            base: ReferenceBase::Object(base),
            referenced_name: name.into(),
        }
    }

    pub fn environment(env: ObjectId, name: impl Into<String>) -> Self {
        Reference {
            base: ReferenceBase::Environment(env),
            referenced_name: name.into(),
        }
    }

    pub fn unresolvable(name: impl Into<String>) -> Self {
        Reference {
            base: ReferenceBase::Unresolvable,
            referenced_name: name.into(),
        }
    }

    pub fn is_unresolvable(&self) -> bool {
        matches!(self.base, ReferenceBase::Unresolvable)
    }
}

pub type EvalResult = Result<Completion, JErrorType>;

pub type ValueResult = Result<JsValue, JErrorType>;

pub type ReferenceResult = Result<Reference, JErrorType>;
