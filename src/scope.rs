//! Named dialog scopes layered over the global object.
//!
//! Each nested scope is a script object whose environment parent is the scope below it and
//! which is registered as an enumerable property of that scope under its name. The last node
//! is the leaf that scripts and host variable operations run against. An alias registers a name
//! on the leaf that refers to the leaf itself; aliases are popped before the leaf is.

use std::collections::HashSet;

use lazy_static::lazy_static;

use crate::error::ScriptError;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::ObjectId;
use crate::runner::ds::object::{JsObject, ObjectKind};
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::types::EvalContext;

lazy_static! {
    static ref RESERVED_WORDS: HashSet<&'static str> = {
        let words = [
            // keywords
            "break", "case", "catch", "continue", "default", "delete", "do", "else", "finally",
            "for", "function", "if", "in", "instanceof", "new", "return", "switch", "this",
            "throw", "try", "typeof", "var", "void", "while", "with",
            // future reserved words
            "abstract", "boolean", "byte", "char", "class", "const", "debugger", "double",
            "enum", "export", "extends", "final", "float", "goto", "implements", "import", "int",
            "interface", "long", "native", "package", "private", "protected", "public", "short",
            "static", "super", "synchronized", "throws", "transient", "volatile",
            // literals
            "null", "true", "false",
        ];
        words.iter().copied().collect()
    };
}

pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.contains(name)
}

/// Whether `name` can be used as a binding name.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let first_ok = match chars.next() {
        Some(c) => c.is_alphabetic() || c == '_' || c == '$',
        None => false,
    };
    first_ok && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$') && !is_reserved_word(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// A new scope object below the current leaf.
    Nested,
    /// A second name for the current leaf.
    Alias,
}

#[derive(Debug)]
struct ScopeNode {
    name: String,
    object: ObjectId,
    /// Alias names registered on this scope, most recent last.
    aliases: Vec<String>,
}

/// A plain or dotted variable name, validated segment by segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarPath {
    segments: Vec<String>,
}

impl VarPath {
    pub fn parse(name: &str) -> Result<Self, ScriptError> {
        let segments: Vec<String> = name.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| !is_valid_identifier(s)) {
            return Err(ScriptError::InvalidArgument(format!(
                "'{}' is not a valid variable name",
                name
            )));
        }
        Ok(VarPath { segments })
    }

    pub fn is_qualified(&self) -> bool {
        self.segments.len() > 1
    }

    pub fn first(&self) -> &str {
        &self.segments[0]
    }

    pub fn last(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }
}

impl std::fmt::Display for VarPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Property a host write or read lands on.
#[derive(Debug, Clone, PartialEq)]
pub struct PathTarget {
    pub holder: JsValue,
    pub key: String,
    /// Some object or property on the way to the target refuses writes.
    pub read_only: bool,
}

#[derive(Debug)]
pub struct ScopeChain {
    nodes: Vec<ScopeNode>,
}

impl ScopeChain {
    pub fn new(global: ObjectId) -> Self {
        ScopeChain {
            nodes: vec![ScopeNode {
                name: "global".to_string(),
                object: global,
                aliases: vec![],
            }],
        }
    }

    fn leaf(&self) -> &ScopeNode {
        &self.nodes[self.nodes.len() - 1]
    }

    pub fn leaf_object(&self) -> ObjectId {
        self.leaf().object
    }

    pub fn global_object(&self) -> ObjectId {
        self.nodes[0].object
    }

    pub fn leaf_name(&self) -> &str {
        &self.leaf().name
    }

    /// Number of nested scopes above global. Aliases do not count.
    pub fn depth(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn alias_count(&self) -> usize {
        self.leaf().aliases.len()
    }

    /// Scope objects from global to leaf, for rooting.
    pub fn objects(&self) -> Vec<JsValue> {
        self.nodes.iter().map(|n| JsValue::Object(n.object)).collect()
    }

    /// Whether the scope at `index` is registered under a read-only property of its parent.
    fn registration_read_only(&self, index: usize, ctx: &EvalContext) -> Result<bool, JErrorType> {
        if index == 0 {
            return Ok(false);
        }
        let parent = ctx.heap.get(self.nodes[index - 1].object)?;
        Ok(parent.is_read_only(&self.nodes[index].name))
    }

    fn leaf_refuses(&self, name: &str, ctx: &EvalContext) -> Result<bool, JErrorType> {
        let index = self.nodes.len() - 1;
        Ok(self.registration_read_only(index, ctx)?
            || ctx.heap.get(self.nodes[index].object)?.is_read_only(name))
    }

    pub fn push_scope(&mut self, name: &str, kind: ScopeKind, ctx: &mut EvalContext) -> Result<(), ScriptError> {
        if !is_valid_identifier(name) {
            return Err(ScriptError::InvalidArgument(format!(
                "'{}' is not a valid scope name",
                name
            )));
        }
        if self.leaf_refuses(name, ctx)? {
            return Err(ScriptError::ReadOnly(name.to_string()));
        }
        let leaf = self.leaf_object();
        match kind {
            ScopeKind::Nested => {
                let scope = ctx.alloc(JsObject::new(
                    ObjectKind::Scope {
                        parent: leaf,
                        name: name.to_string(),
                    },
                    None,
                ))?;
                ctx.heap.get_mut(leaf)?.put(name, JsValue::Object(scope));
                self.nodes.push(ScopeNode {
                    name: name.to_string(),
                    object: scope,
                    aliases: vec![],
                });
            }
            ScopeKind::Alias => {
                ctx.heap.get_mut(leaf)?.put(name, JsValue::Object(leaf));
                let index = self.nodes.len() - 1;
                self.nodes[index].aliases.push(name.to_string());
            }
        }
        Ok(())
    }

    /// Pops the leaf's most recent alias, or else the leaf itself. Popping at global with no
    /// alias left succeeds without doing anything.
    pub fn pop_scope(&mut self, ctx: &mut EvalContext) -> Result<(), ScriptError> {
        let index = self.nodes.len() - 1;
        if let Some(alias) = self.nodes[index].aliases.pop() {
            let object = self.nodes[index].object;
            detach(object, &alias, object, ctx)?;
            return Ok(());
        }
        if index == 0 {
            return Ok(());
        }
        let node = self.nodes.remove(index);
        detach(self.nodes[index - 1].object, &node.name, node.object, ctx)?;
        Ok(())
    }

    /// Drops every nested scope in one step. Aliases registered on global stay.
    pub fn clear_scopes(&mut self, ctx: &mut EvalContext) -> Result<(), ScriptError> {
        if self.nodes.len() > 1 {
            let first = &self.nodes[1];
            detach(self.nodes[0].object, &first.name, first.object, ctx)?;
            self.nodes.truncate(1);
        }
        Ok(())
    }

    /// Index of the nearest scope binding `name`, searching from the leaf down.
    fn find_binding(&self, name: &str, ctx: &EvalContext) -> Result<Option<usize>, JErrorType> {
        for index in (0..self.nodes.len()).rev() {
            if ctx.heap.has_property(self.nodes[index].object, name)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Resolves `path` to the property it names. Returns None when the first segment is not
    /// bound anywhere in the chain. Intermediate segments are read like script member
    /// accesses, so a null or undefined intermediate raises a TypeError.
    pub fn resolve(&self, path: &VarPath, ctx: &mut EvalContext) -> Result<Option<PathTarget>, JErrorType> {
        let index = match self.find_binding(path.first(), ctx)? {
            Some(i) => i,
            None => return Ok(None),
        };
        let mut read_only = self.registration_read_only(index, ctx)?;
        let mut holder = JsValue::Object(self.nodes[index].object);
        let mut key = path.first().to_string();
        for segment in &path.segments[1..] {
            read_only |= value_refuses(&holder, &key, ctx)?;
            holder = ctx.get_property(&holder, &key)?;
            key = segment.clone();
        }
        read_only |= value_refuses(&holder, &key, ctx)?;
        Ok(Some(PathTarget {
            holder,
            key,
            read_only,
        }))
    }

    /// Target for declaring a plain name in the leaf scope.
    pub fn leaf_target(&self, name: &str, ctx: &EvalContext) -> Result<PathTarget, JErrorType> {
        Ok(PathTarget {
            holder: JsValue::Object(self.leaf_object()),
            key: name.to_string(),
            read_only: self.leaf_refuses(name, ctx)?,
        })
    }
}

fn value_refuses(holder: &JsValue, key: &str, ctx: &EvalContext) -> Result<bool, JErrorType> {
    match holder {
        JsValue::Object(id) => Ok(ctx.heap.get(*id)?.is_read_only(key)),
        _ => Ok(false),
    }
}

/// Removes `holder[name]` if it still refers to `scope`.
fn detach(holder: ObjectId, name: &str, scope: ObjectId, ctx: &mut EvalContext) -> Result<(), JErrorType> {
    let object = ctx.heap.get_mut(holder)?;
    if object.get_own_property(name) == Some(JsValue::Object(scope)) {
        object.delete(name);
    }
    Ok(())
}
