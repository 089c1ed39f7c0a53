//! Read-only document trees exposed to scripts.
//!
//! A [`DocumentNode`] tree is immutable once built. Exposing it creates one frozen script
//! object per node carrying `nodeType`, `nodeName`, `nodeValue`, `attributes`, `childNodes`,
//! `firstChild`, `lastChild` and a shared `getAttribute` method.

use std::sync::Arc;

use crate::marshal::{MarshalError, MAX_DEPTH};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::ObjectId;
use crate::runner::ds::object::{JsObject, ObjectKind};
use crate::runner::ds::object_property::PropertyFlags;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::types::EvalContext;

pub const ELEMENT_NODE: u16 = 1;
pub const TEXT_NODE: u16 = 3;

#[derive(Debug, Clone, PartialEq)]
enum NodeData {
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentNode {
    data: NodeData,
    children: Vec<Arc<DocumentNode>>,
}

impl DocumentNode {
    pub fn element(name: impl Into<String>) -> Self {
        DocumentNode {
            data: NodeData::Element {
                name: name.into(),
                attributes: vec![],
            },
            children: vec![],
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        DocumentNode {
            data: NodeData::Text(text.into()),
            children: vec![],
        }
    }

    /// Adds or replaces an attribute. No effect on text nodes.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let NodeData::Element { attributes, .. } = &mut self.data {
            let name = name.into();
            let value = value.into();
            match attributes.iter_mut().find(|(n, _)| *n == name) {
                Some(existing) => existing.1 = value,
                None => attributes.push((name, value)),
            }
        }
        self
    }

    pub fn with_child(mut self, child: DocumentNode) -> Self {
        self.children.push(Arc::new(child));
        self
    }

    pub fn node_type(&self) -> u16 {
        match self.data {
            NodeData::Element { .. } => ELEMENT_NODE,
            NodeData::Text(_) => TEXT_NODE,
        }
    }

    pub fn node_name(&self) -> &str {
        match &self.data {
            NodeData::Element { name, .. } => name,
            NodeData::Text(_) => "#text",
        }
    }

    pub fn node_value(&self) -> Option<&str> {
        match &self.data {
            NodeData::Element { .. } => None,
            NodeData::Text(t) => Some(t),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        match &self.data {
            NodeData::Element { attributes, .. } => attributes,
            NodeData::Text(_) => &[],
        }
    }

    pub fn children(&self) -> &[Arc<DocumentNode>] {
        &self.children
    }
}

/// Builds the frozen object tree for `root` and returns the root object.
pub(crate) fn expose(root: &Arc<DocumentNode>, ctx: &mut EvalContext) -> Result<ObjectId, MarshalError> {
    let object_prototype = ctx.realm.object_prototype;
    let node_prototype = ctx.alloc(JsObject::ordinary(Some(object_prototype)))?;
    let get_attribute =
        ctx.realm
            .new_native_function(&mut ctx.heap, "getAttribute", node_get_attribute, None)?;
    let proto = ctx.heap.get_mut(node_prototype)?;
    proto.define_property(
        "getAttribute",
        JsValue::Object(get_attribute),
        PropertyFlags::constant(),
    );
    proto.frozen = true;
    expose_node(root, node_prototype, ctx, 0)
}

fn expose_node(
    node: &Arc<DocumentNode>,
    node_prototype: ObjectId,
    ctx: &mut EvalContext,
    depth: usize,
) -> Result<ObjectId, MarshalError> {
    if depth >= MAX_DEPTH {
        return Err(MarshalError::TooDeep(MAX_DEPTH));
    }
    let mut children = Vec::with_capacity(node.children().len());
    for child in node.children() {
        children.push(JsValue::Object(expose_node(child, node_prototype, ctx, depth + 1)?));
    }
    let first = children.first().cloned().unwrap_or(JsValue::Null);
    let last = children.last().cloned().unwrap_or(JsValue::Null);
    let child_nodes = ctx.new_array(children)?;
    ctx.heap.get_mut(child_nodes)?.frozen = true;

    let attributes = ctx.new_object()?;
    {
        let attrs = ctx.heap.get_mut(attributes)?;
        for (name, value) in node.attributes() {
            attrs.define_property(name, JsValue::String(value.clone()), PropertyFlags::READ_ONLY);
        }
        attrs.frozen = true;
    }

    let id = ctx.alloc(JsObject::new(
        ObjectKind::Document(Arc::clone(node)),
        Some(node_prototype),
    ))?;
    let object = ctx.heap.get_mut(id)?;
    let node_value = match node.node_value() {
        Some(v) => JsValue::String(v.to_string()),
        None => JsValue::Null,
    };
    let fields = vec![
        ("nodeType", JsValue::from_i64(node.node_type() as i64)),
        ("nodeName", JsValue::String(node.node_name().to_string())),
        ("nodeValue", node_value),
        ("attributes", JsValue::Object(attributes)),
        ("childNodes", JsValue::Object(child_nodes)),
        ("firstChild", first),
        ("lastChild", last),
    ];
    for (name, value) in fields {
        object.define_property(name, value, PropertyFlags::READ_ONLY);
    }
    object.frozen = true;
    Ok(id)
}

/// `node.getAttribute(name)`: the attribute value, or null.
fn node_get_attribute(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let name = match args.first() {
        Some(v) => ctx.to_string(v)?,
        None => return Ok(JsValue::Null),
    };
    let id = this.as_object().ok_or_else(|| {
        JErrorType::TypeError("getAttribute called on a non-node".to_string())
    })?;
    match &ctx.heap.get(id)?.kind {
        ObjectKind::Document(node) => Ok(node
            .attribute(&name)
            .map(|v| JsValue::String(v.to_string()))
            .unwrap_or(JsValue::Null)),
        _ => Err(JErrorType::TypeError(
            "getAttribute called on a non-node".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::heap::{Heap, HeapConfig};

    fn prompt() -> Arc<DocumentNode> {
        Arc::new(
            DocumentNode::element("prompt")
                .with_attribute("bargein", "false")
                .with_child(DocumentNode::text("Welcome"))
                .with_child(DocumentNode::element("break").with_attribute("time", "1s")),
        )
    }

    #[test]
    fn test_node_accessors() {
        let node = prompt();
        assert_eq!(node.node_type(), ELEMENT_NODE);
        assert_eq!(node.node_name(), "prompt");
        assert_eq!(node.attribute("bargein"), Some("false"));
        assert_eq!(node.children()[0].node_name(), "#text");
        assert_eq!(node.children()[0].node_value(), Some("Welcome"));
    }

    #[test]
    fn test_exposed_tree_is_frozen() {
        let mut ctx = EvalContext::new(Heap::new(HeapConfig::unlimited())).unwrap();
        let root = JsValue::Object(expose(&prompt(), &mut ctx).unwrap());

        let first = ctx.get_property(&root, "firstChild").unwrap();
        assert_eq!(
            ctx.get_property(&first, "nodeValue").unwrap(),
            JsValue::String("Welcome".to_string())
        );

        ctx.put_property(&root, "nodeName", JsValue::String("x".to_string()))
            .unwrap();
        assert_eq!(
            ctx.get_property(&root, "nodeName").unwrap(),
            JsValue::String("prompt".to_string())
        );

        let get_attribute = ctx.get_property(&root, "getAttribute").unwrap();
        let v = ctx
            .call(&get_attribute, root, vec![JsValue::String("bargein".to_string())])
            .unwrap();
        assert_eq!(v, JsValue::String("false".to_string()));
    }

    #[test]
    fn test_deep_document_is_refused() {
        let mut node = DocumentNode::element("leaf");
        for _ in 0..MAX_DEPTH {
            node = DocumentNode::element("div").with_child(node);
        }
        let mut ctx = EvalContext::new(Heap::new(HeapConfig::unlimited())).unwrap();
        assert_eq!(
            expose(&Arc::new(node), &mut ctx).unwrap_err(),
            MarshalError::TooDeep(MAX_DEPTH)
        );
    }
}
