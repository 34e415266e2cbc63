use serde_yaml::Value;
use std::collections::BTreeMap;

use crate::resource_path::{PathElement, ResourcePath};

/// Value held by an attribute of a live resource
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// A value stored as-is
    Constant(Value),
    /// A value resolved at read time, e.g. `${jboss.bind.address:127.0.0.1}`
    Expression(String),
    List(Vec<AttributeValue>),
    Object(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    pub fn constant(value: impl Into<Value>) -> Self {
        AttributeValue::Constant(value.into())
    }

    pub fn expression(expression: impl Into<String>) -> Self {
        AttributeValue::Expression(expression.into())
    }

    /// True only when the value itself is an expression; nested elements are not inspected.
    pub fn is_expression(&self) -> bool {
        matches!(self, AttributeValue::Expression(_))
    }

    /// True when the value or any list element / object member, at any depth, is an expression.
    pub fn contains_expression(&self) -> bool {
        match self {
            AttributeValue::Constant(_) => false,
            AttributeValue::Expression(_) => true,
            AttributeValue::List(items) => items.iter().any(AttributeValue::contains_expression),
            AttributeValue::Object(members) => members.values().any(AttributeValue::contains_expression),
        }
    }
}

/// A concrete resource and its subtree.
///
/// The element is always literal. `parent` is the address of the enclosing
/// resource (empty for a subsystem root) and is kept in step with the tree:
/// adding a child re-addresses its whole subtree under this resource.
/// Attributes are kept ordered by name and children in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInstance {
    parent: ResourcePath,
    element: PathElement,
    attributes: BTreeMap<String, AttributeValue>,
    children: Vec<ResourceInstance>,
}

impl ResourceInstance {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self::from_element(PathElement::literal(key, name))
    }

    pub(crate) fn from_element(element: PathElement) -> Self {
        Self {
            parent: ResourcePath::empty(),
            element,
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Same address, no attributes or children.
    pub(crate) fn shell(&self) -> Self {
        Self {
            parent: self.parent.clone(),
            ..Self::from_element(self.element.clone())
        }
    }

    /// Places this resource (and its subtree) below `parent`.
    pub fn with_parent(mut self, parent: ResourcePath) -> Self {
        self.reparent(parent);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_child(mut self, child: ResourceInstance) -> Self {
        self.add_child(child);
        self
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.attributes.insert(name.into(), value);
    }

    pub fn add_child(&mut self, mut child: ResourceInstance) {
        child.reparent(self.path());
        self.children.push(child);
    }

    fn reparent(&mut self, parent: ResourcePath) {
        if self.parent == parent {
            return;
        }
        self.parent = parent;
        let path = self.path();
        for child in &mut self.children {
            child.reparent(path.clone());
        }
    }

    pub fn element(&self) -> &PathElement {
        &self.element
    }

    pub fn parent(&self) -> &ResourcePath {
        &self.parent
    }

    /// Full address of this resource.
    pub fn path(&self) -> ResourcePath {
        self.parent.append(self.element.clone())
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn children(&self) -> &[ResourceInstance] {
        &self.children
    }

    pub fn child(&self, element: &PathElement) -> Option<&ResourceInstance> {
        self.children.iter().find(|c| c.element == *element)
    }

    /// Number of resources in this subtree, including `self`.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(ResourceInstance::size).sum::<usize>()
    }
}
