use crate::resource_path::{PathElement, ResourcePath};

/// Describes one attribute of a resource type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub name: String,
    /// Whether the stored value may be an expression resolved at read time
    pub expressions_allowed: bool,
}

/// Static description of a resource type and, recursively, its child types.
///
/// A wildcard element (`stack=*`) describes every concrete child of that key;
/// a literal element (`transport=TRANSPORT`) describes exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSchema {
    element: PathElement,
    attributes: Vec<AttributeDescriptor>,
    children: Vec<ResourceSchema>,
}

impl AttributeDescriptor {
    pub fn new(name: impl Into<String>, expressions_allowed: bool) -> Self {
        Self {
            name: name.into(),
            expressions_allowed,
        }
    }
}

impl ResourceSchema {
    pub fn new(element: PathElement) -> Self {
        Self {
            element,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, expressions_allowed: bool) -> Self {
        self.add_attribute(AttributeDescriptor::new(name, expressions_allowed));
        self
    }

    pub fn with_child(mut self, child: ResourceSchema) -> Self {
        self.add_child(child);
        self
    }

    /// Adds or replaces the descriptor with the same name.
    pub fn add_attribute(&mut self, descriptor: AttributeDescriptor) {
        match self.attributes.iter_mut().find(|a| a.name == descriptor.name) {
            Some(existing) => *existing = descriptor,
            None => self.attributes.push(descriptor),
        }
    }

    /// Adds or replaces the child schema registered under the same element.
    pub fn add_child(&mut self, child: ResourceSchema) {
        match self.children.iter_mut().find(|c| c.element == child.element) {
            Some(existing) => *existing = child,
            None => self.children.push(child),
        }
    }

    pub fn element(&self) -> &PathElement {
        &self.element
    }

    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    pub fn children(&self) -> &[ResourceSchema] {
        &self.children
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// The child schema describing `element`.
    ///
    /// An identically registered child wins; otherwise a wildcard child with the
    /// same key describes any literal name.
    pub fn child(&self, element: &PathElement) -> Option<&ResourceSchema> {
        self.children
            .iter()
            .find(|c| c.element == *element)
            .or_else(|| self.children.iter().find(|c| c.element.matches(element)))
    }

    /// Resolves `path` against this schema. The first element of `path` must
    /// address this node itself.
    pub fn resolve(&self, path: &ResourcePath) -> Option<&ResourceSchema> {
        let (first, rest) = path.elements().split_first()?;
        if !(self.element == *first || self.element.matches(first)) {
            return None;
        }
        rest.iter()
            .try_fold(self, |node, element| node.child(element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResourceSchema {
        ResourceSchema::new(PathElement::literal("subsystem", "cluster-transport")).with_child(
            ResourceSchema::new(PathElement::wildcard("stack"))
                .with_child(
                    ResourceSchema::new(PathElement::literal("transport", "TRANSPORT"))
                        .with_attribute("type", false)
                        .with_attribute("shared", true),
                )
                .with_child(ResourceSchema::new(PathElement::literal("relay", "RELAY"))),
        )
    }

    #[test]
    fn test_child_lookup_through_wildcard() {
        let schema = sample();
        let stack = schema.child(&PathElement::literal("stack", "udp")).unwrap();
        assert!(stack.element().is_wildcard());
        assert!(schema.child(&PathElement::wildcard("stack")).is_some());
        assert!(stack.child(&PathElement::literal("relay", "other")).is_none());
    }

    #[test]
    fn test_resolve_path() {
        let schema = sample();
        let path: ResourcePath = "subsystem=cluster-transport/stack=tcp/transport=TRANSPORT"
            .parse()
            .unwrap();
        let transport = schema.resolve(&path).unwrap();
        assert!(transport.attribute("shared").unwrap().expressions_allowed);
        assert!(!transport.attribute("type").unwrap().expressions_allowed);
        assert!(transport.attribute("missing").is_none());

        let bad: ResourcePath = "subsystem=other/stack=tcp".parse().unwrap();
        assert!(schema.resolve(&bad).is_none());
        assert!(schema.resolve(&ResourcePath::empty()).is_none());
    }

    #[test]
    fn test_add_child_replaces_same_element() {
        let mut schema = ResourceSchema::new(PathElement::wildcard("stack"));
        schema.add_child(ResourceSchema::new(PathElement::wildcard("protocol")));
        schema.add_child(
            ResourceSchema::new(PathElement::wildcard("protocol")).with_attribute("type", false),
        );
        assert_eq!(schema.children().len(), 1);
        assert!(schema.children()[0].attribute("type").is_some());
    }
}
