use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    resource_path::{PathElement, ResourcePath},
    resource_schema::ResourceSchema,
    transformation_rule::{AttributeRule, ChildRule, RuleNode, VersionedRuleSet},
};

/// Fluent builder assembling the rules for one legacy version.
///
/// Each builder is scoped to one schema node. [`add_child_resource`] hands out
/// the builder for a child node so nested rules mirror the schema tree:
///
/// ```
/// use model_transform::{PathElement, ResourceSchema, TransformationBuilder};
///
/// let schema = ResourceSchema::new(PathElement::literal("subsystem", "cluster-transport"))
///     .with_child(
///         ResourceSchema::new(PathElement::wildcard("stack"))
///             .with_child(ResourceSchema::new(PathElement::literal("relay", "RELAY"))),
///     );
///
/// let mut subsystem = TransformationBuilder::for_subsystem("cluster-transport", &schema);
/// subsystem
///     .add_child_resource(PathElement::wildcard("stack"))?
///     .reject_child_resource(PathElement::literal("relay", "RELAY"))?;
/// let rules = subsystem.build();
/// assert_eq!(rules.rule_count(), 1);
/// # Ok::<(), model_transform::BuildError>(())
/// ```
///
/// [`add_child_resource`]: TransformationBuilder::add_child_resource
#[derive(Debug)]
pub struct TransformationBuilder<'s> {
    subsystem: String,
    schema: &'s ResourceSchema,
    node: RuleNode,
    children: Vec<TransformationBuilder<'s>>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Schema mismatch at {path}: {detail}")]
    SchemaMismatch { path: ResourcePath, detail: String },
}

impl<'s> TransformationBuilder<'s> {
    /// Starts a rule set at the root of `schema`.
    pub fn for_subsystem(subsystem: impl Into<String>, schema: &'s ResourceSchema) -> Self {
        let element = schema.element().clone();
        let address = ResourcePath::empty().append(element.clone());
        Self {
            subsystem: subsystem.into(),
            schema,
            node: RuleNode::new(element, address),
            children: Vec::new(),
        }
    }

    pub fn address(&self) -> &ResourcePath {
        &self.node.address
    }

    /// Returns the builder for the child resource `element`, creating it on first use.
    ///
    /// `element` may be a wildcard, or a literal narrowing a wildcard schema node.
    pub fn add_child_resource(
        &mut self,
        element: PathElement,
    ) -> Result<&mut TransformationBuilder<'s>, BuildError> {
        let child_schema = self.child_schema(&element)?;

        let index = match self.children.iter().position(|c| c.node.element == element) {
            Some(index) => index,
            None => {
                let address = self.node.address.append(element.clone());
                self.children.push(TransformationBuilder {
                    subsystem: self.subsystem.clone(),
                    schema: child_schema,
                    node: RuleNode::new(element, address),
                    children: Vec::new(),
                });
                self.children.len() - 1
            }
        };
        Ok(&mut self.children[index])
    }

    /// Rejects the transformation when any of `attributes` holds an expression value.
    pub fn reject_expressions(&mut self, attributes: &[&str]) -> Result<&mut Self, BuildError> {
        self.attach(AttributeRule::RejectExpression, attributes)
    }

    /// Like [`reject_expressions`](Self::reject_expressions), but also inspects list elements and object members.
    pub fn reject_nested_expressions(&mut self, attributes: &[&str]) -> Result<&mut Self, BuildError> {
        self.attach(AttributeRule::RejectNestedExpression, attributes)
    }

    pub fn reject_defined(&mut self, attributes: &[&str]) -> Result<&mut Self, BuildError> {
        self.attach(AttributeRule::RejectDefined, attributes)
    }

    pub fn discard_attributes(&mut self, attributes: &[&str]) -> Result<&mut Self, BuildError> {
        self.attach(AttributeRule::Discard, attributes)
    }

    /// Rejects the transformation when a child matching `element` is present.
    pub fn reject_child_resource(&mut self, element: PathElement) -> Result<&mut Self, BuildError> {
        self.attach_child(element, ChildRule::Reject)
    }

    /// Silently drops any child matching `element`, with its whole subtree.
    pub fn discard_child_resource(&mut self, element: PathElement) -> Result<&mut Self, BuildError> {
        self.attach_child(element, ChildRule::Discard)
    }

    /// Freezes the accumulated rules. Nodes without any rule below them are dropped.
    pub fn build(self) -> VersionedRuleSet {
        let subsystem = self.subsystem.clone();
        let root = self.into_rule_node().pruned();
        let rules = VersionedRuleSet::new(subsystem, root);
        debug!(subsystem = rules.subsystem(), rules = rules.rule_count(), "Built transformation rule set");
        rules
    }

    fn into_rule_node(self) -> RuleNode {
        let mut node = self.node;
        node.children = self
            .children
            .into_iter()
            .map(TransformationBuilder::into_rule_node)
            .collect();
        node
    }

    fn attach(&mut self, rule: AttributeRule, attributes: &[&str]) -> Result<&mut Self, BuildError> {
        for name in attributes {
            let descriptor = self.schema.attribute(name).ok_or_else(|| BuildError::SchemaMismatch {
                path: self.node.address.clone(),
                detail: format!("no attribute '{}'", name),
            })?;

            let expression_rule = matches!(
                rule,
                AttributeRule::RejectExpression | AttributeRule::RejectNestedExpression
            );
            if expression_rule && !descriptor.expressions_allowed {
                warn!(
                    path = %self.node.address,
                    attribute = *name,
                    "Expression rule attached to an attribute that does not accept expressions"
                );
            }

            if let Some(previous) = self.node.attributes.insert(name.to_string(), rule) {
                if previous != rule {
                    debug!(path = %self.node.address, attribute = *name, ?previous, ?rule, "Replacing attribute rule");
                }
            }
        }
        Ok(self)
    }

    fn attach_child(&mut self, element: PathElement, rule: ChildRule) -> Result<&mut Self, BuildError> {
        self.child_schema(&element)?;
        self.node.set_child_rule(element, rule);
        Ok(self)
    }

    fn child_schema(&self, element: &PathElement) -> Result<&'s ResourceSchema, BuildError> {
        let schema: &'s ResourceSchema = self.schema;
        schema.child(element).ok_or_else(|| BuildError::SchemaMismatch {
            path: self.node.address.clone(),
            detail: format!("no child resource '{}'", element),
        })
    }
}
