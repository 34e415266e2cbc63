use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::resource_path::{PathElement, ResourcePath};

/// What happens to an attribute when a tree is sent to a legacy version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeRule {
    /// Fail if the value itself is an expression; constants pass through
    RejectExpression,
    /// Fail if the value or anything nested in it is an expression
    RejectNestedExpression,
    /// Fail if the attribute is present at all
    RejectDefined,
    /// Drop the attribute silently
    Discard,
}

/// What happens to a child resource (and its subtree) when present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChildRule {
    /// Fail the whole transformation
    Reject,
    /// Drop the subtree silently
    Discard,
}

/// Rules attached to one schema node of a versioned rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleNode {
    pub(crate) element: PathElement,
    pub(crate) address: ResourcePath,
    pub(crate) attributes: BTreeMap<String, AttributeRule>,
    pub(crate) child_rules: Vec<(PathElement, ChildRule)>,
    pub(crate) children: Vec<RuleNode>,
}

/// The compiled, immutable rules for transforming a subsystem tree to one legacy version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedRuleSet {
    subsystem: String,
    root: Option<RuleNode>,
}

/// A pruning the engine performed while transforming a tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedTransformation {
    pub path: ResourcePath,
    pub attribute: Option<String>,
    pub change_type: ChangeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeType {
    AttributeDiscarded,
    ResourceDiscarded,
}

/// Picks the entry whose element equals `concrete`, falling back to a wildcard entry that accepts it.
fn most_specific<'a, T>(
    entries: &'a [T],
    element_of: impl Fn(&T) -> &PathElement,
    concrete: &PathElement,
) -> Option<&'a T> {
    entries
        .iter()
        .find(|entry| element_of(*entry) == concrete)
        .or_else(|| entries.iter().find(|entry| element_of(*entry).matches(concrete)))
}

impl RuleNode {
    pub(crate) fn new(element: PathElement, address: ResourcePath) -> Self {
        Self {
            element,
            address,
            attributes: BTreeMap::new(),
            child_rules: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn element(&self) -> &PathElement {
        &self.element
    }

    /// The (possibly wildcarded) address of the schema node these rules belong to.
    pub fn address(&self) -> &ResourcePath {
        &self.address
    }

    pub fn attribute_rule(&self, name: &str) -> Option<AttributeRule> {
        self.attributes.get(name).copied()
    }

    pub fn attribute_rules(&self) -> &BTreeMap<String, AttributeRule> {
        &self.attributes
    }

    /// The rule applying to a concrete child element, if any.
    pub fn child_rule(&self, child: &PathElement) -> Option<ChildRule> {
        most_specific(&self.child_rules, |(element, _)| element, child).map(|(_, rule)| *rule)
    }

    pub fn child_rules(&self) -> &[(PathElement, ChildRule)] {
        &self.child_rules
    }

    pub fn children(&self) -> &[RuleNode] {
        &self.children
    }

    /// The nested rule node for a concrete child element, if any.
    pub fn child(&self, child: &PathElement) -> Option<&RuleNode> {
        most_specific(&self.children, |node| &node.element, child)
    }

    pub fn has_rules(&self) -> bool {
        !self.attributes.is_empty() || !self.child_rules.is_empty()
    }

    pub(crate) fn set_child_rule(&mut self, element: PathElement, rule: ChildRule) {
        match self.child_rules.iter_mut().find(|(e, _)| *e == element) {
            Some(entry) => entry.1 = rule,
            None => self.child_rules.push((element, rule)),
        }
    }

    /// Drops descendants carrying no rule anywhere below them. Returns `None`
    /// when this node ends up with neither rules nor children.
    pub(crate) fn pruned(mut self) -> Option<Self> {
        self.children = self
            .children
            .into_iter()
            .filter_map(RuleNode::pruned)
            .collect();
        if self.has_rules() || !self.children.is_empty() {
            Some(self)
        } else {
            None
        }
    }

    fn count_rules(&self) -> usize {
        self.attributes.len()
            + self.child_rules.len()
            + self.children.iter().map(RuleNode::count_rules).sum::<usize>()
    }
}

impl VersionedRuleSet {
    pub(crate) fn new(subsystem: String, root: Option<RuleNode>) -> Self {
        Self { subsystem, root }
    }

    pub fn subsystem(&self) -> &str {
        &self.subsystem
    }

    pub fn root(&self) -> Option<&RuleNode> {
        self.root.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Total number of attribute and child rules in the set.
    pub fn rule_count(&self) -> usize {
        self.root.as_ref().map_or(0, RuleNode::count_rules)
    }

    /// Locates the rule node whose address matches the concrete `path`.
    pub fn rule_for(&self, path: &ResourcePath) -> Option<&RuleNode> {
        let (first, rest) = path.elements().split_first()?;
        let root = self.root.as_ref()?;
        if !root.element.matches(first) {
            return None;
        }
        rest.iter().try_fold(root, |node, element| node.child(element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> ResourcePath {
        s.parse().unwrap()
    }

    fn sample_rule_set() -> VersionedRuleSet {
        let root_path = path("subsystem=cluster-transport");
        let mut root = RuleNode::new(PathElement::literal("subsystem", "cluster-transport"), root_path.clone());

        let stack_path = root_path.append(PathElement::wildcard("stack"));
        let mut stack = RuleNode::new(PathElement::wildcard("stack"), stack_path.clone());
        stack.set_child_rule(PathElement::literal("relay", "RELAY"), ChildRule::Reject);

        let mut wildcard_transport = RuleNode::new(
            PathElement::wildcard("transport"),
            stack_path.append(PathElement::wildcard("transport")),
        );
        wildcard_transport.attributes.insert("shared".to_string(), AttributeRule::RejectExpression);

        let mut tcp_transport = RuleNode::new(
            PathElement::literal("transport", "tcp"),
            stack_path.append(PathElement::literal("transport", "tcp")),
        );
        tcp_transport.attributes.insert("shared".to_string(), AttributeRule::Discard);

        stack.children.push(wildcard_transport);
        stack.children.push(tcp_transport);
        root.children.push(stack);
        VersionedRuleSet::new("cluster-transport".to_string(), Some(root))
    }

    #[test]
    fn test_rule_lookup_by_concrete_path() {
        let rules = sample_rule_set();
        let node = rules
            .rule_for(&path("subsystem=cluster-transport/stack=udp/transport=udp"))
            .unwrap();
        assert_eq!(node.attribute_rule("shared"), Some(AttributeRule::RejectExpression));
        assert!(node.address().matches(&path("subsystem=cluster-transport/stack=udp/transport=udp")));

        assert!(rules.rule_for(&path("subsystem=cluster-transport/stack=udp/protocol=UDP")).is_none());
        assert!(rules.rule_for(&path("subsystem=other")).is_none());
    }

    #[test]
    fn test_literal_rule_wins_over_wildcard() {
        let rules = sample_rule_set();
        let node = rules
            .rule_for(&path("subsystem=cluster-transport/stack=udp/transport=tcp"))
            .unwrap();
        assert_eq!(node.attribute_rule("shared"), Some(AttributeRule::Discard));
    }

    #[test]
    fn test_child_rule_lookup() {
        let rules = sample_rule_set();
        let stack = rules.rule_for(&path("subsystem=cluster-transport/stack=udp")).unwrap();
        assert_eq!(stack.child_rule(&PathElement::literal("relay", "RELAY")), Some(ChildRule::Reject));
        assert_eq!(stack.child_rule(&PathElement::literal("relay", "other")), None);
        assert_eq!(rules.rule_count(), 3);
    }

    #[test]
    fn test_pruned_drops_empty_nodes() {
        let mut root = RuleNode::new(PathElement::literal("subsystem", "x"), path("subsystem=x"));
        root.children.push(RuleNode::new(PathElement::wildcard("stack"), path("subsystem=x/stack=*")));
        assert!(root.clone().pruned().is_none());

        root.attributes.insert("default-stack".to_string(), AttributeRule::Discard);
        let pruned = root.pruned().unwrap();
        assert!(pruned.children().is_empty());
    }
}
