use serde_yaml::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    resource_instance::{AttributeValue, ResourceInstance},
    resource_path::ResourcePath,
    schema_version::SchemaVersion,
    transformation_registry::TransformationRegistry,
    transformation_rule::{AppliedTransformation, AttributeRule, ChangeType, ChildRule, RuleNode, VersionedRuleSet},
};

/// Why a tree cannot be represented in the target version
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransformFailure {
    #[error("Attribute '{attribute}' of {path} holds an expression the target version cannot resolve")]
    RejectedExpressionAttribute { path: ResourcePath, attribute: String },

    #[error("Attribute '{attribute}' of {path} is not supported by the target version")]
    RejectedDefinedAttribute { path: ResourcePath, attribute: String },

    #[error("Resource {path} is not supported by the target version")]
    RejectedChildResource { path: ResourcePath },

    #[error("Subsystem not registered: {0}")]
    UnknownSubsystem(String),
}

/// Result of transforming a tree through the registry
#[derive(Debug, Clone, PartialEq)]
pub struct TransformationResult {
    pub transformed: ResourceInstance,
    pub applied_transformations: Vec<AppliedTransformation>,
    pub subsystem: String,
    pub target_version: SchemaVersion,
}

/// Transforms `instance` for the version `rule_set` was built for.
///
/// Rules are resolved from the instance's full address, so a subtree placed
/// with [`ResourceInstance::with_parent`] is checked like the same resources
/// inside the whole subsystem tree. The walk is depth-first, a resource's
/// attributes before its children, and stops at the first rejection.
/// `instance` is never modified.
pub fn transform(
    instance: &ResourceInstance,
    rule_set: &VersionedRuleSet,
) -> Result<ResourceInstance, TransformFailure> {
    Walk::fail_fast(rule_set).run(instance)
}

/// Same as [`transform`], also returning every attribute and subtree that was discarded.
pub fn transform_with_report(
    instance: &ResourceInstance,
    rule_set: &VersionedRuleSet,
) -> Result<(ResourceInstance, Vec<AppliedTransformation>), TransformFailure> {
    let mut walk = Walk::fail_fast(rule_set);
    let transformed = walk.run(instance)?;
    Ok((transformed, walk.applied))
}

/// Walks the whole tree and returns every rejection, in walk order.
///
/// The first entry is the failure [`transform`] reports.
pub fn diagnose(instance: &ResourceInstance, rule_set: &VersionedRuleSet) -> Vec<TransformFailure> {
    let mut walk = Walk::collecting(rule_set);
    match walk.run(instance) {
        Ok(_) => walk.collected.unwrap_or_default(),
        Err(failure) => vec![failure],
    }
}

struct Walk<'r> {
    rule_set: &'r VersionedRuleSet,
    applied: Vec<AppliedTransformation>,
    collected: Option<Vec<TransformFailure>>,
}

impl<'r> Walk<'r> {
    fn fail_fast(rule_set: &'r VersionedRuleSet) -> Self {
        Self {
            rule_set,
            applied: Vec::new(),
            collected: None,
        }
    }

    fn collecting(rule_set: &'r VersionedRuleSet) -> Self {
        Self {
            collected: Some(Vec::new()),
            ..Self::fail_fast(rule_set)
        }
    }

    fn run(&mut self, instance: &ResourceInstance) -> Result<ResourceInstance, TransformFailure> {
        let path = instance.path();
        let rules = self.rule_set.rule_for(&path);
        self.visit(instance, path, rules)
    }

    fn reject(&mut self, failure: TransformFailure) -> Result<(), TransformFailure> {
        match self.collected.as_mut() {
            Some(failures) => {
                failures.push(failure);
                Ok(())
            }
            None => Err(failure),
        }
    }

    fn visit(
        &mut self,
        instance: &ResourceInstance,
        path: ResourcePath,
        rules: Option<&'r RuleNode>,
    ) -> Result<ResourceInstance, TransformFailure> {
        let mut output = instance.shell();

        for (name, value) in instance.attributes() {
            match rules.and_then(|node| node.attribute_rule(name)) {
                Some(AttributeRule::Discard) => {
                    debug!(path = %path, attribute = %name, "Discarding attribute");
                    self.applied.push(AppliedTransformation {
                        path: path.clone(),
                        attribute: Some(name.clone()),
                        change_type: ChangeType::AttributeDiscarded,
                    });
                }
                Some(rule) => match rejection(rule, &path, name, value) {
                    Some(failure) => self.reject(failure)?,
                    None => output.set_attribute(name.clone(), value.clone()),
                },
                None => output.set_attribute(name.clone(), value.clone()),
            }
        }

        for child in instance.children() {
            let child_path = path.append(child.element().clone());
            match rules.and_then(|node| node.child_rule(child.element())) {
                Some(ChildRule::Discard) => {
                    debug!(path = %child_path, "Discarding resource");
                    self.applied.push(AppliedTransformation {
                        path: child_path,
                        attribute: None,
                        change_type: ChangeType::ResourceDiscarded,
                    });
                }
                Some(ChildRule::Reject) => {
                    self.reject(TransformFailure::RejectedChildResource { path: child_path.clone() })?;
                    // only reached while collecting: keep looking for violations below
                    let child_rules = rules.and_then(|node| node.child(child.element()));
                    self.visit(child, child_path, child_rules)?;
                }
                None => {
                    let child_rules = rules.and_then(|node| node.child(child.element()));
                    output.add_child(self.visit(child, child_path, child_rules)?);
                }
            }
        }

        Ok(output)
    }
}

fn rejection(
    rule: AttributeRule,
    path: &ResourcePath,
    name: &str,
    value: &AttributeValue,
) -> Option<TransformFailure> {
    let rejected = match rule {
        AttributeRule::RejectExpression => value.is_expression(),
        AttributeRule::RejectNestedExpression => value.contains_expression(),
        AttributeRule::RejectDefined => !matches!(value, AttributeValue::Constant(Value::Null)),
        AttributeRule::Discard => false,
    };
    if !rejected {
        return None;
    }

    let path = path.clone();
    let attribute = name.to_string();
    Some(match rule {
        AttributeRule::RejectDefined => TransformFailure::RejectedDefinedAttribute { path, attribute },
        _ => TransformFailure::RejectedExpressionAttribute { path, attribute },
    })
}

/// Resolves the rule set for a negotiated version from the registry and applies it
#[derive(Debug, Clone)]
pub struct TransformationEngine {
    registry: TransformationRegistry,
}

impl TransformationEngine {
    pub fn new(registry: TransformationRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TransformationRegistry {
        &self.registry
    }

    /// Transforms a `subsystem` tree for a peer speaking `target_version`.
    ///
    /// Trees for the current (or a newer) version, and for legacy versions with
    /// no registered rules, are returned unchanged.
    pub fn transform_for(
        &self,
        subsystem: &str,
        target_version: &SchemaVersion,
        instance: &ResourceInstance,
    ) -> Result<TransformationResult, TransformFailure> {
        let current = self
            .registry
            .current_version(subsystem)
            .ok_or_else(|| TransformFailure::UnknownSubsystem(subsystem.to_string()))?;

        let unchanged = || TransformationResult {
            transformed: instance.clone(),
            applied_transformations: Vec::new(),
            subsystem: subsystem.to_string(),
            target_version: *target_version,
        };

        if !target_version.is_legacy_of(&current) {
            return Ok(unchanged());
        }

        let Some(rule_set) = self.registry.lookup(subsystem, target_version) else {
            debug!(subsystem, version = %target_version, "No transformation registered, sending tree as is");
            return Ok(unchanged());
        };

        match transform_with_report(instance, &rule_set) {
            Ok((transformed, applied_transformations)) => Ok(TransformationResult {
                transformed,
                applied_transformations,
                subsystem: subsystem.to_string(),
                target_version: *target_version,
            }),
            Err(failure) => {
                warn!(subsystem, version = %target_version, %failure, "Transformation rejected");
                Err(failure)
            }
        }
    }
}
