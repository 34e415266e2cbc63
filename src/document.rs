//! YAML form of resource trees, as read and written by the command line tool.
//!
//! ```yaml
//! element: subsystem=cluster-transport
//! attributes:
//!   default-stack: udp
//! children:
//!   - element: stack=udp
//!     children:
//!       - element: transport=TRANSPORT
//!         attributes:
//!           shared: ${cluster.shared:false}
//! ```
//!
//! String values containing `${...}` are read as expressions. A document for a
//! resource below the subsystem root names its enclosing resource with a
//! top-level `parent: /subsystem=cluster-transport/stack=udp`.

use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

use crate::{
    resource_instance::{AttributeValue, ResourceInstance},
    resource_path::{PathElement, PathParseError, ResourcePath},
};

const PARENT: &str = "parent";
const ELEMENT: &str = "element";
const ATTRIBUTES: &str = "attributes";
const CHILDREN: &str = "children";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid resource element: {0}")]
    InvalidElement(#[from] PathParseError),

    #[error("Resource element {0} must not be a wildcard")]
    WildcardElement(String),

    #[error("Malformed resource document: {0}")]
    Malformed(String),
}

fn expression_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{[^}]+\}").expect("expression pattern is valid"))
}

/// Whether a stored string is an expression rather than a constant.
pub fn is_expression(raw: &str) -> bool {
    expression_pattern().is_match(raw)
}

pub fn parse_instance(yaml: &str) -> Result<ResourceInstance, DocumentError> {
    let value: Value = serde_yaml::from_str(yaml)?;
    instance_from_yaml(&value)
}

pub fn instance_from_yaml(value: &Value) -> Result<ResourceInstance, DocumentError> {
    let instance = resource_from_yaml(value)?;
    match value.get(PARENT) {
        None | Some(Value::Null) => Ok(instance),
        Some(Value::String(parent)) => Ok(instance.with_parent(parent.parse::<ResourcePath>()?)),
        Some(_) => Err(DocumentError::Malformed(format!("'{}' must be a resource address", PARENT))),
    }
}

fn resource_from_yaml(value: &Value) -> Result<ResourceInstance, DocumentError> {
    let map = value
        .as_mapping()
        .ok_or_else(|| DocumentError::Malformed("a resource must be a mapping".to_string()))?;

    let element: PathElement = map
        .get(ELEMENT)
        .and_then(Value::as_str)
        .ok_or_else(|| DocumentError::Malformed(format!("missing '{}'", ELEMENT)))?
        .parse()?;
    if element.is_wildcard() {
        return Err(DocumentError::WildcardElement(element.to_string()));
    }

    let mut instance = ResourceInstance::from_element(element);

    match map.get(ATTRIBUTES) {
        None | Some(Value::Null) => {}
        Some(Value::Mapping(attributes)) => {
            for (name, value) in attributes {
                let name = name.as_str().ok_or_else(|| {
                    DocumentError::Malformed(format!("attribute names of {} must be strings", instance.element()))
                })?;
                instance.set_attribute(name, attribute_from_yaml(value));
            }
        }
        Some(_) => {
            return Err(DocumentError::Malformed(format!(
                "'{}' of {} must be a mapping",
                ATTRIBUTES,
                instance.element()
            )))
        }
    }

    match map.get(CHILDREN) {
        None | Some(Value::Null) => {}
        Some(Value::Sequence(children)) => {
            for child in children {
                instance.add_child(resource_from_yaml(child)?);
            }
        }
        Some(_) => {
            return Err(DocumentError::Malformed(format!(
                "'{}' of {} must be a sequence",
                CHILDREN,
                instance.element()
            )))
        }
    }

    Ok(instance)
}

fn attribute_from_yaml(value: &Value) -> AttributeValue {
    match value {
        Value::String(raw) if is_expression(raw) => AttributeValue::Expression(raw.clone()),
        Value::Sequence(items) => AttributeValue::List(items.iter().map(attribute_from_yaml).collect()),
        Value::Mapping(members) if members.keys().all(Value::is_string) => AttributeValue::Object(
            members
                .iter()
                .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), attribute_from_yaml(v))))
                .collect::<BTreeMap<_, _>>(),
        ),
        Value::Tagged(tagged) => attribute_from_yaml(&tagged.value),
        other => AttributeValue::Constant(other.clone()),
    }
}

fn attribute_to_yaml(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Constant(constant) => constant.clone(),
        AttributeValue::Expression(expression) => Value::String(expression.clone()),
        AttributeValue::List(items) => Value::Sequence(items.iter().map(attribute_to_yaml).collect()),
        AttributeValue::Object(members) => Value::Mapping(
            members
                .iter()
                .map(|(k, v)| (Value::String(k.clone()), attribute_to_yaml(v)))
                .collect(),
        ),
    }
}

pub fn instance_to_yaml(instance: &ResourceInstance) -> Value {
    let mut map = Mapping::new();
    if !instance.parent().is_empty() {
        map.insert(PARENT.into(), Value::String(instance.parent().to_string()));
    }
    resource_to_yaml(map, instance)
}

fn resource_to_yaml(mut map: Mapping, instance: &ResourceInstance) -> Value {
    map.insert(ELEMENT.into(), Value::String(instance.element().to_string()));

    if !instance.attributes().is_empty() {
        let attributes: Mapping = instance
            .attributes()
            .iter()
            .map(|(name, value)| (Value::String(name.clone()), attribute_to_yaml(value)))
            .collect();
        map.insert(ATTRIBUTES.into(), Value::Mapping(attributes));
    }

    if !instance.children().is_empty() {
        let children = instance
            .children()
            .iter()
            .map(|child| resource_to_yaml(Mapping::new(), child))
            .collect();
        map.insert(CHILDREN.into(), Value::Sequence(children));
    }

    Value::Mapping(map)
}

pub fn render_instance(instance: &ResourceInstance) -> Result<String, DocumentError> {
    Ok(serde_yaml::to_string(&instance_to_yaml(instance))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE: &str = r#"
element: subsystem=cluster-transport
attributes:
  default-stack: udp
children:
  - element: stack=udp
    children:
      - element: transport=TRANSPORT
        attributes:
          type: UDP
          shared: ${cluster.shared:false}
          properties:
            enable_bundling: "true"
            oob_thread_pool.max_threads: ${oob.max:200}
          ports: [7600, 7601]
"#;

    #[test]
    fn test_expression_detection() {
        assert!(is_expression("${jboss.bind.address}"));
        assert!(is_expression("prefix-${x:1}"));
        assert!(!is_expression("$HOME"));
        assert!(!is_expression("plain"));
    }

    #[test]
    fn test_parse_instance() {
        let instance = parse_instance(TREE).unwrap();
        assert_eq!(instance.element(), &PathElement::literal("subsystem", "cluster-transport"));
        assert_eq!(instance.attribute("default-stack"), Some(&AttributeValue::constant("udp")));

        let transport = &instance.children()[0].children()[0];
        assert!(transport.attribute("shared").unwrap().is_expression());
        let properties = transport.attribute("properties").unwrap();
        assert!(!properties.is_expression());
        assert!(properties.contains_expression());
        assert!(matches!(transport.attribute("ports"), Some(AttributeValue::List(items)) if items.len() == 2));
    }

    #[test]
    fn test_render_preserves_tree() {
        let instance = parse_instance(TREE).unwrap();
        let rendered = render_instance(&instance).unwrap();
        assert_eq!(parse_instance(&rendered).unwrap(), instance);
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(parse_instance("element: stack=*"), Err(DocumentError::WildcardElement(_))));
        assert!(matches!(parse_instance("attributes: {}"), Err(DocumentError::Malformed(_))));
        assert!(matches!(parse_instance("element: stack"), Err(DocumentError::InvalidElement(_))));
        assert!(matches!(
            parse_instance("element: stack=udp\nchildren: {}"),
            Err(DocumentError::Malformed(_))
        ));
    }

    #[test]
    fn test_parent_address_round_trips() {
        let raw = "parent: /subsystem=cluster-transport/stack=udp\nelement: transport=TRANSPORT\nchildren:\n  - element: property=ip_ttl\n";
        let transport = parse_instance(raw).unwrap();
        assert_eq!(transport.path().to_string(), "/subsystem=cluster-transport/stack=udp/transport=TRANSPORT");
        assert_eq!(
            transport.children()[0].path().to_string(),
            "/subsystem=cluster-transport/stack=udp/transport=TRANSPORT/property=ip_ttl"
        );

        let rendered = render_instance(&transport).unwrap();
        assert_eq!(rendered.matches("parent:").count(), 1);
        assert_eq!(parse_instance(&rendered).unwrap(), transport);
        assert!(matches!(parse_instance("parent: [1]\nelement: stack=udp"), Err(DocumentError::Malformed(_))));
    }
}
