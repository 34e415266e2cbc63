//! Declarative subsystem descriptors: a resource schema plus the rules for each
//! legacy version, loaded from YAML and registered like a built-in subsystem.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::{
    resource_path::{PathElement, ResourcePath},
    resource_schema::{AttributeDescriptor, ResourceSchema},
    schema_version::{SchemaVersion, SchemaVersionError},
    transformation_builder::{BuildError, TransformationBuilder},
    transformation_registry::{RegistryBuilder, RegistryError},
    transformation_rule::VersionedRuleSet,
};

const DESCRIPTOR_SCHEMA: &str = r##"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "type": "object",
  "required": ["subsystem", "current_version", "schema"],
  "additionalProperties": false,
  "properties": {
    "subsystem": { "type": "string", "minLength": 1 },
    "current_version": { "$ref": "#/definitions/version" },
    "schema": { "$ref": "#/definitions/node" },
    "transformers": {
      "type": "array",
      "items": {
        "type": "object",
        "required": ["version"],
        "additionalProperties": false,
        "properties": {
          "version": { "$ref": "#/definitions/version" },
          "rules": { "type": "array", "items": { "$ref": "#/definitions/rule" } }
        }
      }
    }
  },
  "definitions": {
    "version": { "type": "string", "pattern": "^[0-9]+\\.[0-9]+\\.[0-9]+$" },
    "element": { "type": "string", "pattern": "^[^=/]+=[^=/]+$" },
    "path": { "type": "string", "pattern": "^/?[^=/]+=[^=/]+(/[^=/]+=[^=/]+)*$" },
    "names": { "type": "array", "items": { "type": "string", "minLength": 1 } },
    "elements": { "type": "array", "items": { "$ref": "#/definitions/element" } },
    "node": {
      "type": "object",
      "required": ["element"],
      "additionalProperties": false,
      "properties": {
        "element": { "$ref": "#/definitions/element" },
        "attributes": {
          "type": "array",
          "items": {
            "type": "object",
            "required": ["name"],
            "additionalProperties": false,
            "properties": {
              "name": { "type": "string", "minLength": 1 },
              "expressions": { "type": "boolean" }
            }
          }
        },
        "children": { "type": "array", "items": { "$ref": "#/definitions/node" } }
      }
    },
    "rule": {
      "type": "object",
      "required": ["path"],
      "additionalProperties": false,
      "properties": {
        "path": { "$ref": "#/definitions/path" },
        "reject_expressions": { "$ref": "#/definitions/names" },
        "reject_nested_expressions": { "$ref": "#/definitions/names" },
        "reject_defined": { "$ref": "#/definitions/names" },
        "discard": { "$ref": "#/definitions/names" },
        "reject_children": { "$ref": "#/definitions/elements" },
        "discard_children": { "$ref": "#/definitions/elements" }
      }
    }
  }
}"##;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsystemDescriptor {
    pub subsystem: String,
    pub current_version: String,
    pub schema: SchemaNode,
    #[serde(default)]
    pub transformers: Vec<TransformerDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaNode {
    pub element: PathElement,
    #[serde(default)]
    pub attributes: Vec<AttributeNode>,
    #[serde(default)]
    pub children: Vec<SchemaNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeNode {
    pub name: String,
    #[serde(default)]
    pub expressions: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformerDescriptor {
    pub version: String,
    #[serde(default)]
    pub rules: Vec<RuleDescriptor>,
}

/// Rules attached to the schema node at `path`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDescriptor {
    pub path: ResourcePath,
    #[serde(default)]
    pub reject_expressions: Vec<String>,
    #[serde(default)]
    pub reject_nested_expressions: Vec<String>,
    #[serde(default)]
    pub reject_defined: Vec<String>,
    #[serde(default)]
    pub discard: Vec<String>,
    #[serde(default)]
    pub reject_children: Vec<PathElement>,
    #[serde(default)]
    pub discard_children: Vec<PathElement>,
}

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("Failed to read descriptor {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON conversion error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Descriptor schema could not be compiled: {0}")]
    InvalidSchema(String),

    #[error("Descriptor validation failed with {} error(s):\n{}", .0.len(), .0.join("\n"))]
    SchemaViolation(Vec<String>),

    #[error(transparent)]
    InvalidVersion(#[from] SchemaVersionError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl SubsystemDescriptor {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DescriptorError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| DescriptorError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Parses a descriptor, checking it against the descriptor JSON Schema first.
    pub fn from_yaml_str(raw: &str) -> Result<Self, DescriptorError> {
        let document: Value = serde_yaml::from_str(raw)?;
        validate_document(&document)?;
        Ok(serde_yaml::from_value(document)?)
    }

    pub fn current_version(&self) -> Result<SchemaVersion, DescriptorError> {
        Ok(self.current_version.parse()?)
    }

    pub fn resource_schema(&self) -> ResourceSchema {
        self.schema.to_resource_schema()
    }

    /// Compiles each transformer through the rule builder, oldest version first.
    pub fn rule_sets(&self, schema: &ResourceSchema) -> Result<Vec<(SchemaVersion, VersionedRuleSet)>, DescriptorError> {
        let mut compiled = Vec::with_capacity(self.transformers.len());
        for transformer in &self.transformers {
            let version: SchemaVersion = transformer.version.parse()?;
            let mut root = TransformationBuilder::for_subsystem(self.subsystem.as_str(), schema);
            for rule in &transformer.rules {
                apply_rule(&mut root, rule)?;
            }
            compiled.push((version, root.build()));
        }
        compiled.sort_by_key(|(version, _)| *version);
        Ok(compiled)
    }

    /// Registers the subsystem and all of its transformers.
    pub fn register(&self, registry: &mut RegistryBuilder) -> Result<ResourceSchema, DescriptorError> {
        let schema = self.resource_schema();
        registry.register_subsystem(self.subsystem.as_str(), self.current_version()?)?;
        for (version, rule_set) in self.rule_sets(&schema)? {
            registry.register(&self.subsystem, version, rule_set)?;
        }
        info!(subsystem = %self.subsystem, transformers = self.transformers.len(), "Loaded subsystem descriptor");
        Ok(schema)
    }
}

impl SchemaNode {
    fn to_resource_schema(&self) -> ResourceSchema {
        let mut schema = ResourceSchema::new(self.element.clone());
        for attribute in &self.attributes {
            schema.add_attribute(AttributeDescriptor::new(attribute.name.as_str(), attribute.expressions));
        }
        for child in &self.children {
            schema.add_child(child.to_resource_schema());
        }
        schema
    }
}

fn apply_rule(root: &mut TransformationBuilder<'_>, rule: &RuleDescriptor) -> Result<(), DescriptorError> {
    let (first, rest) = rule.path.elements().split_first().ok_or_else(|| BuildError::SchemaMismatch {
        path: rule.path.clone(),
        detail: "empty rule path".to_string(),
    })?;
    let root_element = root.address().elements()[0].clone();
    if *first != root_element {
        return Err(BuildError::SchemaMismatch {
            path: rule.path.clone(),
            detail: format!("rule path must start at {}", root_element),
        }
        .into());
    }

    let mut scope = root;
    for element in rest {
        scope = scope.add_child_resource(element.clone())?;
    }

    fn names(list: &[String]) -> Vec<&str> {
        list.iter().map(String::as_str).collect()
    }

    scope.reject_expressions(&names(&rule.reject_expressions))?;
    scope.reject_nested_expressions(&names(&rule.reject_nested_expressions))?;
    scope.reject_defined(&names(&rule.reject_defined))?;
    scope.discard_attributes(&names(&rule.discard))?;
    for element in &rule.reject_children {
        scope.reject_child_resource(element.clone())?;
    }
    for element in &rule.discard_children {
        scope.discard_child_resource(element.clone())?;
    }
    Ok(())
}

fn validate_document(document: &Value) -> Result<(), DescriptorError> {
    let schema_json: serde_json::Value = serde_json::from_str(DESCRIPTOR_SCHEMA)?;
    let instance_json = serde_json::to_value(document)?;

    let compiled_schema = jsonschema::JSONSchema::compile(&schema_json)
        .map_err(|e| DescriptorError::InvalidSchema(e.to_string()))?;

    if let Err(errors) = compiled_schema.validate(&instance_json) {
        let messages: Vec<String> = errors
            .map(|error| format!("  - {}: {}", error.instance_path, error))
            .collect();
        return Err(DescriptorError::SchemaViolation(messages));
    }
    Ok(())
}
