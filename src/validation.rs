use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::{
    resource_instance::{AttributeValue, ResourceInstance},
    resource_path::ResourcePath,
    resource_schema::ResourceSchema,
};

/// Result of checking a resource tree against the current schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub path: ResourcePath,
    pub error_type: ValidationErrorType,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorType {
    RootMismatch,
    UnknownResource,
    UnknownAttribute,
    ExpressionNotAllowed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: ResourcePath,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: ResourcePath, error_type: ValidationErrorType, message: String) -> Self {
        Self {
            path,
            error_type,
            message,
        }
    }
}

/// Checks that every resource and attribute of `instance` is described by `schema`
/// and that expressions only appear where the schema allows them.
///
/// `instance` is checked against the schema node at its full address, so a
/// subtree placed below its parent validates like the same part of a whole tree.
pub fn validate_instance(schema: &ResourceSchema, instance: &ResourceInstance) -> ValidationReport {
    let mut report = ValidationReport::new();
    let path = instance.path();

    let Some(node) = schema.resolve(&path) else {
        report.add_error(ValidationError::new(
            path,
            ValidationErrorType::RootMismatch,
            format!("no resource at this address in the {} schema", schema.element()),
        ));
        return report;
    };

    validate_node(node, instance, &path, &mut report);
    report
}

fn validate_node(
    schema: &ResourceSchema,
    instance: &ResourceInstance,
    path: &ResourcePath,
    report: &mut ValidationReport,
) {
    for (name, value) in instance.attributes() {
        let Some(descriptor) = schema.attribute(name) else {
            report.add_error(ValidationError::new(
                path.clone(),
                ValidationErrorType::UnknownAttribute,
                format!("attribute '{}' is not defined", name),
            ));
            continue;
        };

        if value.contains_expression() && !descriptor.expressions_allowed {
            report.add_error(ValidationError::new(
                path.clone(),
                ValidationErrorType::ExpressionNotAllowed,
                format!("attribute '{}' does not support expressions", name),
            ));
        }

        if matches!(value, AttributeValue::Constant(Value::Null)) {
            report.add_warning(ValidationWarning {
                path: path.clone(),
                message: format!("attribute '{}' is present but undefined", name),
            });
        }
    }

    for child in instance.children() {
        let child_path = path.append(child.element().clone());
        match schema.child(child.element()) {
            Some(child_schema) => validate_node(child_schema, child, &child_path, report),
            None => report.add_error(ValidationError::new(
                child_path,
                ValidationErrorType::UnknownResource,
                format!("no resource type registered for {}", child.element()),
            )),
        }
    }
}
