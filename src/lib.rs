// Versioned resource-tree transformation for legacy management peers
pub mod schema_version;
pub mod resource_path;
pub mod resource_schema;
pub mod resource_instance;
pub mod transformation_rule;
pub mod transformation_builder;
pub mod transformation_registry;
pub mod transformation_engine;
pub mod validation;
pub mod reporter;
pub mod document;
pub mod descriptor;
pub mod subsystem;
pub mod injection;

// Re-export core types for convenience
pub use schema_version::SchemaVersion;
pub use resource_path::{matches, PathElement, ResourcePath, Segment};
pub use resource_schema::{AttributeDescriptor, ResourceSchema};
pub use resource_instance::{AttributeValue, ResourceInstance};
pub use transformation_rule::{AppliedTransformation, AttributeRule, ChildRule, RuleNode, VersionedRuleSet};
pub use transformation_builder::{BuildError, TransformationBuilder};
pub use transformation_registry::{RegistryBuilder, RegistryError, TransformationRegistry};
pub use transformation_engine::{
    diagnose, transform, transform_with_report, TransformFailure, TransformationEngine, TransformationResult,
};
pub use validation::{validate_instance, ValidationReport};
pub use reporter::{ReportFormat, TransformationReport, TransformationReporter};
pub use descriptor::SubsystemDescriptor;
pub use injection::{Injector, InjectionError};
