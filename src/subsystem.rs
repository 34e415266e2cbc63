//! The built-in `cluster-transport` subsystem: its current resource schema and
//! the transformations down to the model versions older peers understand.

use thiserror::Error;

use crate::{
    resource_path::PathElement,
    resource_schema::ResourceSchema,
    schema_version::SchemaVersion,
    transformation_builder::{BuildError, TransformationBuilder},
    transformation_registry::{RegistryBuilder, RegistryError},
};

pub const SUBSYSTEM_NAME: &str = "cluster-transport";

/// Management API version; independent of any wire or file format version.
pub const CURRENT_VERSION: SchemaVersion = SchemaVersion::new(3, 0, 0);

pub const VERSION_1_1_0: SchemaVersion = SchemaVersion::new(1, 1, 0);
pub const VERSION_1_2_0: SchemaVersion = SchemaVersion::new(1, 2, 0);

pub const DEFAULT_STACK: &str = "default-stack";
pub const TYPE: &str = "type";
pub const SOCKET_BINDING: &str = "socket-binding";
pub const SHARED: &str = "shared";
pub const PROPERTIES: &str = "properties";
pub const VALUE: &str = "value";
pub const SITE: &str = "site";
pub const STACK: &str = "stack";
pub const CLUSTER: &str = "cluster";

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub fn subsystem_path() -> PathElement {
    PathElement::literal("subsystem", SUBSYSTEM_NAME)
}

pub fn stack_path() -> PathElement {
    PathElement::wildcard("stack")
}

pub fn transport_path() -> PathElement {
    PathElement::literal("transport", "TRANSPORT")
}

pub fn protocol_path() -> PathElement {
    PathElement::wildcard("protocol")
}

pub fn property_path() -> PathElement {
    PathElement::wildcard("property")
}

pub fn relay_path() -> PathElement {
    PathElement::literal("relay", "RELAY")
}

pub fn remote_site_path() -> PathElement {
    PathElement::wildcard("remote-site")
}

fn property_schema() -> ResourceSchema {
    ResourceSchema::new(property_path()).with_attribute(VALUE, true)
}

/// Current schema of the subsystem
pub fn resource_schema() -> ResourceSchema {
    let transport = ResourceSchema::new(transport_path())
        .with_attribute(TYPE, false)
        .with_attribute(SOCKET_BINDING, false)
        .with_attribute(SHARED, true)
        .with_attribute(PROPERTIES, true)
        .with_child(property_schema());

    let protocol = ResourceSchema::new(protocol_path())
        .with_attribute(TYPE, false)
        .with_attribute(SOCKET_BINDING, false)
        .with_attribute(PROPERTIES, true)
        .with_child(property_schema());

    let relay = ResourceSchema::new(relay_path())
        .with_attribute(SITE, false)
        .with_child(
            ResourceSchema::new(remote_site_path())
                .with_attribute(STACK, false)
                .with_attribute(CLUSTER, false),
        );

    ResourceSchema::new(subsystem_path())
        .with_attribute(DEFAULT_STACK, false)
        .with_child(
            ResourceSchema::new(stack_path())
                .with_child(transport)
                .with_child(protocol)
                .with_child(relay),
        )
}

/// Registers the subsystem and its transformers; returns the schema they were built against.
pub fn initialize(registry: &mut RegistryBuilder) -> Result<ResourceSchema, RegistrationError> {
    let schema = resource_schema();
    registry.register_subsystem(SUBSYSTEM_NAME, CURRENT_VERSION)?;
    register_transformers(registry, &schema)?;
    Ok(schema)
}

fn register_transformers(registry: &mut RegistryBuilder, schema: &ResourceSchema) -> Result<(), RegistrationError> {
    register_transformers_1_1_0(registry, schema)?;
    register_transformers_1_2_0(registry, schema)?;
    Ok(())
}

fn register_transformers_1_1_0(registry: &mut RegistryBuilder, schema: &ResourceSchema) -> Result<(), RegistrationError> {
    let mut subsystem = TransformationBuilder::for_subsystem(SUBSYSTEM_NAME, schema);
    let stack = subsystem.add_child_resource(stack_path())?;

    // 1.1.0 cannot resolve expressions in transport and protocol settings
    let transport = stack.add_child_resource(transport_path())?;
    transport.reject_expressions(&[SHARED, PROPERTIES])?;
    transport
        .add_child_resource(property_path())?
        .reject_expressions(&[VALUE])?;

    let protocol = stack.add_child_resource(protocol_path())?;
    protocol.reject_expressions(&[PROPERTIES])?;
    protocol
        .add_child_resource(property_path())?
        .reject_expressions(&[VALUE])?;

    stack.reject_child_resource(relay_path())?;

    registry.register(SUBSYSTEM_NAME, VERSION_1_1_0, subsystem.build())?;
    Ok(())
}

fn register_transformers_1_2_0(registry: &mut RegistryBuilder, schema: &ResourceSchema) -> Result<(), RegistrationError> {
    let mut subsystem = TransformationBuilder::for_subsystem(SUBSYSTEM_NAME, schema);
    subsystem
        .add_child_resource(stack_path())?
        .reject_child_resource(relay_path())?;

    registry.register(SUBSYSTEM_NAME, VERSION_1_2_0, subsystem.build())?;
    Ok(())
}
