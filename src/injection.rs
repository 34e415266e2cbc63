//! Assignment of a computed value onto a live object, either through a setter
//! or directly into a field.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InjectionError {
    #[error("Cannot inject a missing value into primitive member '{0}'")]
    NullPrimitive(String),
}

/// Assigns a value onto a target.
pub trait Injector<T, V> {
    fn inject(&self, target: &mut T, value: Option<V>) -> Result<(), InjectionError>;
}

/// Injects through a setter.
pub struct MethodInjector<T, V> {
    name: String,
    primitive: bool,
    setter: Box<dyn Fn(&mut T, Option<V>) + Send + Sync>,
}

/// Injects by writing an optional field in place.
pub struct FieldInjector<T, V> {
    name: String,
    primitive: bool,
    field: fn(&mut T) -> &mut Option<V>,
}

/// Either kind of injection, chosen when the target member is discovered
pub enum ResourceInjection<T, V> {
    Method(MethodInjector<T, V>),
    Field(FieldInjector<T, V>),
}

fn check_primitive<V>(name: &str, primitive: bool, value: &Option<V>) -> Result<(), InjectionError> {
    if primitive && value.is_none() {
        return Err(InjectionError::NullPrimitive(name.to_string()));
    }
    Ok(())
}

impl<T, V> MethodInjector<T, V> {
    pub fn new(
        name: impl Into<String>,
        primitive: bool,
        setter: impl Fn(&mut T, Option<V>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            primitive,
            setter: Box::new(setter),
        }
    }
}

impl<T, V> Injector<T, V> for MethodInjector<T, V> {
    fn inject(&self, target: &mut T, value: Option<V>) -> Result<(), InjectionError> {
        check_primitive(&self.name, self.primitive, &value)?;
        (self.setter)(target, value);
        Ok(())
    }
}

impl<T, V> FieldInjector<T, V> {
    pub fn new(name: impl Into<String>, primitive: bool, field: fn(&mut T) -> &mut Option<V>) -> Self {
        Self {
            name: name.into(),
            primitive,
            field,
        }
    }
}

impl<T, V> Injector<T, V> for FieldInjector<T, V> {
    fn inject(&self, target: &mut T, value: Option<V>) -> Result<(), InjectionError> {
        check_primitive(&self.name, self.primitive, &value)?;
        *(self.field)(target) = value;
        Ok(())
    }
}

impl<T, V> Injector<T, V> for ResourceInjection<T, V> {
    fn inject(&self, target: &mut T, value: Option<V>) -> Result<(), InjectionError> {
        match self {
            ResourceInjection::Method(injector) => injector.inject(target, value),
            ResourceInjection::Field(injector) => injector.inject(target, value),
        }
    }
}
