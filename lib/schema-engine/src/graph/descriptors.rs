use std::{fmt, sync::Arc};

use graphql_parser::query::Value as AstValue;
use indexmap::IndexMap;
use serde_json::Value;

use super::{
    resolver::{FieldResolver, PropertyResolver},
    type_ref::TypeRef,
};

/// A literal value as written in a schema document (argument default values).
pub type ConstValue = AstValue<'static, String>;

pub type FieldMap = IndexMap<String, FieldDescriptor>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Object,
    Interface,
    Union,
    Scalar,
    Enum,
    InputObject,
}

#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    Object(ObjectTypeDescriptor),
    Interface(InterfaceTypeDescriptor),
    Union(UnionTypeDescriptor),
    Scalar(ScalarTypeDescriptor),
    Enum(EnumTypeDescriptor),
    InputObject(InputObjectTypeDescriptor),
}

impl TypeDescriptor {
    pub fn name(&self) -> &str {
        match self {
            TypeDescriptor::Object(t) => &t.name,
            TypeDescriptor::Interface(t) => &t.name,
            TypeDescriptor::Union(t) => &t.name,
            TypeDescriptor::Scalar(t) => &t.name,
            TypeDescriptor::Enum(t) => &t.name,
            TypeDescriptor::InputObject(t) => &t.name,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            TypeDescriptor::Object(t) => t.description.as_deref(),
            TypeDescriptor::Interface(t) => t.description.as_deref(),
            TypeDescriptor::Union(t) => t.description.as_deref(),
            TypeDescriptor::Scalar(t) => t.description.as_deref(),
            TypeDescriptor::Enum(t) => t.description.as_deref(),
            TypeDescriptor::InputObject(t) => t.description.as_deref(),
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            TypeDescriptor::Object(_) => TypeKind::Object,
            TypeDescriptor::Interface(_) => TypeKind::Interface,
            TypeDescriptor::Union(_) => TypeKind::Union,
            TypeDescriptor::Scalar(_) => TypeKind::Scalar,
            TypeDescriptor::Enum(_) => TypeKind::Enum,
            TypeDescriptor::InputObject(_) => TypeKind::InputObject,
        }
    }

    /// The selectable fields of object and interface types. Other kinds have none.
    pub fn fields(&self) -> Option<&FieldMap> {
        match self {
            TypeDescriptor::Object(t) => Some(&t.fields),
            TypeDescriptor::Interface(t) => Some(&t.fields),
            _ => None,
        }
    }

    pub fn fields_mut(&mut self) -> Option<&mut FieldMap> {
        match self {
            TypeDescriptor::Object(t) => Some(&mut t.fields),
            TypeDescriptor::Interface(t) => Some(&mut t.fields),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields().and_then(|fields| fields.get(name))
    }

    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Object(_) | TypeDescriptor::Interface(_) | TypeDescriptor::Union(_)
        )
    }

    pub fn is_abstract(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Interface(_) | TypeDescriptor::Union(_)
        )
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, TypeDescriptor::Scalar(_) | TypeDescriptor::Enum(_))
    }

    pub fn interfaces(&self) -> &[String] {
        match self {
            TypeDescriptor::Object(t) => &t.interfaces,
            TypeDescriptor::Interface(t) => &t.interfaces,
            _ => &[],
        }
    }

    pub fn type_resolver(&self) -> Option<&TypeResolver> {
        match self {
            TypeDescriptor::Interface(t) => Some(&t.resolve_type),
            TypeDescriptor::Union(t) => Some(&t.resolve_type),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectTypeDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: FieldMap,
}

impl ObjectTypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            interfaces: Vec::new(),
            fields: FieldMap::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn implementing(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct InterfaceTypeDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: FieldMap,
    pub resolve_type: TypeResolver,
}

impl InterfaceTypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            interfaces: Vec::new(),
            fields: FieldMap::new(),
            resolve_type: TypeResolver::default(),
        }
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }
}

#[derive(Debug, Clone)]
pub struct UnionTypeDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub members: Vec<String>,
    pub resolve_type: TypeResolver,
}

impl UnionTypeDescriptor {
    pub fn new(name: impl Into<String>, members: Vec<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            members,
            resolve_type: TypeResolver::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScalarTypeDescriptor {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EnumTypeDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<EnumValueDescriptor>,
}

#[derive(Debug, Clone)]
pub struct EnumValueDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub deprecation: Option<Deprecation>,
}

#[derive(Debug, Clone)]
pub struct InputObjectTypeDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<ArgumentDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deprecation {
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ArgumentDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub value_type: TypeRef,
    pub default_value: Option<ConstValue>,
}

impl ArgumentDescriptor {
    pub fn new(name: impl Into<String>, value_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            value_type,
            default_value: None,
        }
    }
}

#[derive(Clone)]
pub struct FieldDescriptor {
    pub name: String,
    /// Free-form description. Also used as a semantic tag for identifier fields.
    pub description: Option<String>,
    pub field_type: TypeRef,
    pub arguments: Vec<ArgumentDescriptor>,
    pub deprecation: Option<Deprecation>,
    pub resolver: Arc<dyn FieldResolver>,
}

impl FieldDescriptor {
    /// A field resolved by reading its own name off the parent value.
    pub fn new(name: impl Into<String>, field_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            field_type,
            arguments: Vec::new(),
            deprecation: None,
            resolver: Arc::new(PropertyResolver),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_argument(mut self, argument: ArgumentDescriptor) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn FieldResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn deprecated(mut self, reason: Option<&str>) -> Self {
        self.deprecation = Some(Deprecation {
            reason: reason.map(str::to_string),
        });
        self
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecation.is_some()
    }

    pub fn argument(&self, name: &str) -> Option<&ArgumentDescriptor> {
        self.arguments.iter().find(|arg| arg.name == name)
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("field_type", &self.field_type)
            .field("arguments", &self.arguments)
            .field("deprecation", &self.deprecation)
            .finish_non_exhaustive()
    }
}

type ResolveTypeFn = dyn Fn(&Value) -> Option<String> + Send + Sync;

/// Picks the concrete object type of a value returned for an abstract type.
///
/// The default implementation reads the `__typename` property of the value.
#[derive(Clone)]
pub struct TypeResolver(Arc<ResolveTypeFn>);

impl TypeResolver {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn resolve(&self, value: &Value) -> Option<String> {
        (self.0)(value)
    }
}

impl Default for TypeResolver {
    fn default() -> Self {
        Self::new(|value| {
            value
                .get("__typename")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
    }
}

impl fmt::Debug for TypeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TypeResolver")
    }
}
