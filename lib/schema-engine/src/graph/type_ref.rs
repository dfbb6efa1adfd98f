use graphql_parser::schema::Type;

/// A reference to a type by name, possibly wrapped in list/non-null modifiers.
pub type TypeRef = Type<'static, String>;

pub static BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

pub fn named(name: impl Into<String>) -> TypeRef {
    Type::NamedType(name.into())
}

pub fn non_null(inner: TypeRef) -> TypeRef {
    Type::NonNullType(Box::new(inner))
}

pub fn list(inner: TypeRef) -> TypeRef {
    Type::ListType(Box::new(inner))
}

pub trait TypeRefExt {
    /// The innermost named type, with all modifiers stripped.
    fn named_type(&self) -> &str;

    fn is_non_null(&self) -> bool;

    /// Returns the same reference with the innermost name replaced, keeping every
    /// list/non-null modifier in place.
    fn with_named_type(&self, name: &str) -> TypeRef;
}

impl TypeRefExt for TypeRef {
    fn named_type(&self) -> &str {
        match self {
            Type::NamedType(name) => name.as_str(),
            Type::ListType(inner) => inner.named_type(),
            Type::NonNullType(inner) => inner.named_type(),
        }
    }

    fn is_non_null(&self) -> bool {
        matches!(self, Type::NonNullType(_))
    }

    fn with_named_type(&self, name: &str) -> TypeRef {
        match self {
            Type::NamedType(_) => Type::NamedType(name.to_string()),
            Type::ListType(inner) => Type::ListType(Box::new(inner.with_named_type(name))),
            Type::NonNullType(inner) => Type::NonNullType(Box::new(inner.with_named_type(name))),
        }
    }
}
