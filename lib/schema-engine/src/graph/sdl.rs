use graphql_parser::{
    schema::{
        self as ast, Definition, Directive, Document, TypeDefinition, TypeExtension, Value,
    },
    Pos,
};
use tracing::{instrument, trace};

use crate::error::{SchemaBuildError, SchemaBuildErrors};

use super::{
    ArgumentDescriptor, Deprecation, EnumTypeDescriptor, EnumValueDescriptor, FieldDescriptor,
    InputObjectTypeDescriptor, InterfaceTypeDescriptor, ObjectTypeDescriptor,
    ScalarTypeDescriptor, SchemaGraph, TypeDescriptor, TypeRefExt, UnionTypeDescriptor,
    BUILTIN_SCALARS,
};

const DEPRECATED_DIRECTIVE: &str = "deprecated";

pub fn parse_schema_document(
    source_name: &str,
    sdl: &str,
) -> Result<Document<'static, String>, SchemaBuildError> {
    ast::parse_schema::<String>(sdl)
        .map(|document| document.into_static())
        .map_err(|err| SchemaBuildError::Parse {
            source_name: source_name.to_string(),
            message: err.to_string(),
        })
}

impl SchemaGraph {
    /// Builds a graph from a schema document. Every field reads its value off the
    /// parent by name until a resolver is attached.
    pub fn from_sdl(source_name: &str, sdl: &str) -> Result<Self, SchemaBuildErrors> {
        let document = parse_schema_document(source_name, sdl)?;

        Self::from_document(&document)
    }

    #[instrument(level = "trace", skip_all)]
    pub fn from_document(document: &Document<'static, String>) -> Result<Self, SchemaBuildErrors> {
        let mut query_type = None;
        let mut mutation_type = None;

        for definition in &document.definitions {
            if let Definition::SchemaDefinition(schema) = definition {
                query_type = schema.query.clone();
                mutation_type = schema.mutation.clone();
            }
        }

        let mut graph = SchemaGraph::new(query_type.unwrap_or_else(|| "Query".to_string()));
        let mut errors = SchemaBuildErrors::default();

        for definition in &document.definitions {
            if let Definition::TypeDefinition(type_definition) = definition {
                let descriptor = type_from_definition(type_definition);
                if graph.contains_type(descriptor.name()) {
                    errors.push(SchemaBuildError::TypeCollision {
                        type_name: descriptor.name().to_string(),
                    });
                    continue;
                }
                trace!("declared type '{}'", descriptor.name());
                graph.insert_type(descriptor);
            }
        }

        for definition in &document.definitions {
            if let Definition::TypeExtension(extension) = definition {
                if let Err(err) = apply_extension(&mut graph, extension) {
                    errors.push(err);
                }
            }
        }

        match mutation_type {
            Some(name) => graph.set_mutation_type(name),
            None if graph.contains_type("Mutation") => graph.set_mutation_type("Mutation"),
            None => {}
        }

        errors.extend(unknown_type_references(&graph));
        errors.into_result(graph)
    }

    pub fn to_document(&self) -> Document<'static, String> {
        let mut definitions = Vec::with_capacity(self.len() + 1);

        let default_mutation = self.contains_type("Mutation").then_some("Mutation");
        if self.query_type() != "Query" || self.mutation_type() != default_mutation {
            definitions.push(Definition::SchemaDefinition(ast::SchemaDefinition {
                position: Pos::default(),
                directives: vec![],
                query: Some(self.query_type().to_string()),
                mutation: self.mutation_type().map(str::to_string),
                subscription: None,
            }));
        }

        definitions.extend(
            self.types()
                .filter(|t| !BUILTIN_SCALARS.contains(&t.name()))
                .map(|t| Definition::TypeDefinition(type_to_definition(t))),
        );

        Document { definitions }
    }

    pub fn to_sdl(&self) -> String {
        self.to_document().to_string()
    }
}

/// Types referenced by a field, argument or union member that the graph does not declare.
pub(crate) fn unknown_type_references(graph: &SchemaGraph) -> Vec<SchemaBuildError> {
    let known = |name: &str| BUILTIN_SCALARS.contains(&name) || graph.contains_type(name);
    let mut errors = Vec::new();

    for descriptor in graph.types() {
        if let Some(fields) = descriptor.fields() {
            for field in fields.values() {
                let referenced_by = format!("{}.{}", descriptor.name(), field.name);
                let mut references = vec![field.field_type.named_type()];
                references.extend(field.arguments.iter().map(|a| a.value_type.named_type()));

                errors.extend(references.into_iter().filter(|name| !known(name)).map(
                    |name| SchemaBuildError::UnknownType {
                        type_name: name.to_string(),
                        referenced_by: referenced_by.clone(),
                    },
                ));
            }
        }

        match descriptor {
            TypeDescriptor::Union(union) => {
                errors.extend(union.members.iter().filter(|m| !known(m)).map(|member| {
                    SchemaBuildError::UnknownType {
                        type_name: member.clone(),
                        referenced_by: union.name.clone(),
                    }
                }))
            }
            TypeDescriptor::InputObject(input) => {
                errors.extend(
                    input
                        .fields
                        .iter()
                        .filter(|f| !known(f.value_type.named_type()))
                        .map(|f| SchemaBuildError::UnknownType {
                            type_name: f.value_type.named_type().to_string(),
                            referenced_by: format!("{}.{}", input.name, f.name),
                        }),
                )
            }
            _ => {}
        }
    }

    errors
}

fn apply_extension(
    graph: &mut SchemaGraph,
    extension: &TypeExtension<'static, String>,
) -> Result<(), SchemaBuildError> {
    let no_fields: &[ast::Field<'static, String>] = &[];
    let no_names: &[String] = &[];

    let (type_name, fields, interfaces, members) = match extension {
        TypeExtension::Object(ext) => (&ext.name, &ext.fields[..], &ext.implements_interfaces[..], no_names),
        TypeExtension::Interface(ext) => {
            (&ext.name, &ext.fields[..], &ext.implements_interfaces[..], no_names)
        }
        TypeExtension::Union(ext) => (&ext.name, no_fields, no_names, &ext.types[..]),
        // Extending leaf and input types adds nothing selectable.
        _ => return Ok(()),
    };

    let Some(existing) = graph.type_by_name(type_name) else {
        return Err(SchemaBuildError::UnknownExtensionTarget {
            type_name: type_name.clone(),
        });
    };

    let mut extended = existing.clone();
    match &mut extended {
        TypeDescriptor::Object(ObjectTypeDescriptor {
            interfaces: declared,
            fields: field_map,
            ..
        })
        | TypeDescriptor::Interface(InterfaceTypeDescriptor {
            interfaces: declared,
            fields: field_map,
            ..
        }) => {
            for field in fields {
                if field_map.contains_key(&field.name) {
                    return Err(SchemaBuildError::DuplicateField {
                        type_name: type_name.clone(),
                        field: field.name.clone(),
                    });
                }
                field_map.insert(field.name.clone(), field_from_ast(field));
            }
            declared.extend(interfaces.iter().cloned());
        }
        TypeDescriptor::Union(union) => union.members.extend(members.iter().cloned()),
        _ => {}
    }

    graph.insert_type(extended);
    Ok(())
}

fn deprecation_of(directives: &[Directive<'static, String>]) -> Option<Deprecation> {
    directives
        .iter()
        .find(|d| d.name == DEPRECATED_DIRECTIVE)
        .map(|d| Deprecation {
            reason: d.arguments.iter().find_map(|(name, value)| match value {
                Value::String(reason) if name == "reason" => Some(reason.clone()),
                _ => None,
            }),
        })
}

fn deprecation_to_directives(deprecation: &Option<Deprecation>) -> Vec<Directive<'static, String>> {
    deprecation
        .iter()
        .map(|deprecation| Directive {
            position: Pos::default(),
            name: DEPRECATED_DIRECTIVE.to_string(),
            arguments: deprecation
                .reason
                .iter()
                .map(|reason| ("reason".to_string(), Value::String(reason.clone())))
                .collect(),
        })
        .collect()
}

fn argument_from_ast(input: &ast::InputValue<'static, String>) -> ArgumentDescriptor {
    ArgumentDescriptor {
        name: input.name.clone(),
        description: input.description.clone(),
        value_type: input.value_type.clone(),
        default_value: input.default_value.clone(),
    }
}

fn argument_to_ast(argument: &ArgumentDescriptor) -> ast::InputValue<'static, String> {
    ast::InputValue {
        position: Pos::default(),
        description: argument.description.clone(),
        name: argument.name.clone(),
        value_type: argument.value_type.clone(),
        default_value: argument.default_value.clone(),
        directives: vec![],
    }
}

pub(crate) fn field_from_ast(field: &ast::Field<'static, String>) -> FieldDescriptor {
    let mut descriptor = FieldDescriptor::new(field.name.clone(), field.field_type.clone());
    descriptor.description = field.description.clone();
    descriptor.arguments = field.arguments.iter().map(argument_from_ast).collect();
    descriptor.deprecation = deprecation_of(&field.directives);
    descriptor
}

fn field_to_ast(field: &FieldDescriptor) -> ast::Field<'static, String> {
    ast::Field {
        position: Pos::default(),
        description: field.description.clone(),
        name: field.name.clone(),
        arguments: field.arguments.iter().map(argument_to_ast).collect(),
        field_type: field.field_type.clone(),
        directives: deprecation_to_directives(&field.deprecation),
    }
}

pub(crate) fn type_from_definition(definition: &TypeDefinition<'static, String>) -> TypeDescriptor {
    match definition {
        TypeDefinition::Object(object) => TypeDescriptor::Object(ObjectTypeDescriptor {
            name: object.name.clone(),
            description: object.description.clone(),
            interfaces: object.implements_interfaces.clone(),
            fields: object
                .fields
                .iter()
                .map(|f| (f.name.clone(), field_from_ast(f)))
                .collect(),
        }),
        TypeDefinition::Interface(interface) => {
            let mut descriptor = InterfaceTypeDescriptor::new(interface.name.clone());
            descriptor.description = interface.description.clone();
            descriptor.interfaces = interface.implements_interfaces.clone();
            descriptor.fields = interface
                .fields
                .iter()
                .map(|f| (f.name.clone(), field_from_ast(f)))
                .collect();
            TypeDescriptor::Interface(descriptor)
        }
        TypeDefinition::Union(union) => {
            let mut descriptor = UnionTypeDescriptor::new(union.name.clone(), union.types.clone());
            descriptor.description = union.description.clone();
            TypeDescriptor::Union(descriptor)
        }
        TypeDefinition::Scalar(scalar) => TypeDescriptor::Scalar(ScalarTypeDescriptor {
            name: scalar.name.clone(),
            description: scalar.description.clone(),
        }),
        TypeDefinition::Enum(enum_type) => TypeDescriptor::Enum(EnumTypeDescriptor {
            name: enum_type.name.clone(),
            description: enum_type.description.clone(),
            values: enum_type
                .values
                .iter()
                .map(|v| EnumValueDescriptor {
                    name: v.name.clone(),
                    description: v.description.clone(),
                    deprecation: deprecation_of(&v.directives),
                })
                .collect(),
        }),
        TypeDefinition::InputObject(input) => {
            TypeDescriptor::InputObject(InputObjectTypeDescriptor {
                name: input.name.clone(),
                description: input.description.clone(),
                fields: input.fields.iter().map(argument_from_ast).collect(),
            })
        }
    }
}

fn type_to_definition(descriptor: &TypeDescriptor) -> TypeDefinition<'static, String> {
    match descriptor {
        TypeDescriptor::Object(object) => TypeDefinition::Object(ast::ObjectType {
            position: Pos::default(),
            description: object.description.clone(),
            name: object.name.clone(),
            implements_interfaces: object.interfaces.clone(),
            directives: vec![],
            fields: object.fields.values().map(field_to_ast).collect(),
        }),
        TypeDescriptor::Interface(interface) => TypeDefinition::Interface(ast::InterfaceType {
            position: Pos::default(),
            description: interface.description.clone(),
            name: interface.name.clone(),
            implements_interfaces: interface.interfaces.clone(),
            directives: vec![],
            fields: interface.fields.values().map(field_to_ast).collect(),
        }),
        TypeDescriptor::Union(union) => TypeDefinition::Union(ast::UnionType {
            position: Pos::default(),
            description: union.description.clone(),
            name: union.name.clone(),
            directives: vec![],
            types: union.members.clone(),
        }),
        TypeDescriptor::Scalar(scalar) => TypeDefinition::Scalar(ast::ScalarType {
            position: Pos::default(),
            description: scalar.description.clone(),
            name: scalar.name.clone(),
            directives: vec![],
        }),
        TypeDescriptor::Enum(enum_type) => TypeDefinition::Enum(ast::EnumType {
            position: Pos::default(),
            description: enum_type.description.clone(),
            name: enum_type.name.clone(),
            directives: vec![],
            values: enum_type
                .values
                .iter()
                .map(|v| ast::EnumValue {
                    position: Pos::default(),
                    description: v.description.clone(),
                    name: v.name.clone(),
                    directives: deprecation_to_directives(&v.deprecation),
                })
                .collect(),
        }),
        TypeDescriptor::InputObject(input) => TypeDefinition::InputObject(ast::InputObjectType {
            position: Pos::default(),
            description: input.description.clone(),
            name: input.name.clone(),
            directives: vec![],
            fields: input.fields.iter().map(argument_to_ast).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use crate::{error::SchemaBuildError, graph::SchemaGraph};

    #[test]
    fn reads_and_prints_a_schema() {
        let graph = SchemaGraph::from_sdl(
            "local",
            r#"
            type Query {
              order(id: ID!): Order
            }

            type Order {
              "A type-specific ID likely used as a database ID."
              id: ID!
              code: String @deprecated(reason: "Use number")
              lines: [OrderLine!]!
            }

            type OrderLine {
              quantity: Int
            }

            extend type Order {
              state: String
            }
            "#,
        )
        .expect("valid schema");

        let order = graph.type_by_name("Order").expect("Order is declared");
        let fields = order.fields().expect("objects have fields");
        assert_eq!(
            fields.keys().collect::<Vec<_>>(),
            vec!["id", "code", "lines", "state"]
        );
        assert!(fields["code"].is_deprecated());
        assert_eq!(graph.mutation_type(), None);

        let printed = graph.to_sdl();
        assert!(printed.contains("code: String @deprecated(reason: \"Use number\")"));
        assert!(printed.contains("lines: [OrderLine!]!"));
        assert!(!printed.contains("schema {"));

        let reparsed = SchemaGraph::from_sdl("printed", &printed).expect("printed schema is valid");
        assert_eq!(
            reparsed.type_names().collect::<Vec<_>>(),
            graph.type_names().collect::<Vec<_>>()
        );
    }

    #[test]
    fn reports_every_unknown_reference() {
        let errors = SchemaGraph::from_sdl(
            "local",
            r#"
            type Query {
              a: Missing
              b(input: AlsoMissing): String
            }

            extend type Nowhere {
              c: String
            }
            "#,
        )
        .expect_err("unknown types are rejected");

        assert_eq!(
            errors.0,
            vec![
                SchemaBuildError::UnknownExtensionTarget {
                    type_name: "Nowhere".to_string()
                },
                SchemaBuildError::UnknownType {
                    type_name: "Missing".to_string(),
                    referenced_by: "Query.a".to_string()
                },
                SchemaBuildError::UnknownType {
                    type_name: "AlsoMissing".to_string(),
                    referenced_by: "Query.b".to_string()
                },
            ]
        );
    }
}
