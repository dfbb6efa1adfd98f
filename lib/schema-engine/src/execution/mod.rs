//! A small executor resolving query documents against a [`SchemaGraph`].
//!
//! It walks the public document with the resolvers attached to the public schema,
//! so renamed fields read their original names and delegated fields call their
//! remote schemas.

pub mod collect;
pub mod error;

use std::sync::{Mutex, PoisonError};

use futures::{
    future::{join_all, BoxFuture},
    FutureExt,
};
use graphql_parser::query::{Definition, Field, OperationDefinition, VariableDefinition};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::{
    error::ResolverError,
    graph::{
        FieldDescriptor, FragmentMap, ResolveInfo, ResolverContext, SchemaGraph, TypeDescriptor,
        TypeRef, TYPENAME_FIELD,
    },
    rewrite::{QueryDocument, QuerySelectionSet, RewritePlan},
    values::value_from_ast,
};

use collect::{collect_fields, GroupedFields};
pub use error::{ExecutionError, GraphQLError, PathSegment};

#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub document: QueryDocument,
    pub operation_name: Option<String>,
    pub variables: Map<String, Value>,
    /// The value root fields are resolved on.
    pub root_value: Value,
}

impl ExecutionRequest {
    pub fn new(document: QueryDocument) -> Self {
        Self {
            document,
            operation_name: None,
            variables: Map::new(),
            root_value: Value::Object(Map::new()),
        }
    }

    pub fn with_root_value(mut self, root_value: Value) -> Self {
        self.root_value = root_value;
        self
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResponse {
    pub data: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
}

/// A null in a non-null position, to be propagated to the nearest nullable parent.
struct NullPropagation;

type Completed = Result<Value, NullPropagation>;

struct ExecutionContext<'a> {
    schema: &'a SchemaGraph,
    rewrites: &'a RewritePlan,
    fragments: &'a FragmentMap,
    variables: &'a Map<String, Value>,
    errors: Mutex<Vec<GraphQLError>>,
}

#[instrument(level = "trace", skip_all)]
pub async fn execute(
    schema: &SchemaGraph,
    rewrites: &RewritePlan,
    request: ExecutionRequest,
) -> Result<ExecutionResponse, ExecutionError> {
    let ExecutionRequest {
        document,
        operation_name,
        variables,
        root_value,
    } = request;

    let operation = select_operation(&document, operation_name.as_deref())?;
    let (root_type, selection_set, serial) = match operation {
        OperationDefinition::SelectionSet(set) => (schema.query_type(), set, false),
        OperationDefinition::Query(query) => (schema.query_type(), &query.selection_set, false),
        OperationDefinition::Mutation(mutation) => (
            schema.mutation_type().ok_or(ExecutionError::NoMutationType)?,
            &mutation.selection_set,
            true,
        ),
        OperationDefinition::Subscription(_) => {
            return Err(ExecutionError::SubscriptionsNotSupported)
        }
    };

    let variables = with_variable_defaults(variable_definitions(operation), variables);
    let fragments: FragmentMap = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Fragment(fragment) => Some((fragment.name.clone(), fragment.clone())),
            _ => None,
        })
        .collect();

    let context = ExecutionContext {
        schema,
        rewrites,
        fragments: &fragments,
        variables: &variables,
        errors: Mutex::new(Vec::new()),
    };

    let fields = collect_fields(schema, &fragments, &variables, root_type, &[selection_set]);
    let data = context
        .execute_fields(root_type, &root_value, fields, Vec::new(), serial)
        .await
        .unwrap_or(Value::Null);

    let errors = context
        .errors
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    debug!("executed operation with {} error(s)", errors.len());

    Ok(ExecutionResponse { data, errors })
}

fn select_operation<'d>(
    document: &'d QueryDocument,
    operation_name: Option<&str>,
) -> Result<&'d OperationDefinition<'static, String>, ExecutionError> {
    let mut operations = document.definitions.iter().filter_map(|definition| match definition {
        Definition::Operation(operation) => Some(operation),
        Definition::Fragment(_) => None,
    });

    match operation_name {
        Some(name) => operations
            .find(|operation| name_of(operation) == Some(name))
            .ok_or_else(|| ExecutionError::UnknownOperation(name.to_string())),
        None => {
            let first = operations.next().ok_or(ExecutionError::NoOperation)?;
            match operations.next() {
                Some(_) => Err(ExecutionError::OperationNameRequired),
                None => Ok(first),
            }
        }
    }
}

fn name_of<'d>(operation: &'d OperationDefinition<'static, String>) -> Option<&'d str> {
    match operation {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(query) => query.name.as_deref(),
        OperationDefinition::Mutation(mutation) => mutation.name.as_deref(),
        OperationDefinition::Subscription(subscription) => subscription.name.as_deref(),
    }
}

fn variable_definitions<'d>(
    operation: &'d OperationDefinition<'static, String>,
) -> &'d [VariableDefinition<'static, String>] {
    match operation {
        OperationDefinition::SelectionSet(_) => &[],
        OperationDefinition::Query(query) => &query.variable_definitions,
        OperationDefinition::Mutation(mutation) => &mutation.variable_definitions,
        OperationDefinition::Subscription(subscription) => &subscription.variable_definitions,
    }
}

fn with_variable_defaults(
    definitions: &[VariableDefinition<'static, String>],
    mut variables: Map<String, Value>,
) -> Map<String, Value> {
    let no_variables = Map::new();

    for definition in definitions {
        if variables.contains_key(&definition.name) {
            continue;
        }

        if let Some(default) = &definition.default_value {
            variables.insert(definition.name.clone(), value_from_ast(default, &no_variables));
        }
    }

    variables
}

/// Argument values of one field selection, with defaults applied.
fn coerce_arguments(
    descriptor: &FieldDescriptor,
    field: &Field<'static, String>,
    variables: &Map<String, Value>,
) -> Result<Map<String, Value>, ResolverError> {
    let no_variables = Map::new();
    let mut args = Map::new();

    for (name, _) in &field.arguments {
        if descriptor.argument(name).is_none() {
            return Err(ResolverError::InvalidArguments {
                field: descriptor.name.clone(),
                message: format!("unknown argument '{}'", name),
            });
        }
    }

    for argument in &descriptor.arguments {
        let provided = field
            .arguments
            .iter()
            .find(|(name, _)| name == &argument.name)
            .map(|(_, value)| value_from_ast(value, variables));

        match provided.or_else(|| {
            argument
                .default_value
                .as_ref()
                .map(|default| value_from_ast(default, &no_variables))
        }) {
            Some(value) => {
                args.insert(argument.name.clone(), value);
            }
            None if matches!(argument.value_type, TypeRef::NonNullType(_)) => {
                return Err(ResolverError::InvalidArguments {
                    field: descriptor.name.clone(),
                    message: format!("missing required argument '{}'", argument.name),
                });
            }
            None => {}
        }
    }

    Ok(args)
}

impl<'a> ExecutionContext<'a> {
    fn report(&self, message: impl Into<String>, path: &[PathSegment]) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(GraphQLError::new(message, path.to_vec()));
    }

    fn execute_fields<'b>(
        &'b self,
        object_type: &'b str,
        parent: &'b Value,
        fields: GroupedFields<'a>,
        path: Vec<PathSegment>,
        serial: bool,
    ) -> BoxFuture<'b, Completed>
    where
        'a: 'b,
    {
        async move {
            let mut keys = Vec::with_capacity(fields.len());
            let mut pending = Vec::with_capacity(fields.len());

            for (key, nodes) in fields {
                let mut field_path = path.clone();
                field_path.push(PathSegment::Key(key.clone()));
                pending.push(self.execute_field(object_type, parent, key.clone(), nodes, field_path));
                keys.push(key);
            }

            let results = if serial {
                let mut results = Vec::with_capacity(pending.len());
                for future in pending {
                    results.push(future.await);
                }
                results
            } else {
                join_all(pending).await
            };

            let mut object = Map::new();
            for (key, result) in keys.into_iter().zip(results) {
                object.insert(key, result?);
            }

            Ok(Value::Object(object))
        }
        .boxed()
    }

    fn execute_field<'b>(
        &'b self,
        object_type: &'b str,
        parent: &'b Value,
        response_key: String,
        nodes: Vec<&'a Field<'static, String>>,
        path: Vec<PathSegment>,
    ) -> BoxFuture<'b, Completed>
    where
        'a: 'b,
    {
        async move {
            let Some(first) = nodes.first() else {
                return Ok(Value::Null);
            };

            if first.name == TYPENAME_FIELD {
                return Ok(Value::String(object_type.to_string()));
            }

            let Some(descriptor) = self.schema.field(object_type, &first.name) else {
                self.report(
                    format!("Cannot query field '{}' on type '{}'", first.name, object_type),
                    &path,
                );
                return Ok(Value::Null);
            };

            let resolved = match coerce_arguments(descriptor, first, self.variables) {
                Ok(args) => {
                    let info = ResolveInfo {
                        field_name: &first.name,
                        response_key: &response_key,
                        parent_type: object_type,
                        return_type: &descriptor.field_type,
                        field_nodes: &nodes,
                        fragments: self.fragments,
                        variables: self.variables,
                        schema: self.schema,
                        rewrites: self.rewrites,
                    };

                    descriptor
                        .resolver
                        .resolve(ResolverContext {
                            parent,
                            args: &args,
                            info: &info,
                        })
                        .await
                }
                Err(err) => Err(err),
            };

            match resolved {
                Ok(value) => {
                    self.complete_value(&descriptor.field_type, &nodes, value, path)
                        .await
                }
                Err(err) => {
                    self.report(err.to_string(), &path);
                    match descriptor.field_type {
                        TypeRef::NonNullType(_) => Err(NullPropagation),
                        _ => Ok(Value::Null),
                    }
                }
            }
        }
        .boxed()
    }

    /// Completes a value in a position of type `field_type`. Nulls propagating from
    /// below stop at the first nullable position.
    fn complete_value<'b>(
        &'b self,
        field_type: &'b TypeRef,
        nodes: &'b [&'a Field<'static, String>],
        value: Value,
        path: Vec<PathSegment>,
    ) -> BoxFuture<'b, Completed>
    where
        'a: 'b,
    {
        async move {
            match field_type {
                TypeRef::NonNullType(inner) => {
                    let completed = self.complete_inner(inner, nodes, value, &path).await?;
                    if completed.is_null() {
                        self.report("Cannot return null for non-nullable field", &path);
                        return Err(NullPropagation);
                    }
                    Ok(completed)
                }
                nullable => Ok(self
                    .complete_inner(nullable, nodes, value, &path)
                    .await
                    .unwrap_or(Value::Null)),
            }
        }
        .boxed()
    }

    async fn complete_inner(
        &self,
        field_type: &TypeRef,
        nodes: &[&'a Field<'static, String>],
        value: Value,
        path: &[PathSegment],
    ) -> Completed {
        if value.is_null() {
            return Ok(Value::Null);
        }

        match field_type {
            TypeRef::ListType(item_type) => {
                let Value::Array(items) = value else {
                    self.report("Expected a list value", path);
                    return Err(NullPropagation);
                };

                let completed = join_all(items.into_iter().enumerate().map(|(index, item)| {
                    let mut item_path = path.to_vec();
                    item_path.push(PathSegment::Index(index));
                    self.complete_value(item_type, nodes, item, item_path)
                }))
                .await;

                completed
                    .into_iter()
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            TypeRef::NamedType(type_name) => {
                self.complete_named(type_name, nodes, value, path).await
            }
            TypeRef::NonNullType(inner) => {
                self.complete_value(inner, nodes, value, path.to_vec()).await
            }
        }
    }

    /// Leaves pass through. Objects are resolved on their concrete type.
    async fn complete_named(
        &self,
        type_name: &str,
        nodes: &[&'a Field<'static, String>],
        value: Value,
        path: &[PathSegment],
    ) -> Completed {
        if self.schema.is_leaf_type(type_name) {
            return Ok(value);
        }

        let Some(descriptor) = self.schema.type_by_name(type_name) else {
            self.report(format!("Unknown type '{}'", type_name), path);
            return Err(NullPropagation);
        };

        let concrete = match descriptor {
            TypeDescriptor::Object(object) => object.name.clone(),
            TypeDescriptor::Interface(_) | TypeDescriptor::Union(_) => {
                let resolved = descriptor
                    .type_resolver()
                    .and_then(|resolver| resolver.resolve(&value))
                    .filter(|concrete| self.schema.is_possible_type(type_name, concrete));

                match resolved {
                    Some(concrete) => concrete,
                    None => {
                        self.report(
                            format!("Abstract type '{}' did not resolve to a possible type", type_name),
                            path,
                        );
                        return Err(NullPropagation);
                    }
                }
            }
            _ => {
                self.report(format!("'{}' is not an output type", type_name), path);
                return Err(NullPropagation);
            }
        };

        let selection_sets: Vec<&'a QuerySelectionSet> =
            nodes.iter().map(|field| &field.selection_set).collect();
        let fields = collect_fields(
            self.schema,
            self.fragments,
            self.variables,
            &concrete,
            &selection_sets,
        );

        self.execute_fields(&concrete, &value, fields, path.to_vec(), false)
            .await
    }
}
