pub mod delegate;
pub mod merge;
pub mod selection;

use std::sync::Arc;

use async_trait::async_trait;
use gateway_config::remote::RemoteSchemaConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::{
    error::{ResolverError, SchemaBuildErrors},
    graph::{FieldDescriptor, FieldResolver, ResolverContext, SchemaGraph, TypeDescriptor},
    transform::{prefix_root_fields, prefix_types, RenameTable, TypeRenameTable},
};

pub use delegate::{
    ChainedDelegation, DelegatingResolver, DelegationDescriptor, OperationKind,
};
pub use merge::{merge, SchemaExtension};

/// A request sent to a remote schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RemoteError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
}

/// A GraphQL response of a remote schema.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RemoteResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RemoteError>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Sends sub-queries to a remote service. Caching, retries and timeouts belong to
/// the implementation.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn execute(&self, request: RemoteRequest) -> Result<RemoteResponse, TransportError>;
}

pub type RemoteExecutorArc = Arc<dyn RemoteExecutor>;

#[derive(Debug, Clone, Default)]
pub struct RemoteSchemaOptions {
    /// Prepended to every remote type name.
    pub type_prefix: String,
    /// Prepended to the remote root fields, when they are exposed.
    pub root_field_prefix: Option<String>,
    /// Whether the remote root fields are merged into the local root types.
    pub expose_root_fields: bool,
}

impl From<&RemoteSchemaConfig> for RemoteSchemaOptions {
    fn from(config: &RemoteSchemaConfig) -> Self {
        Self {
            type_prefix: config.type_prefix.clone(),
            root_field_prefix: config.root_field_prefix.clone(),
            expose_root_fields: config.expose_root_fields,
        }
    }
}

/// The parts of a remote schema a delegation needs at request time.
pub struct RemoteContext {
    pub name: String,
    pub executor: RemoteExecutorArc,
    /// The remote schema under its own names.
    pub original: SchemaGraph,
    pub type_renames: TypeRenameTable,
}

impl std::fmt::Debug for RemoteContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteContext")
            .field("name", &self.name)
            .field("type_renames", &self.type_renames)
            .finish_non_exhaustive()
    }
}

/// An executable proxy of a remote schema: its types under prefixed names, with root
/// fields that delegate to the remote service.
#[derive(Debug, Clone)]
pub struct RemoteSchema {
    context: Arc<RemoteContext>,
    graph: SchemaGraph,
    root_field_renames: RenameTable,
    options: RemoteSchemaOptions,
}

impl RemoteSchema {
    #[instrument(level = "trace", skip(sdl, executor, options))]
    pub fn from_sdl(
        name: &str,
        sdl: &str,
        executor: RemoteExecutorArc,
        options: RemoteSchemaOptions,
    ) -> Result<Self, SchemaBuildErrors> {
        let original = SchemaGraph::from_sdl(name, sdl)?;
        let renamed = prefix_types(&original, &options.type_prefix)?;
        debug!(
            "remote schema '{}' has {} type(s), {} renamed",
            name,
            original.len(),
            renamed.renames.len()
        );

        let context = Arc::new(RemoteContext {
            name: name.to_string(),
            executor,
            original,
            type_renames: renamed.renames,
        });

        let mut graph = attach_root_resolvers(attach_result_resolvers(renamed.graph), &context);
        let mut root_field_renames = RenameTable::default();

        if let Some(prefix) = options.root_field_prefix.as_deref() {
            let output = prefix_root_fields(&graph, prefix)?;
            graph = output.graph;
            root_field_renames = output.renames;
        }

        Ok(Self {
            context,
            graph,
            root_field_renames,
            options,
        })
    }

    pub fn name(&self) -> &str {
        &self.context.name
    }

    /// The remote schema under prefixed type names.
    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    pub fn context(&self) -> &Arc<RemoteContext> {
        &self.context
    }

    pub fn type_renames(&self) -> &TypeRenameTable {
        &self.context.type_renames
    }

    pub fn root_field_renames(&self) -> &RenameTable {
        &self.root_field_renames
    }

    pub fn options(&self) -> &RemoteSchemaOptions {
        &self.options
    }

    /// A delegation to one root field of this remote schema, by its remote name.
    pub fn delegate(&self, operation: OperationKind, field_name: &str) -> DelegationDescriptor {
        DelegationDescriptor::new(self.context.clone(), operation, field_name)
    }
}

/// Root fields of the remote schema resolve by delegating the selected field as is.
fn attach_root_resolvers(graph: SchemaGraph, context: &Arc<RemoteContext>) -> SchemaGraph {
    let roots = [
        (Some(graph.query_type().to_string()), OperationKind::Query),
        (graph.mutation_type().map(str::to_string), OperationKind::Mutation),
    ];

    let mut graph = graph;
    for (root, operation) in roots {
        let Some(descriptor) = root.and_then(|name| graph.type_by_name(&name).cloned()) else {
            continue;
        };

        let TypeDescriptor::Object(mut object) = descriptor else {
            continue;
        };

        for field in object.fields.values_mut() {
            let delegation = DelegationDescriptor::new(context.clone(), operation, &field.name);
            *field = FieldDescriptor {
                resolver: Arc::new(DelegatingResolver::new(delegation)),
                ..field.clone()
            };
        }

        graph.insert_type(TypeDescriptor::Object(object));
    }

    graph
}

/// Reads a field of a delegated result.
///
/// Delegated sub-queries keep the client's aliases, so the value is keyed by the alias
/// when there is one and by the remote field name otherwise.
pub struct DelegatedResultResolver;

#[async_trait]
impl FieldResolver for DelegatedResultResolver {
    async fn resolve(&self, ctx: ResolverContext<'_>) -> Result<Value, ResolverError> {
        let key = ctx.info.alias().unwrap_or(ctx.info.field_name);
        Ok(ctx.parent.get(key).cloned().unwrap_or(Value::Null))
    }
}

/// Fields of the remote types are only ever read off delegated results.
fn attach_result_resolvers(mut graph: SchemaGraph) -> SchemaGraph {
    let resolver: Arc<dyn FieldResolver> = Arc::new(DelegatedResultResolver);
    let composite: Vec<TypeDescriptor> = graph
        .types()
        .filter(|descriptor| descriptor.fields().is_some())
        .cloned()
        .collect();

    for mut descriptor in composite {
        if let Some(fields) = descriptor.fields_mut() {
            for field in fields.values_mut() {
                field.resolver = resolver.clone();
            }
        }
        graph.insert_type(descriptor);
    }

    graph
}
