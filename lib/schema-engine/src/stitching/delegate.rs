use std::sync::Arc;

use async_trait::async_trait;
use graphql_parser::{
    query::{
        parse_query, Definition, Document, Field, Mutation, OperationDefinition, Query, Selection,
    },
    Pos,
};
use serde_json::{Map, Value};
use tracing::{debug, instrument, trace};

use crate::{
    error::{ResolverError, SchemaBuildError},
    graph::{FieldResolver, ResolverContext, TypeDescriptor, TypeRefExt},
    rewrite::QuerySelectionSet,
    values::value_to_ast,
};

use super::{
    selection::{
        empty_selection_set, inline_fragment_spreads, map_result_typenames,
        merge_field_selections, typename_field, RemoteSelection,
    },
    RemoteContext, RemoteRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    fn root_type<'a>(&self, context: &'a RemoteContext) -> Option<&'a str> {
        match self {
            OperationKind::Query => Some(context.original.query_type()),
            OperationKind::Mutation => context.original.mutation_type(),
        }
    }
}

type ArgsMapper =
    dyn Fn(&Value, &Map<String, Value>) -> Result<Map<String, Value>, ResolverError> + Send + Sync;
type ResultMapper = dyn Fn(Value) -> Value + Send + Sync;

/// A call of one remote root field, made on behalf of a local field.
///
/// Built once per delegated field when the schema is assembled, and invoked for
/// every request selecting that field.
#[derive(Clone)]
pub struct DelegationDescriptor {
    remote: Arc<RemoteContext>,
    operation: OperationKind,
    field_name: String,
    args: Option<Arc<ArgsMapper>>,
    result: Option<Arc<ResultMapper>>,
    selection: Option<QuerySelectionSet>,
}

impl std::fmt::Debug for DelegationDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegationDescriptor")
            .field("remote", &self.remote.name)
            .field("operation", &self.operation)
            .field("field_name", &self.field_name)
            .finish_non_exhaustive()
    }
}

impl DelegationDescriptor {
    pub fn new(remote: Arc<RemoteContext>, operation: OperationKind, field_name: &str) -> Self {
        Self {
            remote,
            operation,
            field_name: field_name.to_string(),
            args: None,
            result: None,
            selection: None,
        }
    }

    /// Derives the remote arguments from the parent value and the local arguments.
    /// Without a mapper, the local arguments are forwarded as they are.
    pub fn with_args<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&Value, &Map<String, Value>) -> Result<Map<String, Value>, ResolverError>
            + Send
            + Sync
            + 'static,
    {
        self.args = Some(Arc::new(mapper));
        self
    }

    /// Reshapes the remote root field's value into the local field's value.
    pub fn with_result<F>(mut self, mapper: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.result = Some(Arc::new(mapper));
        self
    }

    /// Selects a fixed selection set, written against the remote names, instead of the
    /// client's selection.
    pub fn with_selection(mut self, selection: &str) -> Result<Self, SchemaBuildError> {
        let document = parse_query::<String>(selection)
            .map_err(|err| SchemaBuildError::Parse {
                source_name: format!("{}.{}", self.remote.name, self.field_name),
                message: err.to_string(),
            })?
            .into_static();

        let selection_set = document.definitions.into_iter().find_map(|definition| match definition {
            Definition::Operation(OperationDefinition::SelectionSet(set)) => Some(set),
            _ => None,
        });

        self.selection = Some(selection_set.unwrap_or_else(empty_selection_set));
        Ok(self)
    }

    pub fn remote_name(&self) -> &str {
        &self.remote.name
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn operation(&self) -> OperationKind {
        self.operation
    }

    /// Runs the delegated call for one resolution of the local field.
    #[instrument(level = "trace", skip_all, fields(remote = %self.remote.name, field = %self.field_name))]
    pub async fn delegate(&self, ctx: ResolverContext<'_>) -> Result<Value, ResolverError> {
        self.call(ctx.parent, ctx, true).await
    }

    /// `parent` is the value the arguments are derived from. The client's selection
    /// is forwarded only when `forward_selection` is set and no fixed selection exists.
    async fn call(
        &self,
        parent: &Value,
        ctx: ResolverContext<'_>,
        forward_selection: bool,
    ) -> Result<Value, ResolverError> {
        let args = match &self.args {
            Some(mapper) => mapper(parent, ctx.args)?,
            None => ctx.args.clone(),
        };

        let (query, selection_set) = self.build_query(&args, ctx, forward_selection)?;
        trace!("delegated query: {}", query);

        let response = self
            .remote
            .executor
            .execute(RemoteRequest {
                query,
                operation_name: None,
                variables: None,
            })
            .await
            .map_err(|source| ResolverError::Transport {
                remote: self.remote.name.clone(),
                source,
            })?;

        let mut value = response
            .data
            .as_ref()
            .and_then(|data| data.get(&self.field_name))
            .cloned()
            .unwrap_or(Value::Null);

        if value.is_null() && !response.errors.is_empty() {
            return Err(ResolverError::Remote {
                remote: self.remote.name.clone(),
                field: self.field_name.clone(),
                messages: response.errors.into_iter().map(|e| e.message).collect(),
            });
        }

        if !response.errors.is_empty() {
            debug!(
                "remote schema '{}' returned {} error(s) next to data for '{}'",
                self.remote.name,
                response.errors.len(),
                self.field_name
            );
        }

        map_result_typenames(&mut value, &selection_set, &self.remote.type_renames);

        Ok(match &self.result {
            Some(mapper) => mapper(value),
            None => value,
        })
    }

    /// The sub-query, printed, and the selection set of its root field.
    fn build_query(
        &self,
        args: &Map<String, Value>,
        ctx: ResolverContext<'_>,
        forward_selection: bool,
    ) -> Result<(String, QuerySelectionSet), ResolverError> {
        let root_type = self.operation.root_type(&self.remote).ok_or_else(|| {
            ResolverError::message(format!(
                "remote schema '{}' has no mutation type",
                self.remote.name
            ))
        })?;

        let remote_field = self
            .remote
            .original
            .field(root_type, &self.field_name)
            .ok_or_else(|| {
                ResolverError::message(format!(
                    "remote schema '{}' has no root field '{}.{}'",
                    self.remote.name, root_type, self.field_name
                ))
            })?;

        let arguments = args
            .iter()
            .map(|(name, value)| {
                let value_type = remote_field.argument(name).map(|a| &a.value_type);
                (name.clone(), value_to_ast(value, value_type, &self.remote.original))
            })
            .collect();

        let mut selection_set = match &self.selection {
            Some(fixed) => fixed.clone(),
            None if forward_selection => self.client_selection(ctx),
            None => empty_selection_set(),
        };

        let return_type = remote_field.field_type.named_type();
        let composite = self
            .remote
            .original
            .type_by_name(return_type)
            .is_some_and(TypeDescriptor::is_composite);
        if selection_set.items.is_empty() && composite {
            selection_set.items.push(Selection::Field(typename_field()));
        }

        RemoteSelection {
            graph: &self.remote.original,
            type_renames: &self.remote.type_renames,
            variables: ctx.info.variables,
        }
        .prepare(&mut selection_set, return_type);

        let mut root_selection = empty_selection_set();
        root_selection.items.push(Selection::Field(Field {
            position: Pos::default(),
            alias: None,
            name: self.field_name.clone(),
            arguments,
            directives: Vec::new(),
            selection_set: selection_set.clone(),
        }));

        let operation = match self.operation {
            OperationKind::Query => OperationDefinition::Query(Query {
                position: Pos::default(),
                name: None,
                variable_definitions: Vec::new(),
                directives: Vec::new(),
                selection_set: root_selection,
            }),
            OperationKind::Mutation => OperationDefinition::Mutation(Mutation {
                position: Pos::default(),
                name: None,
                variable_definitions: Vec::new(),
                directives: Vec::new(),
                selection_set: root_selection,
            }),
        };

        let document: Document<'static, String> = Document {
            definitions: vec![Definition::Operation(operation)],
        };

        Ok((document.to_string(), selection_set))
    }

    /// The client's sub-selection of the local field, in the names of the merged schema.
    fn client_selection(&self, ctx: ResolverContext<'_>) -> QuerySelectionSet {
        let info = ctx.info;
        let mut selection_set = merge_field_selections(info.field_nodes);
        inline_fragment_spreads(&mut selection_set, info.fragments);

        info.rewrites
            .rewrite_selection_set(&selection_set, info.return_type.named_type())
    }
}

/// Resolves a field by delegating it to a remote root field.
pub struct DelegatingResolver {
    delegation: DelegationDescriptor,
}

impl DelegatingResolver {
    pub fn new(delegation: DelegationDescriptor) -> Self {
        Self { delegation }
    }

    pub fn delegation(&self) -> &DelegationDescriptor {
        &self.delegation
    }
}

#[async_trait]
impl FieldResolver for DelegatingResolver {
    async fn resolve(&self, ctx: ResolverContext<'_>) -> Result<Value, ResolverError> {
        self.delegation.delegate(ctx).await
    }
}

type FailurePredicate = dyn Fn(&Value) -> bool + Send + Sync;
type Combine = dyn Fn(Value, Value) -> Value + Send + Sync;

/// Two delegations, the second one depending on the result of the first.
///
/// The second call runs only when the first one succeeded: a domain failure of the
/// first call is returned as its value. A failure of the second call is reported as
/// [`ResolverError::DependentDelegation`], since the first call's effect already
/// happened.
pub struct ChainedDelegation {
    first: DelegationDescriptor,
    then: DelegationDescriptor,
    is_failure: Arc<FailurePredicate>,
    combine: Arc<Combine>,
}

impl ChainedDelegation {
    /// `then` receives the first call's value as its parent value, and selects its fixed
    /// selection (or only `__typename`) rather than the client's.
    pub fn new(first: DelegationDescriptor, then: DelegationDescriptor) -> Self {
        Self {
            first,
            then,
            is_failure: Arc::new(|_| false),
            combine: Arc::new(|first, _| first),
        }
    }

    /// Marks values that are domain failures, such as the error variant of a result union.
    pub fn failing_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.is_failure = Arc::new(predicate);
        self
    }

    /// Builds the local value out of both results. The first call's value is kept by default.
    pub fn combining<F>(mut self, combine: F) -> Self
    where
        F: Fn(Value, Value) -> Value + Send + Sync + 'static,
    {
        self.combine = Arc::new(combine);
        self
    }
}

#[async_trait]
impl FieldResolver for ChainedDelegation {
    async fn resolve(&self, ctx: ResolverContext<'_>) -> Result<Value, ResolverError> {
        let first = self.first.call(ctx.parent, ctx, true).await?;

        if (self.is_failure)(&first) {
            debug!("'{}' returned a failure result, skipping '{}'", self.first.field_name, self.then.field_name);
            return Ok(first);
        }

        let dependent_failure = |source: ResolverError| ResolverError::DependentDelegation {
            completed: self.first.field_name.clone(),
            stage: self.then.field_name.clone(),
            source: Box::new(source),
        };

        let second = self
            .then
            .call(&first, ctx, false)
            .await
            .map_err(dependent_failure)?;

        if (self.is_failure)(&second) {
            return Err(dependent_failure(ResolverError::message(format!(
                "'{}' returned a failure result",
                self.then.field_name
            ))));
        }

        Ok((self.combine)(first, second))
    }
}
