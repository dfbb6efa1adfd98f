use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use graphql_parser::query::{Field, FragmentDefinition};
use serde_json::{Map, Value};

use crate::{error::ResolverError, rewrite::RewritePlan};

use super::{type_ref::TypeRef, SchemaGraph};

pub type FragmentMap = HashMap<String, FragmentDefinition<'static, String>>;

/// What a resolver knows about the selection it is resolving.
#[derive(Clone, Copy)]
pub struct ResolveInfo<'a> {
    /// The name of the field in the schema the value is read for. Rebound to the
    /// original name by renamed fields.
    pub field_name: &'a str,
    /// The alias of the selection, or its name.
    pub response_key: &'a str,
    pub parent_type: &'a str,
    pub return_type: &'a TypeRef,
    /// Every selection merged into this response key.
    pub field_nodes: &'a [&'a Field<'static, String>],
    pub fragments: &'a FragmentMap,
    pub variables: &'a Map<String, Value>,
    pub schema: &'a SchemaGraph,
    pub rewrites: &'a RewritePlan,
}

impl ResolveInfo<'_> {
    pub fn alias(&self) -> Option<&str> {
        self.field_nodes
            .first()
            .and_then(|field| field.alias.as_deref())
    }
}

#[derive(Clone, Copy)]
pub struct ResolverContext<'a> {
    pub parent: &'a Value,
    /// Coerced argument values, keyed by argument name.
    pub args: &'a Map<String, Value>,
    pub info: &'a ResolveInfo<'a>,
}

#[async_trait]
pub trait FieldResolver: Send + Sync {
    async fn resolve(&self, ctx: ResolverContext<'_>) -> Result<Value, ResolverError>;
}

/// Reads the field off the parent value, under the field's name.
pub struct PropertyResolver;

#[async_trait]
impl FieldResolver for PropertyResolver {
    async fn resolve(&self, ctx: ResolverContext<'_>) -> Result<Value, ResolverError> {
        Ok(ctx
            .parent
            .get(ctx.info.field_name)
            .cloned()
            .unwrap_or(Value::Null))
    }
}

/// Resolves a renamed field by running the original resolver as if the original
/// name had been selected, with its arguments under their original names.
pub struct RenamedFieldResolver {
    inner: Arc<dyn FieldResolver>,
    original_name: String,
    /// `(public, original)` argument names.
    arguments: Vec<(String, String)>,
}

impl RenamedFieldResolver {
    pub fn new(inner: Arc<dyn FieldResolver>, original_name: impl Into<String>) -> Self {
        Self {
            inner,
            original_name: original_name.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<(String, String)>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    fn original_args(&self, args: &Map<String, Value>) -> Map<String, Value> {
        args.iter()
            .map(|(name, value)| {
                let original = self
                    .arguments
                    .iter()
                    .find(|(public, _)| public == name)
                    .map_or(name, |(_, original)| original);
                (original.clone(), value.clone())
            })
            .collect()
    }
}

#[async_trait]
impl FieldResolver for RenamedFieldResolver {
    async fn resolve(&self, ctx: ResolverContext<'_>) -> Result<Value, ResolverError> {
        let info = ResolveInfo {
            field_name: &self.original_name,
            ..*ctx.info
        };

        if self.arguments.is_empty() {
            return self
                .inner
                .resolve(ResolverContext { info: &info, ..ctx })
                .await;
        }

        let args = self.original_args(ctx.args);
        self.inner
            .resolve(ResolverContext {
                parent: ctx.parent,
                args: &args,
                info: &info,
            })
            .await
    }
}
