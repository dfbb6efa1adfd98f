use std::sync::Arc;

use gateway_config::{transforms::TransformRule, GatewayConfig};
use tracing::{debug, instrument};

use crate::{
    error::SchemaBuildErrors,
    execution::{execute, ExecutionError, ExecutionRequest, ExecutionResponse},
    graph::SchemaGraph,
    id_normalization::IdNormalization,
    rewrite::{QueryDocument, RewritePlan},
    transform::{
        DropDeprecated, DropEmptyTypes, FieldRenameRules, FilterFields, FilterTypes,
        SchemaTransform, TransformFields,
    },
};

/// The schema served to clients, paired with what is needed to rewrite client
/// documents back into the names of the schema it was built from.
#[derive(Debug, Clone)]
pub struct BuiltSchema {
    pub schema: Arc<SchemaGraph>,
    pub rewrites: Arc<RewritePlan>,
}

impl BuiltSchema {
    pub fn rewrite_document(&self, document: &QueryDocument) -> QueryDocument {
        self.rewrites.rewrite_document(document)
    }

    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResponse, ExecutionError> {
        execute(&self.schema, &self.rewrites, request).await
    }
}

/// An ordered list of schema transforms.
#[derive(Default)]
pub struct Pipeline {
    transforms: Vec<Box<dyn SchemaTransform>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: SchemaTransform + 'static>(mut self, transform: T) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    pub fn push(&mut self, transform: Box<dyn SchemaTransform>) {
        self.transforms.push(transform);
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn transform_names(&self) -> impl Iterator<Item = &str> {
        self.transforms.iter().map(|transform| transform.name())
    }

    /// The transforms declared by the configuration, in declaration order.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let mut pipeline = Pipeline::new();

        for rule in &config.transforms {
            let transform: Box<dyn SchemaTransform> = match rule {
                TransformRule::RenameFields { fields } => {
                    Box::new(TransformFields::new("rename_fields", FieldRenameRules::new(fields)))
                }
                TransformRule::FilterFields { remove } => Box::new(FilterFields::removing(remove)),
                TransformRule::FilterTypes { remove } => {
                    Box::new(FilterTypes::new(remove.iter().cloned()))
                }
                TransformRule::NormalizeIds => {
                    Box::new(IdNormalization::new(config.id_policy.clone()).into_transform())
                }
                TransformRule::DropDeprecated => Box::new(DropDeprecated),
                TransformRule::DropEmptyTypes => Box::new(DropEmptyTypes),
            };
            pipeline.push(transform);
        }

        pipeline
    }

    /// Runs every transform in order.
    ///
    /// A transform reports every violation it finds. The first transform failing
    /// stops the build, since later transforms would run on an invalid graph.
    #[instrument(level = "trace", skip_all)]
    pub fn build(&self, graph: SchemaGraph) -> Result<BuiltSchema, SchemaBuildErrors> {
        let mut graph = graph;
        let mut rewrites = RewritePlan::default();

        for transform in &self.transforms {
            let outcome = transform.transform_schema(graph).map_err(|errors| {
                debug!("[{}] failed with {} error(s)", transform.name(), errors.len());
                errors
            })?;

            debug!(
                "[{}] produced {} type(s)",
                transform.name(),
                outcome.graph.len()
            );

            graph = outcome.graph;
            if let Some(stage) = outcome.stage {
                rewrites.push(stage);
            }
        }

        Ok(BuiltSchema {
            schema: Arc::new(graph),
            rewrites: Arc::new(rewrites),
        })
    }
}
