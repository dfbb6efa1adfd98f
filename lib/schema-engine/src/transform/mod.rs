pub mod filter;
pub mod rename_fields;
pub mod rename_table;
pub mod rename_types;

use std::collections::{HashMap, HashSet};

use gateway_config::transforms::{FieldCoordinate, FieldRenameRule};
use tracing::debug;

use crate::{
    error::{SchemaBuildError, SchemaBuildErrors},
    graph::{FieldDescriptor, SchemaGraph},
    rewrite::RenameStage,
};

pub use filter::{drop_deprecated, drop_empty_types, filter_fields, filter_types};
pub use rename_fields::{
    rename_fields, renamer, FieldRename, FieldRenamer, FieldTransformOutput, FnRenamer,
};
pub use rename_table::{ArgumentRenameTable, RenameTable, RenameTarget, TypeRenameTable};
pub use rename_types::{
    prefix_root_fields, prefix_types, prefixed_field_name, rename_types, TypeTransformOutput,
};

/// The result of one pipeline step.
#[derive(Debug)]
pub struct TransformOutcome {
    pub graph: SchemaGraph,
    /// How to undo the step's renames in a query document. `None` for steps that only remove.
    pub stage: Option<RenameStage>,
}

impl TransformOutcome {
    pub fn unchanged_names(graph: SchemaGraph) -> Self {
        Self { graph, stage: None }
    }
}

/// One step of the pipeline producing the public schema.
pub trait SchemaTransform: Send + Sync {
    fn name(&self) -> &str;

    fn transform_schema(&self, graph: SchemaGraph) -> Result<TransformOutcome, SchemaBuildErrors>;
}

/// Runs a [`FieldRenamer`] and records its renames as a rewrite stage.
pub struct TransformFields<R> {
    name: String,
    renamer: R,
}

impl<R: FieldRenamer> TransformFields<R> {
    pub fn new(name: impl Into<String>, renamer: R) -> Self {
        Self {
            name: name.into(),
            renamer,
        }
    }
}

impl<R: FieldRenamer + Send + Sync> SchemaTransform for TransformFields<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform_schema(&self, graph: SchemaGraph) -> Result<TransformOutcome, SchemaBuildErrors> {
        let output = rename_fields(&graph, &self.renamer)?;
        debug!(
            "[{}] renamed {} field(s)",
            self.name,
            output.renames.len()
        );

        let stage = (!output.renames.is_empty() || !output.argument_renames.is_empty()).then(|| {
            RenameStage::new(
                self.name.clone(),
                output.renames,
                output.argument_renames,
                &output.graph,
            )
        });

        Ok(TransformOutcome {
            graph: output.graph,
            stage,
        })
    }
}

/// Explicit `(type, field) → new name` renames.
pub struct FieldRenameRules {
    rules: HashMap<(String, String), String>,
}

impl FieldRenameRules {
    pub fn new(rules: &[FieldRenameRule]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|rule| ((rule.type_name.clone(), rule.from.clone()), rule.to.clone()))
                .collect(),
        }
    }
}

impl FieldRenamer for FieldRenameRules {
    fn rename_field(
        &self,
        type_name: &str,
        field: &FieldDescriptor,
    ) -> Result<FieldRename, SchemaBuildError> {
        Ok(self
            .rules
            .get(&(type_name.to_string(), field.name.clone()))
            .map_or(FieldRename::Keep, |to| FieldRename::RenameTo(to.clone())))
    }
}

type FieldPredicate = dyn Fn(&str, &FieldDescriptor) -> bool + Send + Sync;

/// Keeps the fields a predicate accepts.
pub struct FilterFields {
    name: String,
    predicate: Box<FieldPredicate>,
}

impl FilterFields {
    pub fn new<P>(name: impl Into<String>, predicate: P) -> Self
    where
        P: Fn(&str, &FieldDescriptor) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
        }
    }

    /// Removes the listed fields.
    pub fn removing(coordinates: &[FieldCoordinate]) -> Self {
        let removed: HashSet<(String, String)> = coordinates
            .iter()
            .map(|c| (c.type_name.clone(), c.field.clone()))
            .collect();

        Self::new("filter_fields", move |type_name, field| {
            !removed.contains(&(type_name.to_string(), field.name.clone()))
        })
    }
}

impl SchemaTransform for FilterFields {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform_schema(&self, graph: SchemaGraph) -> Result<TransformOutcome, SchemaBuildErrors> {
        filter_fields(&graph, &self.predicate).map(TransformOutcome::unchanged_names)
    }
}

pub struct FilterTypes {
    remove: HashSet<String>,
}

impl FilterTypes {
    pub fn new(remove: impl IntoIterator<Item = String>) -> Self {
        Self {
            remove: remove.into_iter().collect(),
        }
    }
}

impl SchemaTransform for FilterTypes {
    fn name(&self) -> &str {
        "filter_types"
    }

    fn transform_schema(&self, graph: SchemaGraph) -> Result<TransformOutcome, SchemaBuildErrors> {
        Ok(TransformOutcome::unchanged_names(filter_types(
            &graph,
            &self.remove,
        )))
    }
}

pub struct DropDeprecated;

impl SchemaTransform for DropDeprecated {
    fn name(&self) -> &str {
        "drop_deprecated"
    }

    fn transform_schema(&self, graph: SchemaGraph) -> Result<TransformOutcome, SchemaBuildErrors> {
        drop_deprecated(&graph).map(TransformOutcome::unchanged_names)
    }
}

pub struct DropEmptyTypes;

impl SchemaTransform for DropEmptyTypes {
    fn name(&self) -> &str {
        "drop_empty_types"
    }

    fn transform_schema(&self, graph: SchemaGraph) -> Result<TransformOutcome, SchemaBuildErrors> {
        Ok(TransformOutcome::unchanged_names(drop_empty_types(&graph)))
    }
}
