pub mod type_index;

use graphql_parser::query::{
    Definition, Document, OperationDefinition, Selection, SelectionSet, TypeCondition,
};
use tracing::{instrument, trace};

use crate::{
    graph::{SchemaGraph, TYPENAME_FIELD},
    transform::{ArgumentRenameTable, RenameTable},
};

pub use type_index::TypeIndex;

pub type QueryDocument = Document<'static, String>;
pub type QuerySelectionSet = SelectionSet<'static, String>;

/// The inverse of one renaming transform: its rename tables, plus the type
/// information of the schema the transform produced.
#[derive(Debug, Clone)]
pub struct RenameStage {
    name: String,
    renames: RenameTable,
    argument_renames: ArgumentRenameTable,
    index: TypeIndex,
}

/// A selection set waiting to be rewritten, with the type its field names are looked up on.
struct Frame<'a> {
    selection_set: &'a mut QuerySelectionSet,
    scope: String,
}

impl RenameStage {
    pub fn new(
        name: impl Into<String>,
        renames: RenameTable,
        argument_renames: ArgumentRenameTable,
        output: &SchemaGraph,
    ) -> Self {
        Self {
            name: name.into(),
            renames,
            argument_renames,
            index: TypeIndex::from_graph(output),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn renames(&self) -> &RenameTable {
        &self.renames
    }

    pub fn argument_renames(&self) -> &ArgumentRenameTable {
        &self.argument_renames
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty() && self.argument_renames.is_empty()
    }

    /// Rewrites a document expressed in this stage's output names into its input names.
    pub fn rewrite_document(&self, document: &mut QueryDocument) {
        for definition in &mut document.definitions {
            match definition {
                Definition::Operation(operation) => {
                    let (root, selection_set) = match operation {
                        OperationDefinition::SelectionSet(set) => {
                            (Some(self.index.query_type()), set)
                        }
                        OperationDefinition::Query(query) => {
                            (Some(self.index.query_type()), &mut query.selection_set)
                        }
                        OperationDefinition::Mutation(mutation) => {
                            (self.index.mutation_type(), &mut mutation.selection_set)
                        }
                        OperationDefinition::Subscription(subscription) => {
                            (None, &mut subscription.selection_set)
                        }
                    };

                    if let Some(root) = root {
                        self.rewrite_selection_set(selection_set, root);
                    }
                }
                Definition::Fragment(fragment) => {
                    let TypeCondition::On(type_name) = &fragment.type_condition;
                    let type_name = type_name.clone();
                    self.rewrite_selection_set(&mut fragment.selection_set, &type_name);
                }
            }
        }
    }

    /// Rewrites one selection set whose statically-known type is `enclosing_type`.
    pub fn rewrite_selection_set(&self, selection_set: &mut QuerySelectionSet, enclosing_type: &str) {
        let mut stack = vec![Frame {
            selection_set,
            scope: enclosing_type.to_string(),
        }];

        while let Some(Frame {
            selection_set,
            scope,
        }) = stack.pop()
        {
            for selection in selection_set.items.iter_mut() {
                match selection {
                    Selection::Field(field) => {
                        if field.name == TYPENAME_FIELD {
                            continue;
                        }

                        let public = field.name.clone();
                        let child_scope = self.child_scope(&scope, self.index.field_type(&scope, &public));

                        for (argument, _) in field.arguments.iter_mut() {
                            if let Some(original) =
                                self.argument_renames.lookup(&scope, &public, argument)
                            {
                                trace!(
                                    "[{}] argument '{}.{}({})' -> '{}'",
                                    self.name,
                                    scope,
                                    public,
                                    argument,
                                    original
                                );
                                *argument = original.to_string();
                            }
                        }

                        if let Some(original) = self.renames.lookup(&scope, &public) {
                            trace!("[{}] field '{}.{}' -> '{}'", self.name, scope, public, original);
                            field.name = original.to_string();
                        }

                        if !field.selection_set.items.is_empty() {
                            stack.push(Frame {
                                selection_set: &mut field.selection_set,
                                scope: child_scope,
                            });
                        }
                    }
                    Selection::InlineFragment(fragment) => {
                        let child_scope = match &fragment.type_condition {
                            Some(TypeCondition::On(type_name)) => {
                                self.child_scope(&scope, Some(type_name.as_str()))
                            }
                            None => scope.clone(),
                        };

                        stack.push(Frame {
                            selection_set: &mut fragment.selection_set,
                            scope: child_scope,
                        });
                    }
                    // Named fragments are rewritten once, from their own definition.
                    Selection::FragmentSpread(_) => {}
                }
            }
        }
    }

    /// Selections below a union or a leaf keep looking names up on the nearest
    /// enclosing type owning fields.
    fn child_scope(&self, scope: &str, static_type: Option<&str>) -> String {
        match static_type {
            Some(type_name) if self.index.owns_fields(type_name) => type_name.to_string(),
            _ => scope.to_string(),
        }
    }
}

/// Every rename stage of a built schema, in the order the transforms ran.
///
/// Documents are rewritten by the last stage first: each stage turns names of the
/// schema it produced into names of the schema it was given.
#[derive(Debug, Clone, Default)]
pub struct RewritePlan {
    stages: Vec<RenameStage>,
}

impl RewritePlan {
    pub fn new(stages: Vec<RenameStage>) -> Self {
        Self { stages }
    }

    pub fn push(&mut self, stage: RenameStage) {
        self.stages.push(stage);
    }

    pub fn stages(&self) -> &[RenameStage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.iter().all(RenameStage::is_empty)
    }

    /// The document in the names of the schema the pipeline started from.
    #[instrument(level = "trace", skip_all)]
    pub fn rewrite_document(&self, document: &QueryDocument) -> QueryDocument {
        let mut rewritten = document.clone();

        for stage in self.stages.iter().rev() {
            stage.rewrite_document(&mut rewritten);
        }

        rewritten
    }

    pub fn rewrite_selection_set(
        &self,
        selection_set: &QuerySelectionSet,
        enclosing_type: &str,
    ) -> QuerySelectionSet {
        let mut rewritten = selection_set.clone();

        for stage in self.stages.iter().rev() {
            stage.rewrite_selection_set(&mut rewritten, enclosing_type);
        }

        rewritten
    }
}
