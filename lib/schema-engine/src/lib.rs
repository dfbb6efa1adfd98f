pub mod error;
pub mod execution;
pub mod graph;
pub mod id_normalization;
pub mod pipeline;
pub mod rewrite;
pub mod stitching;
pub mod transform;
pub mod values;

#[cfg(test)]
mod tests;

pub use error::{ResolverError, SchemaBuildError, SchemaBuildErrors};
pub use graph::SchemaGraph;
pub use pipeline::{BuiltSchema, Pipeline};
pub use rewrite::{QueryDocument, RewritePlan};

/// Parses a client document into the owned form every rewrite and execution works on.
pub fn parse_document(query: &str) -> Result<QueryDocument, graphql_parser::query::ParseError> {
    graphql_parser::parse_query::<String>(query).map(|document| document.into_static())
}
