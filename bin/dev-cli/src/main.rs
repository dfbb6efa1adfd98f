mod logger;

use std::{env, fs, path::Path, process, sync::Arc};

use async_trait::async_trait;
use gateway_config::{load_config, GatewayConfig, GatewayConfigError};
use schema_engine::{
    parse_document,
    stitching::{
        merge, RemoteExecutor, RemoteRequest, RemoteResponse, RemoteSchema, RemoteSchemaOptions,
        TransportError,
    },
    BuiltSchema, Pipeline, SchemaBuildErrors, SchemaGraph,
};
use tracing::{debug, info};

const USAGE: &str =
    "Usage: schema-dev-cli schema [config_path] | schema-dev-cli rewrite <config_path> <document_path>";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Usage(&'static str),
    #[error(transparent)]
    Config(#[from] GatewayConfigError),
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Build(#[from] SchemaBuildErrors),
    #[error("failed to parse query document: {0}")]
    Document(#[from] graphql_parser::query::ParseError),
}

/// Remote schemas are only needed for their SDL here; nothing is ever executed.
struct OfflineRemote {
    name: String,
}

#[async_trait]
impl RemoteExecutor for OfflineRemote {
    async fn execute(&self, _request: RemoteRequest) -> Result<RemoteResponse, TransportError> {
        Err(TransportError::new(format!(
            "remote schema '{}' is offline in the dev cli",
            self.name
        )))
    }
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    if let Err(err) = run(&args) {
        eprintln!("{}", err);
        process::exit(1);
    }
}

fn run(args: &[String]) -> Result<(), CliError> {
    match args.first().map(String::as_str) {
        Some("schema") => {
            let built = build_public_schema(args.get(1).cloned())?;
            println!("{}", built.schema.to_sdl());
        }
        Some("rewrite") => {
            let (Some(config_path), Some(document_path)) = (args.get(1), args.get(2)) else {
                return Err(CliError::Usage(USAGE));
            };

            let built = build_public_schema(Some(config_path.clone()))?;
            let document = parse_document(&read(Path::new(document_path))?)?;
            println!("{}", built.rewrite_document(&document));
        }
        _ => return Err(CliError::Usage(USAGE)),
    }

    Ok(())
}

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.display().to_string(),
        source,
    })
}

fn build_public_schema(config_path: Option<String>) -> Result<BuiltSchema, CliError> {
    let config = load_config(config_path)?;
    logger::configure_logging(&config.log);

    let local_path = config.local_schema_path();
    let local = SchemaGraph::from_sdl(&local_path.display().to_string(), &read(&local_path)?)?;
    let remotes = load_remotes(&config)?;
    let merged = merge(local, &remotes, &[])?;

    let pipeline = Pipeline::from_config(&config);
    debug!(
        "running transforms: {:?}",
        pipeline.transform_names().collect::<Vec<_>>()
    );
    let built = pipeline.build(merged)?;

    info!(
        "public schema has {} type(s) and {} rename stage(s)",
        built.schema.len(),
        built.rewrites.stages().len()
    );

    Ok(built)
}

fn load_remotes(config: &GatewayConfig) -> Result<Vec<RemoteSchema>, CliError> {
    config
        .remotes
        .iter()
        .map(|remote| {
            let sdl = read(&config.resolve_path(&remote.schema))?;
            let executor = Arc::new(OfflineRemote {
                name: remote.name.clone(),
            });

            Ok(RemoteSchema::from_sdl(
                &remote.name,
                &sdl,
                executor,
                RemoteSchemaOptions::from(remote),
            )?)
        })
        .collect()
}
