//! CLI command implementations

use std::path::{Path, PathBuf};

use axum::extract::Query;
use axum::http::Uri;
use tracing::info;

use crate::executor::DryRunExecutor;
use crate::http_server::{HttpServer, ServerConfig};
use crate::rest_api::handler::{HandlerConfig, Operation, RelationPath, TableHandler};
use crate::rest_api::statement::CompiledStatement;
use crate::schema::StaticCatalog;

use super::args::{Command, Method};
use super::errors::{CliError, CliResult};

/// Flags of `serve` that override the config file
#[derive(Debug, Default)]
pub struct ServeOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_url: Option<String>,
    pub catalog: Option<PathBuf>,
    pub dry_run: bool,
}

/// One request compiled by `compile`
#[derive(Debug)]
pub struct CompileRequest<'a> {
    pub catalog: &'a Path,
    pub database: &'a str,
    pub schema: &'a str,
    pub table: &'a str,
    pub method: Method,
    pub query: &'a str,
    pub body: Option<&'a str>,
}

/// Run a parsed command
pub async fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Serve {
            config,
            host,
            port,
            database_url,
            catalog,
            dry_run,
        } => {
            let overrides = ServeOverrides {
                host,
                port,
                database_url,
                catalog,
                dry_run,
            };
            serve(config.as_deref(), overrides).await
        }
        Command::Compile {
            catalog,
            database,
            schema,
            table,
            method,
            query,
            body,
        } => {
            let statement = compile(CompileRequest {
                catalog: &catalog,
                database: &database,
                schema: &schema,
                table: &table,
                method,
                query: &query,
                body: body.as_deref(),
            })
            .await?;
            println!("{}", serde_json::to_string_pretty(&statement)?);
            Ok(())
        }
    }
}

/// Merge the config file with command line flags
pub fn load_config(path: Option<&Path>, overrides: ServeOverrides) -> CliResult<ServerConfig> {
    let mut config = match path {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };

    if let Some(host) = overrides.host {
        config.host = host;
    }
    if let Some(port) = overrides.port {
        config.port = port;
    }
    if let Some(url) = overrides.database_url {
        config.database_url = Some(url);
    }
    if let Some(catalog) = overrides.catalog {
        config.catalog_file = Some(catalog);
    }
    config.dry_run |= overrides.dry_run;

    config.validate()?;
    Ok(config)
}

/// Start the server and block until shutdown
pub async fn serve(config: Option<&Path>, overrides: ServeOverrides) -> CliResult<()> {
    let config = load_config(config, overrides)?;
    info!(addr = %config.socket_addr(), "starting tablerest");

    let server = HttpServer::from_config(config).await?;
    server.start().await?;
    Ok(())
}

/// Compile one request against a catalog file
pub async fn compile(request: CompileRequest<'_>) -> CliResult<CompiledStatement> {
    let catalog = StaticCatalog::from_file(request.catalog)?;
    let handler = TableHandler::new(catalog, DryRunExecutor::new(), HandlerConfig::default());

    let path = RelationPath::parse(request.database, request.schema, request.table)?;
    let params = parse_query(request.query)?;
    let body = request.body.unwrap_or_default().as_bytes();

    let operation = match request.method {
        Method::Get => Operation::Select,
        Method::Post => Operation::Insert,
        Method::Put | Method::Patch => Operation::Update,
        Method::Delete => Operation::Delete,
    };

    Ok(handler.compile(operation, &path, &params, body).await?)
}

/// Split a raw query string into decoded pairs, keeping order and repeats
fn parse_query(query: &str) -> CliResult<Vec<(String, String)>> {
    let query = query.trim_start_matches('?');
    let uri: Uri = format!("/?{}", query)
        .parse()
        .map_err(|e| CliError::Usage(format!("invalid query string: {}", e)))?;
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&uri)
        .map_err(|e| CliError::Usage(format!("invalid query string: {}", e)))?;
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest_api::statement::SqlValue;
    use crate::schema::{CatalogSnapshot, ColumnInfo, RelationInfo};
    use std::io::Write;

    fn catalog_file() -> tempfile::NamedTempFile {
        let snapshot = CatalogSnapshot::new("prest", "public").with_relation(RelationInfo::table(
            "test",
            vec![ColumnInfo::typed("id", "int4"), ColumnInfo::new("name")],
        ));
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&vec![snapshot]).unwrap()).unwrap();
        file
    }

    fn request<'a>(catalog: &'a Path, method: Method, query: &'a str) -> CompileRequest<'a> {
        CompileRequest {
            catalog,
            database: "prest",
            schema: "public",
            table: "test",
            method,
            query,
            body: None,
        }
    }

    #[test]
    fn test_parse_query_keeps_order_and_repeats() {
        let pairs = parse_query("?name=$eq.a&_order=-id&name=$ne.b").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("name".to_string(), "$eq.a".to_string()),
                ("_order".to_string(), "-id".to_string()),
                ("name".to_string(), "$ne.b".to_string()),
            ]
        );
        assert!(parse_query("").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_compile_select() {
        let file = catalog_file();
        let statement = compile(request(file.path(), Method::Get, "id=$gt.3&_order=-id"))
            .await
            .unwrap();
        assert_eq!(
            statement.sql,
            "SELECT * FROM \"public\".\"test\" WHERE \"id\" > $1::int4 ORDER BY \"id\" DESC"
        );
        assert_eq!(statement.args, vec![SqlValue::Text("3".to_string())]);
    }

    #[tokio::test]
    async fn test_compile_rejects_unknown_column() {
        let file = catalog_file();
        let err = compile(request(file.path(), Method::Get, "nope=$eq.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Request(_)));
    }

    #[tokio::test]
    async fn test_compile_insert_uses_body() {
        let file = catalog_file();
        let mut req = request(file.path(), Method::Post, "");
        req.body = Some(r#"{"name": "nuveo"}"#);
        let statement = compile(req).await.unwrap();
        assert_eq!(
            statement.sql,
            "INSERT INTO \"public\".\"test\" (\"name\") VALUES ($1) RETURNING *"
        );
    }

    #[test]
    fn test_load_config_overrides() {
        let overrides = ServeOverrides {
            port: Some(9000),
            database_url: Some("postgres://localhost/prest".to_string()),
            ..Default::default()
        };
        let config = load_config(None, overrides).unwrap();
        assert_eq!(config.port, 9000);
        assert!(!config.dry_run);

        assert!(matches!(
            load_config(None, ServeOverrides::default()),
            Err(CliError::Config(_))
        ));
    }
}
