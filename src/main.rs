use std::sync::{Arc, PoisonError};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use querylens::config::Settings;
use querylens::context::{context_provider, supported_context_types};
use querylens::db::{
    load_postgres_schema, ConnectionConfig, ConnectionManager, DatabaseManager, FilterOperator,
    OrderSpec, TableFilter,
};
use querylens::dialect::Dialect;
use querylens::explain::{
    explain_configs, format_duration_ms, is_explain_query, shared_explain_config,
    QueryPerformanceAnalyzer, QueryPerformanceResult,
};
use querylens::pagination::{
    apply_default_limit, build_queries, PaginationOptions, PaginationQueryBuilder,
};

/// Dialect-aware SQL helpers: LLM prompts, EXPLAIN analysis, pagination
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the SQL generation guide for a dialect
    Prompt {
        #[arg(long, default_value = "default")]
        dialect: String,
    },
    /// Print the EXPLAIN statement that would be run for a query
    ExplainSql {
        #[arg(long, default_value = "default")]
        dialect: String,
        sql: String,
    },
    /// Print (or run with --connect) the data and count queries for a table page
    Paginate(PaginateArgs),
    /// Run EXPLAIN against a saved connection and print the analysis as JSON
    Analyze {
        /// Saved connection name
        #[arg(long = "connect")]
        connect: String,
        #[arg(long)]
        database: Option<String>,
        sql: String,
    },
    /// Run a query against a saved connection with the default row limit applied
    Query {
        #[arg(long = "connect")]
        connect: String,
        /// Row limit for statements without one (defaults to the configured value)
        #[arg(long)]
        limit: Option<u64>,
        sql: String,
    },
    /// Print a connection's schema the way it is fed to the LLM
    Schema {
        #[arg(long = "connect")]
        connect: String,
        #[arg(long, default_value = "public")]
        schema: String,
    },
    /// List dialects with prompt knowledge and their EXPLAIN prefixes
    Dialects,
}

#[derive(Args)]
struct PaginateArgs {
    #[arg(long, default_value = "default")]
    dialect: String,
    /// Table reference, used as written
    #[arg(long)]
    table: String,
    /// Filter as `column<op>value`, e.g. `status=active` or `age>=21`
    #[arg(long = "filter")]
    filters: Vec<String>,
    /// Ordering as `column[:asc|desc]`
    #[arg(long = "order")]
    order: Vec<String>,
    #[arg(long)]
    limit: Option<u64>,
    #[arg(long)]
    offset: Option<u64>,
    /// Execute against a saved PostgreSQL connection instead of printing SQL
    #[arg(long = "connect")]
    connect: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = Settings::load()?;
    {
        let shared = shared_explain_config();
        let mut config = shared.write().unwrap_or_else(PoisonError::into_inner);
        settings.apply_explain_overrides(&mut config)?;
    }

    match cli.command {
        Command::Prompt { dialect } => {
            println!("{}", context_provider(&dialect).generate_prompt_instructions());
        }
        Command::ExplainSql { dialect, sql } => {
            let shared = shared_explain_config();
            let config = shared.read().unwrap_or_else(PoisonError::into_inner);
            println!("{}", config.build_explain_query(&sql, &dialect));
        }
        Command::Paginate(args) => paginate(args).await?,
        Command::Analyze {
            connect,
            database,
            sql,
        } => {
            if is_explain_query(&sql) {
                bail!("pass the statement without EXPLAIN; the dialect prefix is added for you");
            }
            let manager = Arc::new(ConnectionManager::new());
            let config = resolve_connection(&connect)?;
            manager.connect(&config).await?;

            let analyzer = QueryPerformanceAnalyzer::new(manager);
            let result = analyzer
                .analyze_query_performance(&config.name, &sql, database.as_deref())
                .await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if let Some(line) = timing_line(&result) {
                eprintln!("{}", line);
            }
            if !result.success {
                std::process::exit(1);
            }
        }
        Command::Query {
            connect,
            limit,
            sql,
        } => {
            let manager = ConnectionManager::new();
            let config = resolve_connection(&connect)?;
            manager.connect(&config).await?;

            let sql = apply_default_limit(&sql, limit.unwrap_or(settings.default_row_limit));
            let result = manager.query(&config.name, &sql, None).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                std::process::exit(1);
            }
        }
        Command::Schema { connect, schema } => {
            let manager = ConnectionManager::new();
            let config = resolve_connection(&connect)?;
            let backend = manager.connect(&config).await?;

            let loaded = load_postgres_schema(backend.client(), &schema).await?;
            print!("{}", context_provider(&config.dialect).format_schema(&loaded));
        }
        Command::Dialects => {
            let prefixes = explain_configs();
            for id in supported_context_types() {
                let prefix = prefixes.get(&id).map(String::as_str).unwrap_or("EXPLAIN");
                println!("{:<12} {:<14} {}", id, Dialect::from_id(&id).display_name(), prefix);
            }
        }
    }

    Ok(())
}

async fn paginate(args: PaginateArgs) -> Result<()> {
    let options = PaginationOptions {
        filters: args
            .filters
            .iter()
            .map(|f| parse_filter(f))
            .collect::<Result<_>>()?,
        order_by: args
            .order
            .iter()
            .map(|o| parse_order(o))
            .collect::<Result<_>>()?,
        limit: args.limit,
        offset: args.offset,
    };

    let Some(name) = args.connect else {
        let dialect = Dialect::from_id(&args.dialect);
        let queries = build_queries(&dialect, &options, &args.table);
        println!("{}", queries.data_query);
        if let Some(count) = queries.count_query {
            println!("{}", count);
        }
        return Ok(());
    };

    let manager = ConnectionManager::new();
    let config = resolve_connection(&name)?;
    let backend = manager.connect(&config).await?;

    let builder = PaginationQueryBuilder::new(backend);
    let result = builder
        .build_paginated_query(&config.name, &options, &args.table, None)
        .await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Human-readable execution time of an analysis, when the plan reported one.
fn timing_line(result: &QueryPerformanceResult) -> Option<String> {
    let metrics = result.analysis.as_ref()?.metrics.as_ref()?;
    let ms = metrics.execution_time_ms?;
    Some(format!("{} execution time: {}", result.dialect, format_duration_ms(ms)))
}

/// Look up a saved connection and fill in its password from PGPASSWORD or
/// an interactive prompt.
fn resolve_connection(name: &str) -> Result<ConnectionConfig> {
    let saved = ConnectionManager::load_saved_connections()?;
    let Some(mut config) = saved
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
        .cloned()
    else {
        let names: Vec<&str> = saved.iter().map(|c| c.name.as_str()).collect();
        bail!(
            "no saved connection named {:?} (saved: {})",
            name,
            if names.is_empty() {
                "none".to_string()
            } else {
                names.join(", ")
            }
        );
    };

    if config.password.is_empty() {
        if let Ok(pw) = std::env::var("PGPASSWORD") {
            config.password = pw;
        } else {
            let prompt = format!("Password for {}: ", config.display_string());
            config.password = rpassword::read_password_from_tty(Some(&prompt))?;
        }
    }

    Ok(config)
}

/// `column<op>value`. Two-character operators are tried first so `>=` is
/// not read as `>`. `column IS NULL` / `column IS NOT NULL` are accepted too.
fn parse_filter(raw: &str) -> Result<TableFilter> {
    for (suffix, operator) in [
        (" IS NOT NULL", FilterOperator::IsNotNull),
        (" IS NULL", FilterOperator::IsNull),
    ] {
        if let Some(column) = strip_suffix_ignore_ascii_case(raw, suffix) {
            return Ok(TableFilter::new(column.trim(), operator, Value::Null));
        }
    }

    for token in [">=", "<=", "!=", "=", ">", "<"] {
        if let Some((column, value)) = raw.split_once(token) {
            let operator = FilterOperator::parse(token)
                .with_context(|| format!("unsupported operator {:?}", token))?;
            let value = serde_json::from_str(value.trim())
                .unwrap_or_else(|_| Value::String(value.trim().to_string()));
            return Ok(TableFilter::new(column.trim(), operator, value));
        }
    }

    bail!("filter {:?} must look like column=value", raw)
}

/// `raw` without `suffix`, compared ASCII case-insensitively. `None` when the
/// split point is not a char boundary.
fn strip_suffix_ignore_ascii_case<'a>(raw: &'a str, suffix: &str) -> Option<&'a str> {
    let split = raw.len().checked_sub(suffix.len())?;
    let tail = raw.get(split..)?;
    if tail.eq_ignore_ascii_case(suffix) {
        raw.get(..split)
    } else {
        None
    }
}

fn parse_order(raw: &str) -> Result<OrderSpec> {
    match raw.rsplit_once(':') {
        None => Ok(OrderSpec::asc(raw)),
        Some((column, dir)) if dir.eq_ignore_ascii_case("asc") => Ok(OrderSpec::asc(column)),
        Some((column, dir)) if dir.eq_ignore_ascii_case("desc") => Ok(OrderSpec::desc(column)),
        Some((_, dir)) => bail!("unknown sort direction {:?}", dir),
    }
}
