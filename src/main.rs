//! recordquery - parse a WHERE clause against a JSON schema and show the
//! resulting SQL, optionally filtering a JSON array of records with it

use anyhow::{bail, Context, Result};
use clap::Parser as ClapParser;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use recordquery::geometry::GeometryFactoryCache;
use recordquery::schema::{value_from_json, SchemaConfig};
use recordquery::{Query, Record, RecordDefinition};

/// recordquery - typed WHERE clauses over schema-described records
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON schema description
    #[arg(short, long)]
    schema: PathBuf,

    /// WHERE clause, without the WHERE keyword
    #[arg(short, long, default_value = "")]
    r#where: String,

    /// JSON array of records to filter
    #[arg(short, long)]
    records: Option<PathBuf>,

    /// Sort key; prefix with '-' for descending
    #[arg(short, long)]
    order_by: Vec<String>,

    /// Maximum number of records
    #[arg(short, long)]
    limit: Option<usize>,

    /// Records to skip
    #[arg(long, default_value = "0")]
    offset: usize,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let factories = GeometryFactoryCache::new();
    let config = SchemaConfig::load(&args.schema)?;
    let definition = Arc::new(config.into_record_definition(&factories)?);
    log::info!("Loaded {} from {}", definition.path(), args.schema.display());

    let mut query = Query::for_definition(Arc::clone(&definition));
    query
        .set_where(&args.r#where)
        .with_context(|| format!("Invalid WHERE clause: {}", args.r#where))?;
    for key in &args.order_by {
        match key.strip_prefix('-') {
            Some(name) => query.add_order_by(name, false),
            None => query.add_order_by(key.as_str(), true),
        };
    }
    query.set_limit(args.limit).set_offset(args.offset);

    let statement = query.sql_statement();
    println!("{}", statement.sql);
    for (i, parameter) in statement.parameters.iter().enumerate() {
        println!("  ${} = {}", i + 1, parameter);
    }

    if let Some(path) = &args.records {
        let records = load_records(&definition, path)?;
        let total = records.len();
        let matches = query.filter_records(records);
        log::info!("{} of {} records match", matches.len(), total);
        for record in &matches {
            let values: Vec<String> = definition
                .field_names()
                .into_iter()
                .map(|name| format!("{}={}", name, record.value(name)))
                .collect();
            println!("{}", values.join(", "));
        }
    }

    Ok(())
}

fn load_records(definition: &Arc<RecordDefinition>, path: &Path) -> Result<Vec<Record>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records file {}", path.display()))?;
    let items: Vec<serde_json::Value> =
        serde_json::from_str(&json).context("Records file must hold a JSON array")?;

    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let Some(object) = item.as_object() else {
            bail!("Record {} is not a JSON object", i);
        };
        let mut record = definition.new_record();
        for (name, value) in object {
            record
                .set_value(name, value_from_json(value))
                .with_context(|| format!("Record {}", i))?;
        }
        records.push(record);
    }
    Ok(records)
}
