//! List queries: `query` builds the statement, `soql` takes it verbatim

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::*;
use log::info;
use std::time::Instant;

use super::output::{print_json, print_table};
use crate::api::query::SortDirection;
use crate::api::{
    FieldDef, FieldKind, FilterTerm, FilterValue, ForceClient, ListDataAdapter, ListState,
    Operation, Page, Record, RecordSchema, SortTerm,
};

#[derive(Args)]
pub struct QueryCommands {
    /// Object type to list, e.g. Contact
    #[arg(long)]
    pub from: String,
    /// Fields to project as `name[:kind]`, kind one of string, boolean, integer, number, date
    #[arg(long, value_delimiter = ',', required = true)]
    pub select: Vec<String>,
    /// Filter as `property=value`; a value containing % matches with LIKE
    #[arg(long = "where", value_name = "PROPERTY=VALUE")]
    pub filters: Vec<String>,
    /// Clause added to the WHERE clause as-is
    #[arg(long)]
    pub raw: Vec<String>,
    /// Sort key as `field[:asc|desc]`
    #[arg(long)]
    pub order_by: Option<String>,
    /// Records per page; unpaged when omitted
    #[arg(long)]
    pub page_size: Option<u32>,
    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    /// Print the statement without running it
    #[arg(long)]
    pub dry: bool,
    /// Print records as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct SoqlCommand {
    /// SOQL statement, e.g. "SELECT Id, Name FROM User LIMIT 5"
    pub statement: String,
    /// Keep fetching while the answer has more batches
    #[arg(long)]
    pub all: bool,
    /// Print records as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn query_command(client: &ForceClient, args: QueryCommands) -> Result<()> {
    info!("Executing query command on {}", args.from);

    let fields = args
        .select
        .iter()
        .map(|input| parse_field(input))
        .collect::<Result<Vec<_>>>()?;
    let schema = RecordSchema::new(&args.from, fields);

    let mut state = ListState::default();
    for input in &args.filters {
        state.filters.push(parse_filter(input)?);
    }
    state.filters.extend(args.raw.iter().map(FilterTerm::raw));
    if let Some(input) = &args.order_by {
        state.sorters.push(parse_sort(input)?);
    }
    if let Some(size) = args.page_size {
        state.page = Some(Page::new(size, args.page.max(1)));
    }

    let statement = schema.descriptor(&state).encode().context("Invalid query")?;
    println!("📝 Query: {}", statement.dimmed());

    if args.dry {
        return Ok(());
    }

    super::ensure_session(client).await?;

    let start = Instant::now();
    let adapter = ListDataAdapter::new(client.clone(), schema);
    let result = adapter
        .execute(Operation::Read(state))
        .await
        .context("Query failed")?;

    let columns: Vec<String> = adapter.schema().fields().iter().map(|f| f.name.clone()).collect();
    render(&result.records, &columns, args.json)?;
    println!(
        "{}",
        format!(
            "{} of {} records in {:.0}ms",
            result.len(),
            result.total_size.unwrap_or(result.len() as u64),
            start.elapsed().as_secs_f64() * 1000.0
        )
        .dimmed()
    );
    Ok(())
}

pub async fn soql_command(client: &ForceClient, args: SoqlCommand) -> Result<()> {
    info!("Executing soql command");
    super::ensure_session(client).await?;

    let mut response = client.query(&args.statement).await.context("Query failed")?;
    let mut records = std::mem::take(&mut response.records);

    while args.all && response.has_more() {
        let Some(next) = response.next_records_url.clone() else {
            break;
        };
        response = client.query_more(&next).await.context("Fetching the next batch failed")?;
        records.append(&mut response.records);
    }

    let records: Vec<Record> = records.into_iter().map(Record::from_value).collect();
    render(&records, &[], args.json)?;
    if response.has_more() {
        println!("{}", "More records available, rerun with --all to fetch them.".yellow());
    }
    Ok(())
}

fn render(records: &[Record], columns: &[String], json: bool) -> Result<()> {
    if json {
        let values: Vec<_> = records
            .iter()
            .map(|r| serde_json::Value::Object(r.values.clone()))
            .collect();
        print_json(&serde_json::Value::Array(values))
    } else {
        print_table(records, columns);
        Ok(())
    }
}

/// `name[:kind]`
pub fn parse_field(input: &str) -> Result<FieldDef> {
    let (name, kind) = match input.split_once(':') {
        Some((name, kind)) => (name, kind),
        None => (input, "string"),
    };
    let kind = match kind.to_ascii_lowercase().as_str() {
        "string" => FieldKind::String,
        "boolean" | "bool" => FieldKind::Boolean,
        "integer" | "int" => FieldKind::Integer,
        "number" => FieldKind::Number,
        "date" | "datetime" => FieldKind::Date,
        other => bail!("Unknown field kind '{}' in '{}'", other, input),
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Empty field name in '{}'", input);
    }
    Ok(FieldDef::new(name, kind))
}

/// `property=value`, with booleans, integers and RFC 3339 timestamps typed
pub fn parse_filter(input: &str) -> Result<FilterTerm> {
    let Some((property, value)) = input.split_once('=') else {
        bail!("Filter '{}' is not of the form property=value", input);
    };

    let value = if value.eq_ignore_ascii_case("true") {
        FilterValue::Boolean(true)
    } else if value.eq_ignore_ascii_case("false") {
        FilterValue::Boolean(false)
    } else if let Ok(number) = value.parse::<i64>() {
        FilterValue::Integer(number)
    } else if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        FilterValue::Timestamp(ts.with_timezone(&Utc))
    } else {
        FilterValue::String(value.to_string())
    };

    Ok(FilterTerm::new(property.trim(), value))
}

/// `field[:asc|desc]`
pub fn parse_sort(input: &str) -> Result<SortTerm> {
    let (field, direction) = match input.split_once(':') {
        Some((field, direction)) => match SortDirection::parse(direction) {
            Some(direction) => (field, direction),
            None => bail!("Unknown sort direction '{}'", direction),
        },
        None => (input, SortDirection::Asc),
    };
    Ok(SortTerm {
        property: Some(field.to_string()),
        sort_property: None,
        direction,
    })
}
