// Workbench Gate - Database Tool Group
//
// SQL operations against the one workspace database. Connections are
// opened per call. Values bind as parameters; identifiers (table and
// column names) are validated against the allow-pattern before being
// interpolated, since SQL cannot parameterize identifiers. CSV filenames
// pass through the sandbox like any other path.

use crate::db::{validate_identifier, Database};
use crate::errors::{GateError, GateResult};
use crate::registry::{JsonMap, ParamSpec, ParamType, ToolContext, ToolSpec};
use crate::sandbox;
use crate::tools::{obj_arg, str_arg};
use serde_json::{json, Value};

pub fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new(
            "run_query",
            "Run a raw SQL query against the database. SELECT queries return rows, others return success.",
            vec![ParamSpec::required("query", ParamType::String, "SQL statement to run")],
            run_query,
        ),
        ToolSpec::new(
            "init_db",
            "Initialize or reset the database with a schema script.",
            vec![ParamSpec::required("schema", ParamType::String, "SQL schema script")],
            init_db,
        ),
        ToolSpec::new(
            "list_tables",
            "List all tables in the database.",
            vec![],
            list_tables,
        ),
        ToolSpec::new(
            "describe_table",
            "Describe a table (columns and types).",
            vec![ParamSpec::required("table", ParamType::String, "Table name")],
            describe_table,
        ),
        ToolSpec::new(
            "insert_data",
            "Insert a row into a table. Values bind as SQL parameters.",
            vec![
                ParamSpec::required("table", ParamType::String, "Destination table"),
                ParamSpec::required("values", ParamType::Object, "Column name to value mapping"),
            ],
            insert_data,
        ),
        ToolSpec::new(
            "export_to_csv",
            "Export a table to a CSV file inside the workspace.",
            vec![
                ParamSpec::required("table", ParamType::String, "Table to export"),
                ParamSpec::required("filename", ParamType::String, "Destination CSV file, relative to the workspace"),
            ],
            export_to_csv,
        ),
        ToolSpec::new(
            "import_from_csv",
            "Import rows from a CSV file into a table. The first row names the columns.",
            vec![
                ParamSpec::required("table", ParamType::String, "Destination table"),
                ParamSpec::required("filename", ParamType::String, "Source CSV file, relative to the workspace"),
            ],
            import_from_csv,
        ),
    ]
}

// ============================================================================
// HANDLERS
// ============================================================================

fn run_query(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let db = Database::open(&ctx.db_path())?;
    db.execute(str_arg(args, "query")?, &[])
}

fn init_db(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let db = Database::open(&ctx.db_path())?;
    db.execute_script(str_arg(args, "schema")?)?;
    Ok(json!({ "status": "Database initialized successfully." }))
}

fn list_tables(ctx: &ToolContext, _args: &JsonMap) -> GateResult<Value> {
    let db = Database::open(&ctx.db_path())?;
    db.execute(
        "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
        &[],
    )
}

fn describe_table(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let table = str_arg(args, "table")?;
    let db = Database::open(&ctx.db_path())?;
    let columns: Vec<Value> = db
        .columns(table)?
        .into_iter()
        .map(|(name, col_type)| json!({ "name": name, "type": col_type }))
        .collect();
    if columns.is_empty() {
        return Err(GateError::Handler(format!("Table '{}' does not exist.", table)));
    }
    Ok(json!({ "columns": columns }))
}

fn insert_data(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let table = str_arg(args, "table")?;
    let values = obj_arg(args, "values")?;
    validate_identifier(table)?;
    if values.is_empty() {
        return Err(GateError::InvalidParameters(
            "'values' must not be empty".to_string(),
        ));
    }

    let mut columns: Vec<&str> = Vec::with_capacity(values.len());
    let mut bound: Vec<Value> = Vec::with_capacity(values.len());
    for (column, value) in values {
        validate_identifier(column)?;
        columns.push(column.as_str());
        bound.push(value.clone());
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        vec!["?"; columns.len()].join(", ")
    );

    let db = Database::open(&ctx.db_path())?;
    db.execute(&sql, &bound)
}

fn export_to_csv(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let table = str_arg(args, "table")?;
    let filename = str_arg(args, "filename")?;
    validate_identifier(table)?;
    let target = sandbox::resolve(&ctx.workspace, filename)?;

    let db = Database::open(&ctx.db_path())?;
    let headers: Vec<String> = db.columns(table)?.into_iter().map(|(n, _)| n).collect();
    if headers.is_empty() {
        return Err(GateError::Handler(format!("Table '{}' does not exist.", table)));
    }
    let result = db.execute(&format!("SELECT * FROM {}", table), &[])?;
    let rows = result["rows"].as_array().cloned().unwrap_or_default();

    let mut writer = csv::Writer::from_path(&target)?;
    writer.write_record(&headers)?;
    for row in &rows {
        let record: Vec<String> = row
            .as_array()
            .map(|cells| cells.iter().map(cell_to_string).collect())
            .unwrap_or_default();
        writer.write_record(&record)?;
    }
    writer
        .flush()
        .map_err(|e| GateError::Handler(e.to_string()))?;

    Ok(json!({ "status": format!("Exported {} to {}", table, filename) }))
}

fn import_from_csv(ctx: &ToolContext, args: &JsonMap) -> GateResult<Value> {
    let table = str_arg(args, "table")?;
    let filename = str_arg(args, "filename")?;
    validate_identifier(table)?;
    let source = sandbox::resolve(&ctx.workspace, filename)?;

    let mut reader = csv::Reader::from_path(&source)?;
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();
    for header in &headers {
        validate_identifier(header)?;
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        headers.join(", "),
        vec!["?"; headers.len()].join(", ")
    );

    // All rows land or none do
    let db = Database::open(&ctx.db_path())?;
    db.connection()
        .execute("BEGIN", [])
        .map_err(GateError::from)?;
    let mut imported = 0usize;
    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                let _ = db.connection().execute("ROLLBACK", []);
                return Err(GateError::Handler(format!("CSV parse error: {}", e)));
            }
        };
        let bound: Vec<Value> = record.iter().map(|field| json!(field)).collect();
        if let Err(e) = db.execute(&sql, &bound) {
            let _ = db.connection().execute("ROLLBACK", []);
            return Err(e);
        }
        imported += 1;
    }
    db.connection()
        .execute("COMMIT", [])
        .map_err(GateError::from)?;

    Ok(json!({
        "status": format!("Imported CSV {} into {}", filename, table),
        "rows": imported,
    }))
}

/// CSV cell rendering for exported values.
fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
