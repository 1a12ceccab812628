// Workbench Gate - SQLite Collaborator
//
// Narrow execute/query interface over the one workspace database file.
// A connection is opened and closed per call — no shared connection state
// across tool calls. Table and column names cannot be bound as SQL
// parameters, so every identifier that gets interpolated into statement
// text is validated against a strict allow-pattern first.

use crate::errors::{GateError, GateResult};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::{json, Value};
use std::path::Path;

/// Per-call handle on the workspace database.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> GateResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Run one SQL statement. SELECT-like statements return rows; anything
    /// else returns just the ok status. Bound parameters go through
    /// rusqlite's normal binding, never string interpolation.
    pub fn execute(&self, sql: &str, bound: &[Value]) -> GateResult<Value> {
        let params: Vec<rusqlite::types::Value> =
            bound.iter().map(json_to_sql).collect::<GateResult<_>>()?;
        let params_ref: Vec<&dyn rusqlite::ToSql> =
            params.iter().map(|p| p as &dyn rusqlite::ToSql).collect();

        if returns_rows(sql) {
            let mut stmt = self.conn.prepare(sql)?;
            let column_count = stmt.column_count();
            let mut rows = stmt.query(params_ref.as_slice())?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let mut record = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    record.push(sql_to_json(row.get_ref(i)?));
                }
                out.push(Value::Array(record));
            }
            Ok(json!({ "rows": out, "status": "ok" }))
        } else {
            self.conn.execute(sql, params_ref.as_slice())?;
            Ok(json!({ "status": "ok" }))
        }
    }

    /// Run a multi-statement schema script.
    pub fn execute_script(&self, schema: &str) -> GateResult<()> {
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Column names of a table, in declaration order.
    pub fn columns(&self, table: &str) -> GateResult<Vec<(String, String)>> {
        validate_identifier(table)?;
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", table))?;
        let mut rows = stmt.query([])?;
        let mut columns = Vec::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(1)?;
            let col_type: String = row.get(2)?;
            columns.push((name, col_type));
        }
        Ok(columns)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Does this statement produce a result set?
fn returns_rows(sql: &str) -> bool {
    let head = sql.trim_start().to_lowercase();
    head.starts_with("select") || head.starts_with("pragma") || head.starts_with("with")
}

/// Identifiers (table/column names) are interpolated into SQL text and are
/// therefore an injection surface. Allow-pattern: leading letter or
/// underscore, then alphanumerics and underscores only.
pub fn validate_identifier(name: &str) -> GateResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(GateError::InvalidParameters(format!(
            "invalid identifier '{}': letters, digits, and underscores only",
            name
        )))
    }
}

fn json_to_sql(value: &Value) -> GateResult<rusqlite::types::Value> {
    use rusqlite::types::Value as Sql;
    match value {
        Value::Null => Ok(Sql::Null),
        Value::Bool(b) => Ok(Sql::Integer(*b as i64)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Sql::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Sql::Real(f))
            } else {
                Err(GateError::InvalidParameters(format!(
                    "unrepresentable number: {}",
                    n
                )))
            }
        }
        Value::String(s) => Ok(Sql::Text(s.clone())),
        other => Err(GateError::InvalidParameters(format!(
            "value {} cannot be bound as a SQL parameter",
            other
        ))),
    }
}

fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => json!(i),
        ValueRef::Real(f) => json!(f),
        ValueRef::Text(t) => json!(String::from_utf8_lossy(t)),
        ValueRef::Blob(b) => json!(hex::encode(b)),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_db(dir: &Path) -> Database {
        Database::open(&dir.join("database.db")).unwrap()
    }

    #[test]
    fn select_returns_rows_others_return_status() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        db.execute_script("CREATE TABLE users(id INTEGER, name TEXT);")
            .unwrap();

        let insert = db
            .execute(
                "INSERT INTO users (id, name) VALUES (?, ?)",
                &[json!(1), json!("Alice")],
            )
            .unwrap();
        assert_eq!(insert, json!({"status": "ok"}));

        let select = db.execute("SELECT * FROM users", &[]).unwrap();
        assert_eq!(select["rows"], json!([[1, "Alice"]]));
        assert_eq!(select["status"], "ok");
    }

    #[test]
    fn columns_reflect_the_declared_schema() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        db.execute_script("CREATE TABLE t(id INTEGER, label TEXT);")
            .unwrap();
        let cols = db.columns("t").unwrap();
        assert_eq!(
            cols,
            vec![
                ("id".to_string(), "INTEGER".to_string()),
                ("label".to_string(), "TEXT".to_string())
            ]
        );
    }

    #[test]
    fn malformed_sql_is_a_handler_fault() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        let result = db.execute("SELEC nonsense", &[]);
        assert!(matches!(result, Err(GateError::Handler(_))));
    }

    #[test]
    fn identifier_allow_pattern() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("_tmp_2024").is_ok());
        assert!(validate_identifier("users; DROP TABLE users").is_err());
        assert!(validate_identifier("users--").is_err());
        assert!(validate_identifier("1users").is_err());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("na me").is_err());
    }

    #[test]
    fn null_and_float_round_trip() {
        let dir = tempdir().unwrap();
        let db = open_db(dir.path());
        db.execute_script("CREATE TABLE v(x REAL, y TEXT);").unwrap();
        db.execute(
            "INSERT INTO v (x, y) VALUES (?, ?)",
            &[json!(1.5), Value::Null],
        )
        .unwrap();
        let rows = db.execute("SELECT x, y FROM v", &[]).unwrap();
        assert_eq!(rows["rows"], json!([[1.5, null]]));
    }
}
