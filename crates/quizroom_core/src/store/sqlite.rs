//! SQLite document engine.
//!
//! Documents live in one `documents` table keyed by `(collection, id)`. The
//! body column holds canonical JSON text (object keys sorted), so two equal
//! documents always have byte-identical bodies and the conditional replace can
//! compare bodies directly in its `WHERE` clause.

use super::{
    document_id, replacement_id, DocumentFilter, DocumentStore, StoreError, StoreResult,
};
use crate::db::migrations::latest_version;
use crate::db::{schema_version, table_exists};
use crate::model::EntityId;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use serde_json::Value;

const DOCUMENTS_TABLE: &str = "documents";

/// SQLite-backed document store borrowing a migrated connection.
#[derive(Clone, Copy)]
pub struct SqliteDocumentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentStore<'conn> {
    /// Wraps a connection returned by `db::open_db` / `db::open_db_in_memory`.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` when the `documents` table is absent.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let expected_version = latest_version();
        let actual_version = schema_version(conn)?;
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        if !table_exists(conn, DOCUMENTS_TABLE)? {
            return Err(StoreError::MissingRequiredTable(DOCUMENTS_TABLE));
        }

        Ok(Self { conn })
    }
}

impl DocumentStore for SqliteDocumentStore<'_> {
    fn insert(&self, collection: &str, document: &Value) -> StoreResult<()> {
        let id = document_id(collection, document)?;
        let body = canonical_body(document)?;

        let result = self.conn.execute(
            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3);",
            params![collection, id, body],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateId {
                    collection: collection.to_string(),
                    id,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn find(&self, collection: &str, id: EntityId) -> StoreResult<Option<Value>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2;",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        body.map(|body| parse_body(&body)).transpose()
    }

    fn find_and_replace(
        &self,
        collection: &str,
        snapshot: &Value,
        replacement: &Value,
    ) -> StoreResult<Option<Value>> {
        let id = replacement_id(collection, snapshot, replacement)?;
        let expected_body = canonical_body(snapshot)?;
        let new_body = canonical_body(replacement)?;

        let stored: Option<String> = self
            .conn
            .query_row(
                "UPDATE documents
                 SET
                    body = ?1,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE collection = ?2
                   AND id = ?3
                   AND body = ?4
                 RETURNING body;",
                params![new_body, collection, id, expected_body],
                |row| row.get(0),
            )
            .optional()?;

        stored.map(|body| parse_body(&body)).transpose()
    }

    fn delete(&self, collection: &str, id: EntityId) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2;",
            params![collection, id],
        )?;
        Ok(changed == 1)
    }

    fn find_many(&self, collection: &str, filter: &DocumentFilter) -> StoreResult<Vec<Value>> {
        filter.validate()?;

        let mut sql = String::from("SELECT body FROM documents WHERE collection = ?");
        let mut bind_values = vec![SqlValue::Text(collection.to_string())];

        for (field, value) in &filter.equals {
            let json_path = SqlValue::Text(format!("$.\"{field}\""));
            match scalar_condition(value) {
                ScalarCondition::Null => {
                    sql.push_str(" AND json_extract(body, ?) IS NULL");
                    bind_values.push(json_path);
                }
                ScalarCondition::Type(json_type) => {
                    sql.push_str(" AND json_type(body, ?) = ?");
                    bind_values.push(json_path);
                    bind_values.push(SqlValue::Text(json_type.to_string()));
                }
                ScalarCondition::TypedValue(json_type, scalar) => {
                    sql.push_str(" AND json_type(body, ?) = ? AND json_extract(body, ?) = ?");
                    bind_values.push(json_path.clone());
                    bind_values.push(SqlValue::Text(json_type.to_string()));
                    bind_values.push(json_path);
                    bind_values.push(scalar);
                }
            }
        }

        sql.push_str(" ORDER BY id ASC");

        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(SqlValue::Integer(i64::from(limit)));
            if filter.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(SqlValue::Integer(i64::from(filter.offset)));
            }
        } else if filter.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(SqlValue::Integer(i64::from(filter.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let body: String = row.get(0)?;
            documents.push(parse_body(&body)?);
        }

        Ok(documents)
    }
}

/// Serializes with sorted object keys; equal documents yield equal text.
fn canonical_body(document: &Value) -> StoreResult<String> {
    Ok(serde_json::to_string(document)?)
}

fn parse_body(body: &str) -> StoreResult<Value> {
    serde_json::from_str(body).map_err(|err| StoreError::InvalidData(err.to_string()))
}

/// How one equality condition is expressed in SQL.
///
/// `json_extract` maps `true`/`false` to 1/0 and does not tell `42` from
/// `42.0`, so every non-null comparison also pins the member's `json_type`.
/// Results must equal those of `DocumentFilter::matches`.
enum ScalarCondition {
    /// Member is missing or JSON `null`.
    Null,
    /// Member has this `json_type`; used for booleans.
    Type(&'static str),
    TypedValue(&'static str, SqlValue),
}

fn scalar_condition(value: &Value) -> ScalarCondition {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => ScalarCondition::Null,
        Value::Bool(true) => ScalarCondition::Type("true"),
        Value::Bool(false) => ScalarCondition::Type("false"),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => ScalarCondition::TypedValue("integer", SqlValue::Integer(integer)),
            None => ScalarCondition::TypedValue(
                "real",
                SqlValue::Real(number.as_f64().unwrap_or(f64::NAN)),
            ),
        },
        Value::String(text) => ScalarCondition::TypedValue("text", SqlValue::Text(text.clone())),
    }
}
