//! Typed record CRUD over tables.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use backplane_manifest::Manifest;
use serde_json::Value;

use crate::database::Database;
use crate::error::StoreError;

/// List parameters, already validated upstream.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub limit: u64,
    pub offset: u64,
    pub order_by: Option<String>,
    pub descending: bool,
    /// Equality filters on field values.
    pub filters: BTreeMap<String, Value>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            order_by: None,
            descending: false,
            filters: BTreeMap::new(),
        }
    }
}

/// CRUD seam used by the HTTP dispatcher. Records are JSON objects
/// keyed by a string `id` the caller supplies.
pub trait RecordStore: Send + Sync {
    fn list(&self, table: &str, query: &ListQuery) -> Result<Vec<Value>, StoreError>;
    fn get(&self, table: &str, id: &str) -> Result<Option<Value>, StoreError>;
    fn insert(&self, table: &str, record: Value) -> Result<Value, StoreError>;
    fn update(&self, table: &str, id: &str, changes: &Value) -> Result<Option<Value>, StoreError>;
    fn delete(&self, table: &str, id: &str) -> Result<bool, StoreError>;
}

fn record_id(record: &Value) -> Result<String, StoreError> {
    record
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(StoreError::MissingId)
}

type Table = BTreeMap<String, Value>;

/// In-memory record store with deterministic iteration order.
#[derive(Default)]
pub struct MemoryRecords {
    tables: RwLock<BTreeMap<String, Table>>,
}

impl MemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filters(record: &Value, filters: &BTreeMap<String, Value>) -> bool {
    filters
        .iter()
        .all(|(field, expected)| record.get(field) == Some(expected))
}

fn order_key(record: &Value, field: &str) -> String {
    match record.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

impl RecordStore for MemoryRecords {
    fn list(&self, table: &str, query: &ListQuery) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let Some(rows) = tables.get(table) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<Value> = rows
            .values()
            .filter(|r| matches_filters(r, &query.filters))
            .cloned()
            .collect();

        if let Some(field) = &query.order_by {
            matched.sort_by_key(|r| order_key(r, field));
            if query.descending {
                matched.reverse();
            }
        }

        Ok(matched
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect())
    }

    fn get(&self, table: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tables.get(table).and_then(|rows| rows.get(id)).cloned())
    }

    fn insert(&self, table: &str, record: Value) -> Result<Value, StoreError> {
        let id = record_id(&record)?;
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables
            .entry(table.to_string())
            .or_default()
            .insert(id, record.clone());
        Ok(record)
    }

    fn update(&self, table: &str, id: &str, changes: &Value) -> Result<Option<Value>, StoreError> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let Some(record) = tables.get_mut(table).and_then(|rows| rows.get_mut(id)) else {
            return Ok(None);
        };
        if let (Value::Object(target), Value::Object(delta)) = (&mut *record, changes) {
            for (key, value) in delta {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(Some(record.clone()))
    }

    fn delete(&self, table: &str, id: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        Ok(tables
            .get_mut(table)
            .is_some_and(|rows| rows.remove(id).is_some()))
    }
}

/// Record store that composes parameterized SQL against a [`Database`].
///
/// Table and field names come from the manifest only, never from
/// request input; anything not declared there is refused before a
/// statement is built. Values always travel as positional parameters.
pub struct SqlRecords<D> {
    db: D,
    manifest: Arc<Manifest>,
}

impl<D: Database> SqlRecords<D> {
    pub fn new(db: D, manifest: Arc<Manifest>) -> Self {
        Self { db, manifest }
    }

    fn check_table<'a>(&'a self, table: &str) -> Result<&'a backplane_manifest::EntityDefinition, StoreError> {
        self.manifest
            .entity_by_table(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }

    fn check_field(
        entity: &backplane_manifest::EntityDefinition,
        table: &str,
        field: &str,
    ) -> Result<(), StoreError> {
        if entity.field(field).is_some() {
            Ok(())
        } else {
            Err(StoreError::UnknownField {
                table: table.to_string(),
                field: field.to_string(),
            })
        }
    }
}

impl<D: Database> RecordStore for SqlRecords<D> {
    fn list(&self, table: &str, query: &ListQuery) -> Result<Vec<Value>, StoreError> {
        let entity = self.check_table(table)?;
        let mut sql = format!("SELECT * FROM {table}");
        let mut params = Vec::new();

        if !query.filters.is_empty() {
            let mut clauses = Vec::new();
            for (field, value) in &query.filters {
                Self::check_field(entity, table, field)?;
                clauses.push(format!("{field} = ?"));
                params.push(value.clone());
            }
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        if let Some(field) = &query.order_by {
            Self::check_field(entity, table, field)?;
            sql.push_str(&format!(
                " ORDER BY {field} {}",
                if query.descending { "DESC" } else { "ASC" }
            ));
        }

        sql.push_str(" LIMIT ? OFFSET ?");
        params.push(Value::from(query.limit));
        params.push(Value::from(query.offset));

        self.db.query(&sql, &params)
    }

    fn get(&self, table: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.check_table(table)?;
        self.db.first(
            &format!("SELECT * FROM {table} WHERE id = ?"),
            &[Value::from(id)],
        )
    }

    fn insert(&self, table: &str, record: Value) -> Result<Value, StoreError> {
        let entity = self.check_table(table)?;
        let Value::Object(fields) = &record else {
            return Err(StoreError::MissingId);
        };
        record_id(&record)?;

        let mut columns = Vec::new();
        let mut params = Vec::new();
        for (field, value) in fields {
            Self::check_field(entity, table, field)?;
            columns.push(field.clone());
            params.push(value.clone());
        }
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            columns.join(", ")
        );
        self.db.execute(&sql, &params)?;
        Ok(record)
    }

    fn update(&self, table: &str, id: &str, changes: &Value) -> Result<Option<Value>, StoreError> {
        let entity = self.check_table(table)?;
        let Value::Object(fields) = changes else {
            return Ok(self.get(table, id)?);
        };
        if fields.is_empty() {
            return self.get(table, id);
        }

        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for (field, value) in fields {
            Self::check_field(entity, table, field)?;
            assignments.push(format!("{field} = ?"));
            params.push(value.clone());
        }
        params.push(Value::from(id));

        let sql = format!("UPDATE {table} SET {} WHERE id = ?", assignments.join(", "));
        let affected = self.db.execute(&sql, &params)?;
        if affected == 0 {
            return Ok(None);
        }
        self.get(table, id)
    }

    fn delete(&self, table: &str, id: &str) -> Result<bool, StoreError> {
        self.check_table(table)?;
        let affected = self.db.execute(
            &format!("DELETE FROM {table} WHERE id = ?"),
            &[Value::from(id)],
        )?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded() -> MemoryRecords {
        let store = MemoryRecords::new();
        for (id, name, price) in [("a", "Apple", 3), ("b", "Banana", 1), ("c", "Cherry", 5)] {
            store
                .insert(
                    "product",
                    json!({"id": id, "name": name, "price": price, "status": "listed"}),
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn insert_requires_string_id() {
        let store = MemoryRecords::new();
        assert!(matches!(
            store.insert("product", json!({"name": "NoId"})),
            Err(StoreError::MissingId)
        ));
    }

    #[test]
    fn list_orders_and_pages() {
        let store = seeded();
        let query = ListQuery {
            limit: 2,
            offset: 1,
            order_by: Some("name".to_string()),
            ..ListQuery::default()
        };
        let rows = store.list("product", &query).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Banana");
        assert_eq!(rows[1]["name"], "Cherry");
    }

    #[test]
    fn list_applies_equality_filters() {
        let store = seeded();
        store
            .update("product", "b", &json!({"status": "draft"}))
            .unwrap();
        let query = ListQuery {
            filters: BTreeMap::from([("status".to_string(), json!("listed"))]),
            ..ListQuery::default()
        };
        assert_eq!(store.list("product", &query).unwrap().len(), 2);
    }

    #[test]
    fn update_merges_and_delete_reports() {
        let store = seeded();
        let updated = store
            .update("product", "a", &json!({"price": 4}))
            .unwrap()
            .unwrap();
        assert_eq!(updated["price"], 4);
        assert_eq!(updated["name"], "Apple");
        assert!(store.delete("product", "a").unwrap());
        assert!(!store.delete("product", "a").unwrap());
        assert!(store.update("product", "a", &json!({})).unwrap().is_none());
    }

    mod sql {
        use super::*;
        use crate::database::{Database, QueryResult, Statement};
        use std::sync::Mutex;

        #[derive(Default)]
        struct RecordingDb {
            statements: Mutex<Vec<(String, Vec<Value>)>>,
        }

        impl Database for RecordingDb {
            fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Value>, StoreError> {
                self.statements
                    .lock()
                    .unwrap()
                    .push((sql.to_string(), params.to_vec()));
                Ok(Vec::new())
            }
            fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, StoreError> {
                self.statements
                    .lock()
                    .unwrap()
                    .push((sql.to_string(), params.to_vec()));
                Ok(1)
            }
            fn batch(&self, _: &[Statement]) -> Result<Vec<QueryResult>, StoreError> {
                Ok(Vec::new())
            }
        }

        fn manifest() -> Arc<Manifest> {
            Arc::new(
                Manifest::from_json(
                    r#"{"entities":[{"name":"Product","fields":[
                        {"name":"id","type":"uuid"},
                        {"name":"name","type":"string"},
                        {"name":"price","type":"decimal"}
                    ]}]}"#,
                )
                .unwrap(),
            )
        }

        #[test]
        fn list_builds_parameterized_sql() {
            let store = SqlRecords::new(RecordingDb::default(), manifest());
            let query = ListQuery {
                limit: 10,
                offset: 5,
                order_by: Some("name".to_string()),
                descending: true,
                filters: BTreeMap::from([("price".to_string(), json!(3))]),
            };
            store.list("product", &query).unwrap();
            let recorded = store.db.statements.lock().unwrap();
            assert_eq!(
                recorded[0].0,
                "SELECT * FROM product WHERE price = ? ORDER BY name DESC LIMIT ? OFFSET ?"
            );
            assert_eq!(recorded[0].1, vec![json!(3), json!(10), json!(5)]);
        }

        #[test]
        fn undeclared_identifiers_are_refused() {
            let store = SqlRecords::new(RecordingDb::default(), manifest());
            assert!(matches!(
                store.get("accounts", "x"),
                Err(StoreError::UnknownTable(_))
            ));
            let query = ListQuery {
                order_by: Some("name; DROP TABLE product".to_string()),
                ..ListQuery::default()
            };
            assert!(matches!(
                store.list("product", &query),
                Err(StoreError::UnknownField { .. })
            ));
        }

        #[test]
        fn insert_lists_declared_columns_only() {
            let store = SqlRecords::new(RecordingDb::default(), manifest());
            store
                .insert("product", json!({"id": "a", "name": "Pen"}))
                .unwrap();
            let recorded = store.db.statements.lock().unwrap();
            assert_eq!(recorded[0].0, "INSERT INTO product (id, name) VALUES (?, ?)");
        }
    }
}
