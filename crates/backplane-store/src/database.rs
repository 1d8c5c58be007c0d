//! SQL access with an interpolation guard.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::StoreError;

/// One parameterized statement, for batching.
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Result of one executed statement.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub rows: Vec<Value>,
    pub rows_affected: u64,
}

/// Positional-parameter SQL backend.
pub trait Database: Send + Sync {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Value>, StoreError>;
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, StoreError>;

    /// First row of a query, if any.
    fn first(&self, sql: &str, params: &[Value]) -> Result<Option<Value>, StoreError> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    fn batch(&self, statements: &[Statement]) -> Result<Vec<QueryResult>, StoreError>;
}

/// Reject SQL that looks like it was built by string interpolation
/// instead of positional parameters.
///
/// Checked before any statement reaches a backend: template markers
/// (`${...}`), quote-adjacent `+` concatenation, and the word
/// "template" itself all fail with [`StoreError::UnsafeQuery`].
pub fn check_interpolation(sql: &str) -> Result<(), StoreError> {
    let reject = |reason: &str| {
        Err(StoreError::UnsafeQuery {
            reason: reason.to_string(),
        })
    };

    if sql.contains("${") {
        return reject("template interpolation marker");
    }
    let bytes = sql.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'+' {
            continue;
        }
        let before = bytes[..i].iter().rev().find(|&&c| c != b' ').copied();
        let after = bytes[i + 1..].iter().find(|&&c| c != b' ').copied();
        if matches!(before, Some(b'\'') | Some(b'"')) || matches!(after, Some(b'\'') | Some(b'"')) {
            return reject("quote-adjacent string concatenation");
        }
    }
    if sql.to_ascii_lowercase().contains("template") {
        return reject("template keyword");
    }
    Ok(())
}

/// A [`Database`] wrapper that applies the interpolation guard and
/// traces every statement.
pub struct GuardedDatabase<D> {
    inner: D,
}

impl<D: Database> GuardedDatabase<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> D {
        self.inner
    }

    fn guard(&self, sql: &str) -> Result<(), StoreError> {
        match check_interpolation(sql) {
            Ok(()) => {
                debug!(sql, "executing statement");
                Ok(())
            }
            Err(err) => {
                warn!(sql, %err, "rejected unsafe statement");
                Err(err)
            }
        }
    }
}

impl<D: Database> Database for GuardedDatabase<D> {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Value>, StoreError> {
        self.guard(sql)?;
        self.inner.query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, StoreError> {
        self.guard(sql)?;
        self.inner.execute(sql, params)
    }

    fn first(&self, sql: &str, params: &[Value]) -> Result<Option<Value>, StoreError> {
        self.guard(sql)?;
        self.inner.first(sql, params)
    }

    fn batch(&self, statements: &[Statement]) -> Result<Vec<QueryResult>, StoreError> {
        for statement in statements {
            self.guard(&statement.sql)?;
        }
        self.inner.batch(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullDb;

    impl Database for NullDb {
        fn query(&self, _sql: &str, _params: &[Value]) -> Result<Vec<Value>, StoreError> {
            Ok(Vec::new())
        }
        fn execute(&self, _sql: &str, _params: &[Value]) -> Result<u64, StoreError> {
            Ok(0)
        }
        fn batch(&self, statements: &[Statement]) -> Result<Vec<QueryResult>, StoreError> {
            Ok(statements.iter().map(|_| QueryResult::default()).collect())
        }
    }

    #[test]
    fn parameterized_sql_passes() {
        assert!(check_interpolation("SELECT * FROM product WHERE id = ?").is_ok());
        assert!(check_interpolation("UPDATE product SET price = price + 1").is_ok());
    }

    #[test]
    fn interpolation_markers_rejected() {
        assert!(check_interpolation("SELECT * FROM product WHERE id = '${id}'").is_err());
        assert!(check_interpolation("SELECT * FROM product WHERE id = '\" + id + \"'").is_err());
        assert!(check_interpolation("SELECT template FROM product").is_err());
    }

    #[test]
    fn guard_applies_to_every_batch_statement() {
        let db = GuardedDatabase::new(NullDb);
        let statements = vec![
            Statement::new("SELECT 1", vec![]),
            Statement::new("SELECT '${boom}'", vec![]),
        ];
        assert!(matches!(
            db.batch(&statements),
            Err(StoreError::UnsafeQuery { .. })
        ));
    }
}
