//! LibsqlTreeStore - TreeStore Implementation for the libsql Backend
//!
//! Persists nodes in one SQLite-compatible table whose nested-set column names
//! come from [`TreeFieldNames`]. Reads are plain indexed queries on
//! `(tree_id, lft)`. Writes are serialized by a process-wide mutex and each one
//! runs inside a single transaction:
//!
//! - `insert_node` opens a two-slot gap at the parent's right bound
//! - `move_node` loads the rows, relocates them through [`Forest`] and writes back
//!   only the rows whose position changed
//!
//! # Examples
//!
//! ```rust,no_run
//! use outliner_core::db::{LibsqlTreeStore, TreeFieldNames, TreeStore};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = LibsqlTreeStore::new(
//!         PathBuf::from("./data/outliner.db"),
//!         TreeFieldNames::default(),
//!         0,
//!     )
//!     .await?;
//!     let root = store.insert_node("Site", None).await?;
//!     println!("root spans {}..{}", root.lft, root.rght);
//!     Ok(())
//! }
//! ```

use crate::db::error::{DatabaseError, TreeStoreError};
use crate::db::nested_set::Forest;
use crate::db::tree_store::{ListingQuery, NodeFilter, TreeFieldNames, TreeStore};
use crate::models::{NodeId, Position, TreeNode};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::params::Params;
use libsql::{Builder, Connection, Database, Row, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Nested-set tree stored in a libsql table
pub struct LibsqlTreeStore {
    db: Arc<Database>,
    db_path: PathBuf,
    fields: TreeFieldNames,
    root_level: i32,
    write_lock: Mutex<()>,
}

impl LibsqlTreeStore {
    /// Open (or create) the database at `db_path` and ensure the table exists
    ///
    /// # Errors
    ///
    /// - `InvalidFieldName` if a configured name is not a plain identifier
    /// - `Database` if the file cannot be opened or the schema cannot be created
    pub async fn new(
        db_path: PathBuf,
        fields: TreeFieldNames,
        root_level: i32,
    ) -> Result<Self, TreeStoreError> {
        fields.validate()?;

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DatabaseError::DirectoryCreationFailed)?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let store = Self {
            db: Arc::new(db),
            db_path,
            fields,
            root_level,
            write_lock: Mutex::new(()),
        };
        store.initialize_schema().await?;
        Ok(store)
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    pub fn fields(&self) -> &TreeFieldNames {
        &self.fields
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so they go through `query()`.
    async fn execute_pragma(&self, conn: &Connection, pragma: &str) -> Result<(), DatabaseError> {
        conn.query(pragma, ())
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e)))?;
        Ok(())
    }

    /// Connection with a 5 second busy timeout
    async fn connect_with_timeout(&self) -> Result<Connection, DatabaseError> {
        let conn = self.db.connect()?;
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000").await?;
        Ok(conn)
    }

    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL").await?;

        let f = &self.fields;
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    {parent} INTEGER NULL,
                    {tree} INTEGER NOT NULL,
                    {left} INTEGER NOT NULL,
                    {right} INTEGER NOT NULL,
                    {level} INTEGER NOT NULL,
                    modified_at TEXT NOT NULL
                )",
                table = f.table,
                parent = f.parent_field,
                tree = f.tree_id_field,
                left = f.left_field,
                right = f.right_field,
                level = f.level_field,
            ),
            (),
        )
        .await
        .map_err(|e| DatabaseError::initialization_failed(format!("create table: {}", e)))?;

        conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_tree_order ON {table}({tree}, {left})",
                table = f.table,
                tree = f.tree_id_field,
                left = f.left_field,
            ),
            (),
        )
        .await
        .map_err(|e| DatabaseError::initialization_failed(format!("create index: {}", e)))?;

        conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_parent ON {table}({parent})",
                table = f.table,
                parent = f.parent_field,
            ),
            (),
        )
        .await
        .map_err(|e| DatabaseError::initialization_failed(format!("create index: {}", e)))?;

        Ok(())
    }

    fn select_sql(&self) -> String {
        let f = &self.fields;
        format!(
            "SELECT id, title, {parent}, {tree}, {left}, {right}, {level}, modified_at FROM {table}",
            parent = f.parent_field,
            tree = f.tree_id_field,
            left = f.left_field,
            right = f.right_field,
            level = f.level_field,
            table = f.table,
        )
    }

    async fn fetch(
        &self,
        conn: &Connection,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<Vec<TreeNode>, DatabaseError> {
        let mut rows = conn
            .query(sql, Params::Positional(params))
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("{}: {}", sql, e)))?;

        let mut nodes = Vec::new();
        while let Some(row) = rows.next().await? {
            nodes.push(row_to_node(&row)?);
        }
        Ok(nodes)
    }

    async fn fetch_one(&self, conn: &Connection, id: NodeId) -> Result<Option<TreeNode>, DatabaseError> {
        let sql = format!("{} WHERE id = ?", self.select_sql());
        Ok(self
            .fetch(conn, &sql, vec![Value::Integer(id)])
            .await?
            .into_iter()
            .next())
    }

    fn where_clause(&self, filter: &NodeFilter) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(level) = filter.level {
            clauses.push(format!("{} = ?", self.fields.level_field));
            params.push(Value::Integer(level as i64));
        }
        if let Some(parent_id) = filter.parent_id {
            clauses.push(format!("{} = ?", self.fields.parent_field));
            params.push(Value::Integer(parent_id));
        }
        if let Some(search) = &filter.search {
            clauses.push("LOWER(title) LIKE ? ESCAPE '\\'".to_string());
            params.push(Value::Text(format!("%{}%", escape_like(&search.to_lowercase()))));
        }

        if clauses.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), params)
        }
    }
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn integer(row: &Row, idx: i32) -> Result<i64, DatabaseError> {
    match row.get_value(idx)? {
        Value::Integer(v) => Ok(v),
        other => Err(DatabaseError::MalformedRow(format!(
            "column {} is not an integer: {:?}",
            idx, other
        ))),
    }
}

fn optional_integer(row: &Row, idx: i32) -> Result<Option<i64>, DatabaseError> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Integer(v) => Ok(Some(v)),
        other => Err(DatabaseError::MalformedRow(format!(
            "column {} is not an integer: {:?}",
            idx, other
        ))),
    }
}

fn text(row: &Row, idx: i32) -> Result<String, DatabaseError> {
    match row.get_value(idx)? {
        Value::Text(v) => Ok(v),
        other => Err(DatabaseError::MalformedRow(format!(
            "column {} is not text: {:?}",
            idx, other
        ))),
    }
}

fn row_to_node(row: &Row) -> Result<TreeNode, DatabaseError> {
    let modified_at = text(row, 7)?;
    let modified_at = DateTime::parse_from_rfc3339(&modified_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::MalformedRow(format!("modified_at {:?}: {}", modified_at, e)))?;

    Ok(TreeNode {
        id: integer(row, 0)?,
        title: text(row, 1)?,
        parent_id: optional_integer(row, 2)?,
        tree_id: integer(row, 3)?,
        lft: integer(row, 4)?,
        rght: integer(row, 5)?,
        level: integer(row, 6)? as i32,
        modified_at,
    })
}

fn optional_id(id: Option<NodeId>) -> Value {
    id.map(Value::Integer).unwrap_or(Value::Null)
}

/// Lock/busy failures mean another writer got in the way
fn classify_write_error(err: libsql::Error) -> TreeStoreError {
    let message = err.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("locked") || lowered.contains("busy") {
        TreeStoreError::conflict(message)
    } else {
        TreeStoreError::Database(DatabaseError::LibsqlError(err))
    }
}

#[async_trait]
impl TreeStore for LibsqlTreeStore {
    async fn get_node(&self, id: NodeId) -> Result<Option<TreeNode>, TreeStoreError> {
        let conn = self.connect_with_timeout().await?;
        Ok(self.fetch_one(&conn, id).await?)
    }

    async fn get_ancestors(
        &self,
        id: NodeId,
        ascending: bool,
        include_self: bool,
    ) -> Result<Vec<TreeNode>, TreeStoreError> {
        let conn = self.connect_with_timeout().await?;
        let node = self
            .fetch_one(&conn, id)
            .await?
            .ok_or_else(|| TreeStoreError::node_not_found(id))?;

        let f = &self.fields;
        let sql = format!(
            "{select} WHERE {tree} = ? AND {left} < ? AND {right} > ? ORDER BY {left} {dir}",
            select = self.select_sql(),
            tree = f.tree_id_field,
            left = f.left_field,
            right = f.right_field,
            dir = if ascending { "DESC" } else { "ASC" },
        );
        let mut ancestors = self
            .fetch(
                &conn,
                &sql,
                vec![
                    Value::Integer(node.tree_id),
                    Value::Integer(node.lft),
                    Value::Integer(node.rght),
                ],
            )
            .await?;

        if include_self {
            if ascending {
                ancestors.insert(0, node);
            } else {
                ancestors.push(node);
            }
        }
        Ok(ancestors)
    }

    async fn first_root(&self) -> Result<Option<TreeNode>, TreeStoreError> {
        let conn = self.connect_with_timeout().await?;
        let f = &self.fields;
        let sql = format!(
            "{select} WHERE {parent} IS NULL ORDER BY {tree}, {left} LIMIT 1",
            select = self.select_sql(),
            parent = f.parent_field,
            tree = f.tree_id_field,
            left = f.left_field,
        );
        Ok(self.fetch(&conn, &sql, Vec::new()).await?.into_iter().next())
    }

    async fn query_nodes(&self, query: &ListingQuery) -> Result<Vec<TreeNode>, TreeStoreError> {
        let conn = self.connect_with_timeout().await?;
        let (where_sql, mut params) = self.where_clause(&query.filter);

        let order_sql = if query.ordering.is_empty() {
            "id".to_string()
        } else {
            query
                .ordering
                .iter()
                .map(|term| {
                    format!(
                        "{} {}",
                        self.fields.column(term.column),
                        if term.descending { "DESC" } else { "ASC" }
                    )
                })
                .chain(std::iter::once("id ASC".to_string()))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("{}{} ORDER BY {}", self.select_sql(), where_sql, order_sql);
        if query.limit.is_some() || query.offset > 0 {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(Value::Integer(query.limit.map_or(-1, |l| l as i64)));
            params.push(Value::Integer(query.offset as i64));
        }

        Ok(self.fetch(&conn, &sql, params).await?)
    }

    async fn count_nodes(&self, filter: &NodeFilter) -> Result<usize, TreeStoreError> {
        let conn = self.connect_with_timeout().await?;
        let (where_sql, params) = self.where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM {}{}", self.fields.table, where_sql);

        let mut rows = conn
            .query(&sql, Params::Positional(params))
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("{}: {}", sql, e)))?;
        let count = match rows.next().await.map_err(DatabaseError::from)? {
            Some(row) => integer(&row, 0)?,
            None => 0,
        };
        Ok(count as usize)
    }

    async fn insert_node(
        &self,
        title: &str,
        parent_id: Option<NodeId>,
    ) -> Result<TreeNode, TreeStoreError> {
        let _guard = self.write_lock.lock().await;
        let conn = self.connect_with_timeout().await?;
        let tx = conn.transaction().await.map_err(classify_write_error)?;
        let f = &self.fields;
        let now = Utc::now().to_rfc3339();

        let (tree_id, lft, level) = match parent_id {
            Some(pid) => {
                let parent = self
                    .fetch_one(&tx, pid)
                    .await?
                    .ok_or_else(|| TreeStoreError::node_not_found(pid))?;

                tx.execute(
                    &format!(
                        "UPDATE {table} SET {left} = {left} + 2 WHERE {tree} = ? AND {left} > ?",
                        table = f.table,
                        left = f.left_field,
                        tree = f.tree_id_field,
                    ),
                    Params::Positional(vec![
                        Value::Integer(parent.tree_id),
                        Value::Integer(parent.rght),
                    ]),
                )
                .await
                .map_err(classify_write_error)?;
                tx.execute(
                    &format!(
                        "UPDATE {table} SET {right} = {right} + 2 WHERE {tree} = ? AND {right} >= ?",
                        table = f.table,
                        right = f.right_field,
                        tree = f.tree_id_field,
                    ),
                    Params::Positional(vec![
                        Value::Integer(parent.tree_id),
                        Value::Integer(parent.rght),
                    ]),
                )
                .await
                .map_err(classify_write_error)?;

                (parent.tree_id, parent.rght, parent.level + 1)
            }
            None => {
                let mut rows = tx
                    .query(
                        &format!(
                            "SELECT COALESCE(MAX({tree}), 0) + 1 FROM {table}",
                            tree = f.tree_id_field,
                            table = f.table,
                        ),
                        (),
                    )
                    .await
                    .map_err(classify_write_error)?;
                let tree_id = match rows.next().await.map_err(DatabaseError::from)? {
                    Some(row) => integer(&row, 0)?,
                    None => 1,
                };
                (tree_id, 1, self.root_level)
            }
        };

        tx.execute(
            &format!(
                "INSERT INTO {table} (title, {parent}, {tree}, {left}, {right}, {level}, modified_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                table = f.table,
                parent = f.parent_field,
                tree = f.tree_id_field,
                left = f.left_field,
                right = f.right_field,
                level = f.level_field,
            ),
            Params::Positional(vec![
                Value::Text(title.to_string()),
                optional_id(parent_id),
                Value::Integer(tree_id),
                Value::Integer(lft),
                Value::Integer(lft + 1),
                Value::Integer(level as i64),
                Value::Text(now),
            ]),
        )
        .await
        .map_err(classify_write_error)?;

        let id = tx.last_insert_rowid();
        tx.commit().await.map_err(classify_write_error)?;

        self.get_node(id)
            .await?
            .ok_or_else(|| TreeStoreError::node_not_found(id))
    }

    async fn move_node(
        &self,
        node_id: NodeId,
        target_id: NodeId,
        position: Position,
    ) -> Result<TreeNode, TreeStoreError> {
        let _guard = self.write_lock.lock().await;
        let conn = self.connect_with_timeout().await?;
        let tx = conn.transaction().await.map_err(classify_write_error)?;

        let rows = self.fetch(&tx, &self.select_sql(), Vec::new()).await?;
        let mut forest = Forest::from_nodes(rows, self.root_level);
        let relocation = forest.relocate(node_id, target_id, position)?;

        let f = &self.fields;
        let update_sql = format!(
            "UPDATE {table} SET {parent} = ?, {tree} = ?, {left} = ?, {right} = ?, {level} = ?, modified_at = ?
             WHERE id = ?",
            table = f.table,
            parent = f.parent_field,
            tree = f.tree_id_field,
            left = f.left_field,
            right = f.right_field,
            level = f.level_field,
        );
        for node in &relocation.changed {
            tx.execute(
                &update_sql,
                Params::Positional(vec![
                    optional_id(node.parent_id),
                    Value::Integer(node.tree_id),
                    Value::Integer(node.lft),
                    Value::Integer(node.rght),
                    Value::Integer(node.level as i64),
                    Value::Text(node.modified_at.to_rfc3339()),
                    Value::Integer(node.id),
                ]),
            )
            .await
            .map_err(classify_write_error)?;
        }

        tx.commit().await.map_err(classify_write_error)?;
        tracing::debug!(
            "Relocated node {} {} {} ({} rows written)",
            node_id,
            position,
            target_id,
            relocation.changed.len()
        );
        Ok(relocation.moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_errors_become_conflicts() {
        let locked = libsql::Error::SqliteFailure(5, "database is locked".to_string());
        let err = classify_write_error(locked);
        assert!(matches!(err, TreeStoreError::Conflict(_)));
        assert!(err.is_relocation_failure());

        let busy = libsql::Error::SqliteFailure(5, "SQLITE_BUSY: database busy".to_string());
        assert!(matches!(classify_write_error(busy), TreeStoreError::Conflict(_)));
    }

    #[test]
    fn test_other_write_errors_stay_database_errors() {
        let misuse = libsql::Error::Misuse("no such table: nodes".to_string());
        let err = classify_write_error(misuse);
        assert!(matches!(err, TreeStoreError::Database(DatabaseError::LibsqlError(_))));
        assert!(!err.is_relocation_failure());
    }

    #[test]
    fn test_like_escaping() {
        assert_eq!(escape_like("100%_done"), "100\\%\\_done");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
