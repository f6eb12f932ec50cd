//! SQLite-backed graph backend (persistence).
//!
//! Edges keep the relation label in its own column and everything else as a
//! JSON `properties` document. Rows written by other tools may carry the label
//! only under `edge`, only in the column, or have no `sources` list; reads
//! translate all of those into the canonical shape.

use crate::normalize::{canonical_edge_attrs, canonical_node_attrs, edge_patch, merge_attrs};
use crate::snapshot::EdgeRecord;
use crate::store::GraphBackend;
use kg_types::{
    relation_of, Attrs, GraphStoreError, LEGACY_RELATION_KEY, RELATION_KEY,
};
use rusqlite::OptionalExtension;
use serde_json::Value;
use std::path::Path;

/// Environment variable naming the database file used by [`SqliteGraphStore::from_env`].
pub const SQLITE_PATH_ENV: &str = "KG_SQLITE_PATH";
const DEFAULT_SQLITE_PATH: &str = "knowledge_graph.db";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS nodes (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        properties TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS edges (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        source TEXT NOT NULL,
        target TEXT NOT NULL,
        relation TEXT,
        properties TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (source, target)
    );

    CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source);
    CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target);
    CREATE INDEX IF NOT EXISTS idx_edges_relation ON edges(relation);
"#;

/// Raw edge row: source, target, relation column, properties JSON.
type EdgeRow = (String, String, Option<String>, String);

/// SQLite-backed graph store for persistence.
pub struct SqliteGraphStore {
    conn: std::sync::Mutex<rusqlite::Connection>,
}

impl SqliteGraphStore {
    /// Open (or create) a database file at the given path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, GraphStoreError> {
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| GraphStoreError::Backend(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, GraphStoreError> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| GraphStoreError::Backend(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// Open the database named by `KG_SQLITE_PATH` (default `knowledge_graph.db`).
    pub fn from_env() -> Result<Self, GraphStoreError> {
        let path =
            std::env::var(SQLITE_PATH_ENV).unwrap_or_else(|_| DEFAULT_SQLITE_PATH.to_string());
        tracing::info!(path = %path, "opening sqlite graph store");
        Self::new(path)
    }

    fn with_connection(conn: rusqlite::Connection) -> Result<Self, GraphStoreError> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| GraphStoreError::Backend(e.to_string()))?;
        Ok(Self {
            conn: std::sync::Mutex::new(conn),
        })
    }

    fn with_conn<T, F>(&self, f: F) -> Result<T, GraphStoreError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| GraphStoreError::Backend(format!("failed to acquire lock: {}", e)))?;
        f(&conn).map_err(|e| GraphStoreError::Backend(e.to_string()))
    }

    fn parse_properties(raw: &str) -> Result<Attrs, GraphStoreError> {
        match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Attrs::new()),
            other => Err(GraphStoreError::InvalidFormat(format!(
                "properties must be a JSON object, got {}",
                other
            ))),
        }
    }

    /// Translate a stored edge row into the canonical shape.
    fn edge_from_row(row: EdgeRow) -> Result<EdgeRecord, GraphStoreError> {
        let (source, target, column, raw) = row;
        let mut attrs = Self::parse_properties(&raw)?;
        if let Some(relation) = column {
            if !attrs.contains_key(RELATION_KEY) && !attrs.contains_key(LEGACY_RELATION_KEY) {
                attrs.insert(RELATION_KEY.to_string(), Value::String(relation));
            }
        }
        Ok(EdgeRecord {
            source,
            target,
            attributes: canonical_edge_attrs(attrs),
        })
    }

    fn query_edges(&self, sql: &str, id: Option<&str>) -> Result<Vec<EdgeRecord>, GraphStoreError> {
        let rows: Vec<EdgeRow> = self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let map = |row: &rusqlite::Row<'_>| -> rusqlite::Result<EdgeRow> {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            };
            let rows = match id {
                Some(id) => stmt.query_map(rusqlite::params![id], map)?,
                None => stmt.query_map([], map)?,
            };
            rows.collect()
        })?;
        rows.into_iter().map(Self::edge_from_row).collect()
    }

    fn query_ids(&self, sql: &str, id: &str) -> Result<Vec<String>, GraphStoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map(rusqlite::params![id], |row| row.get(0))?;
            rows.collect()
        })
    }

    fn write_node(&self, id: &str, attrs: &Attrs) -> Result<(), GraphStoreError> {
        let properties = serde_json::to_string(attrs)?;
        let now = chrono::Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO nodes (id, properties, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET properties = excluded.properties, updated_at = excluded.updated_at",
                rusqlite::params![id, properties, now],
            )
        })?;
        Ok(())
    }

    fn write_edge(&self, source: &str, target: &str, attrs: &Attrs) -> Result<(), GraphStoreError> {
        let relation = relation_of(attrs).map(str::to_string);
        let properties = serde_json::to_string(attrs)?;
        let now = chrono::Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO edges (source, target, relation, properties, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(source, target) DO UPDATE SET relation = excluded.relation,
                 properties = excluded.properties, updated_at = excluded.updated_at",
                rusqlite::params![source, target, relation, properties, now],
            )
        })?;
        Ok(())
    }
}

fn row_count(count: i64) -> Result<usize, GraphStoreError> {
    usize::try_from(count).map_err(|e| GraphStoreError::Backend(format!("row count {count}: {e}")))
}

impl GraphBackend for SqliteGraphStore {
    fn add_node(&mut self, id: &str, attrs: Attrs) -> Result<(), GraphStoreError> {
        let merged = match self.node_attrs(id)? {
            Some(mut current) => {
                merge_attrs(&mut current, attrs);
                current
            }
            None => attrs,
        };
        self.write_node(id, &canonical_node_attrs(merged))
    }

    fn has_node(&self, id: &str) -> Result<bool, GraphStoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM nodes WHERE id = ?1)",
                rusqlite::params![id],
                |row| row.get(0),
            )
        })
    }

    fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        attrs: Attrs,
    ) -> Result<(), GraphStoreError> {
        for id in [source, target] {
            if !self.has_node(id)? {
                self.write_node(id, &Attrs::new())?;
            }
        }
        let merged = match self.edge_attrs(source, target)? {
            Some(mut current) => {
                merge_attrs(&mut current, edge_patch(attrs));
                current
            }
            None => attrs,
        };
        self.write_edge(source, target, &canonical_edge_attrs(merged))
    }

    fn has_edge(&self, source: &str, target: &str) -> Result<bool, GraphStoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM edges WHERE source = ?1 AND target = ?2)",
                rusqlite::params![source, target],
                |row| row.get(0),
            )
        })
    }

    fn node_attrs(&self, id: &str) -> Result<Option<Attrs>, GraphStoreError> {
        let raw: Option<String> = self.with_conn(|conn| {
            conn.query_row(
                "SELECT properties FROM nodes WHERE id = ?1",
                rusqlite::params![id],
                |row| row.get(0),
            )
            .optional()
        })?;
        raw.map(|raw| Self::parse_properties(&raw).map(canonical_node_attrs))
            .transpose()
    }

    fn edge_attrs(&self, source: &str, target: &str) -> Result<Option<Attrs>, GraphStoreError> {
        let row: Option<EdgeRow> = self.with_conn(|conn| {
            conn.query_row(
                "SELECT source, target, relation, properties FROM edges WHERE source = ?1 AND target = ?2",
                rusqlite::params![source, target],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()
        })?;
        row.map(|row| Self::edge_from_row(row).map(|edge| edge.attributes))
            .transpose()
    }

    fn set_node_attrs(&mut self, id: &str, attrs: Attrs) -> Result<(), GraphStoreError> {
        if !self.has_node(id)? {
            return Err(GraphStoreError::NodeNotFound(id.to_string()));
        }
        self.write_node(id, &canonical_node_attrs(attrs))
    }

    fn set_edge_attrs(
        &mut self,
        source: &str,
        target: &str,
        attrs: Attrs,
    ) -> Result<(), GraphStoreError> {
        if !self.has_edge(source, target)? {
            return Err(GraphStoreError::EdgeNotFound {
                from: source.to_string(),
                to: target.to_string(),
            });
        }
        self.write_edge(source, target, &canonical_edge_attrs(attrs))
    }

    fn remove_node(&mut self, id: &str) -> Result<(), GraphStoreError> {
        if !self.has_node(id)? {
            return Err(GraphStoreError::NodeNotFound(id.to_string()));
        }
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "DELETE FROM edges WHERE source = ?1 OR target = ?1",
                rusqlite::params![id],
            )?;
            tx.execute("DELETE FROM nodes WHERE id = ?1", rusqlite::params![id])?;
            tx.commit()
        })
    }

    fn nodes(&self) -> Result<Vec<String>, GraphStoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM nodes ORDER BY seq")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect()
        })
    }

    fn edges(&self) -> Result<Vec<EdgeRecord>, GraphStoreError> {
        self.query_edges(
            "SELECT source, target, relation, properties FROM edges ORDER BY seq",
            None,
        )
    }

    fn successors(&self, id: &str) -> Result<Vec<String>, GraphStoreError> {
        self.query_ids("SELECT target FROM edges WHERE source = ?1 ORDER BY seq", id)
    }

    fn predecessors(&self, id: &str) -> Result<Vec<String>, GraphStoreError> {
        self.query_ids("SELECT source FROM edges WHERE target = ?1 ORDER BY seq", id)
    }

    fn out_edges(&self, id: &str) -> Result<Vec<EdgeRecord>, GraphStoreError> {
        self.query_edges(
            "SELECT source, target, relation, properties FROM edges WHERE source = ?1 ORDER BY seq",
            Some(id),
        )
    }

    fn in_edges(&self, id: &str) -> Result<Vec<EdgeRecord>, GraphStoreError> {
        self.query_edges(
            "SELECT source, target, relation, properties FROM edges WHERE target = ?1 ORDER BY seq",
            Some(id),
        )
    }

    fn node_count(&self) -> Result<usize, GraphStoreError> {
        let count: i64 = self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))
        })?;
        row_count(count)
    }

    fn edge_count(&self) -> Result<usize, GraphStoreError> {
        let count: i64 = self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))
        })?;
        row_count(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_rows_are_normalized_on_read() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        store
            .with_conn(|conn| {
                conn.execute_batch(
                    r#"
                    INSERT INTO nodes (id, properties, updated_at) VALUES ('a', '{"type": "drug"}', 'now');
                    INSERT INTO nodes (id, properties, updated_at) VALUES ('b', '{}', 'now');
                    INSERT INTO edges (source, target, relation, properties, updated_at)
                        VALUES ('a', 'b', NULL, '{"edge": "inhibits", "chunk_id": "c7"}', 'now');
                    "#,
                )
            })
            .unwrap();

        let node = store.node_attrs("a").unwrap().unwrap();
        assert_eq!(Value::Object(node), json!({"sources": [{"type": "drug"}]}));

        let edge = store.edge_attrs("a", "b").unwrap().unwrap();
        assert_eq!(
            Value::Object(edge),
            json!({
                "relation": "inhibits",
                "sources": [{"relation": "inhibits", "edge": "inhibits", "chunk_id": "c7"}]
            })
        );
    }

    #[test]
    fn relation_column_fills_missing_label() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        store
            .with_conn(|conn| {
                conn.execute_batch(
                    r#"
                    INSERT INTO nodes (id, properties, updated_at) VALUES ('a', '{}', 'now');
                    INSERT INTO nodes (id, properties, updated_at) VALUES ('b', '{}', 'now');
                    INSERT INTO edges (source, target, relation, properties, updated_at)
                        VALUES ('a', 'b', 'binds', '{}', 'now');
                    "#,
                )
            })
            .unwrap();
        let edge = store.edge_attrs("a", "b").unwrap().unwrap();
        assert_eq!(edge["relation"], json!("binds"));
        assert_eq!(edge["sources"], json!([{"relation": "binds", "edge": "binds"}]));
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        {
            let mut store = SqliteGraphStore::new(&path).unwrap();
            store
                .add_edge("a", "b", json!({"relation": "r"}).as_object().cloned().unwrap())
                .unwrap();
        }
        let store = SqliteGraphStore::new(&path).unwrap();
        assert_eq!(store.nodes().unwrap(), vec!["a", "b"]);
        assert!(store.has_edge("a", "b").unwrap());
        assert_eq!(store.shortest_path("b", "a", false).unwrap(), vec!["b", "a"]);
        assert_eq!(store.node_count().unwrap(), 2);
        assert_eq!(store.edge_count().unwrap(), 1);
    }

    #[test]
    fn negative_row_count_is_a_backend_error() {
        assert_eq!(row_count(3).unwrap(), 3);
        assert!(matches!(row_count(-1), Err(GraphStoreError::Backend(_))));
    }
}
