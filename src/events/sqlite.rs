// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! SQLite-backed event store

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use tracing::{debug, info};

use super::{Event, EventFilter, EventStore, RuleKind, StoredEvent};
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::inference::BoundingBox;

const SELECT_COLUMNS: &str = "SELECT id, camera_id, rule, zone, object_type, confidence, bbox, \
                              timestamp, duration_sec, snapshot_path FROM events";

/// Event store on a single SQLite connection
///
/// The connection sits behind a mutex, so concurrent writers from several
/// stream loops are serialized one insert at a time.
pub struct SqliteEventStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEventStore {
    /// Open or create the database file
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        // Create parent directories
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&config.path)?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        "#,
        )?;

        let store = Self::from_connection(conn)?;
        info!("Event store opened at {:?}", config.path);
        Ok(store)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.create_tables()?;
        Ok(store)
    }

    fn create_tables(&self) -> Result<()> {
        let conn = self.conn.lock();

        // Column order is part of the on-disk contract
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                camera_id INTEGER,
                rule TEXT,
                zone TEXT,
                object_type TEXT,
                confidence REAL,
                bbox TEXT,
                timestamp REAL,
                duration_sec REAL,
                snapshot_path TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_events_camera ON events(camera_id);
            CREATE INDEX IF NOT EXISTS idx_events_rule ON events(rule);
        "#,
        )?;

        Ok(())
    }

    /// Delete events older than `retention_days`
    pub fn purge_older_than(&self, retention_days: u32) -> Result<usize> {
        let conn = self.conn.lock();

        let cutoff = Utc::now() - chrono::Duration::days(retention_days as i64);
        let cutoff_secs = cutoff.timestamp_micros() as f64 / 1_000_000.0;

        let deleted = conn.execute("DELETE FROM events WHERE timestamp < ?1", params![cutoff_secs])?;

        info!("Purged {} events older than {} days", deleted, retention_days);
        Ok(deleted)
    }

    /// Database statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock();

        let event_count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;

        let size_bytes: i64 = conn
            .query_row(
                "SELECT page_count * page_size as size FROM pragma_page_count(), pragma_page_size()",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        Ok(StoreStats {
            event_count: event_count as usize,
            size_bytes: size_bytes as u64,
        })
    }
}

impl EventStore for SqliteEventStore {
    fn insert(&self, event: &Event) -> Result<i64> {
        let conn = self.conn.lock();

        conn.execute(
            r#"INSERT INTO events
               (camera_id, rule, zone, object_type, confidence, bbox, timestamp, duration_sec, snapshot_path)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
            params![
                event.camera_id,
                event.rule.as_str(),
                event.zone,
                event.object_type,
                event.confidence,
                event.bbox.to_text(),
                event.timestamp,
                event.duration_sec,
                event.snapshot_path,
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!(id, rule = %event.rule, zone = %event.zone, "Event stored");
        Ok(id)
    }

    fn query(&self, filter: &EventFilter) -> Result<Vec<StoredEvent>> {
        let conn = self.conn.lock();

        let mut sql = format!("{} WHERE 1=1", SELECT_COLUMNS);
        let mut args: Vec<Value> = Vec::new();

        if let Some(camera_id) = filter.camera_id {
            args.push(Value::Integer(camera_id));
            sql.push_str(&format!(" AND camera_id = ?{}", args.len()));
        }
        if let Some(rule) = filter.rule {
            args.push(Value::Text(rule.as_str().to_string()));
            sql.push_str(&format!(" AND rule = ?{}", args.len()));
        }
        sql.push_str(" ORDER BY id ASC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(args))?;

        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(row_to_event(row)?);
        }

        Ok(results)
    }

    fn get(&self, id: i64) -> Result<StoredEvent> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_COLUMNS))?;
        let mut rows = stmt.query(params![id])?;

        match rows.next()? {
            Some(row) => row_to_event(row),
            None => Err(Error::NotFound(format!("event {}", id))),
        }
    }

    fn count(&self) -> Result<usize> {
        Ok(self.stats()?.event_count)
    }
}

fn row_to_event(row: &Row<'_>) -> Result<StoredEvent> {
    let id: i64 = row.get(0)?;
    let rule: String = row.get(2)?;
    let bbox_text: String = row.get(6)?;

    let rule = rule.parse::<RuleKind>()?;
    let bbox = BoundingBox::parse(&bbox_text)
        .ok_or_else(|| Error::Corrupt(format!("event {} has unreadable bbox '{}'", id, bbox_text)))?;

    Ok(StoredEvent {
        id,
        event: Event {
            camera_id: row.get(1)?,
            rule,
            zone: row.get(3)?,
            object_type: row.get(4)?,
            confidence: row.get(5)?,
            bbox,
            timestamp: row.get(7)?,
            duration_sec: row.get(8)?,
            snapshot_path: row.get(9)?,
        },
    })
}

#[derive(Debug, Clone)]
pub struct StoreStats {
    pub event_count: usize,
    pub size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::Detection;

    fn person(x: i32) -> Detection {
        Detection::new("person", 0.91, BoundingBox::new(x, x, x + 20, x + 20))
    }

    fn seeded() -> SqliteEventStore {
        let store = SqliteEventStore::open_in_memory().unwrap();
        store.insert(&Event::intrusion(1, "Gate", &person(10), 100.0)).unwrap();
        store.insert(&Event::loitering(1, "Gate", &person(10), 110.0, 10.0)).unwrap();
        store.insert(&Event::intrusion(2, "Dock", &person(50), 120.0)).unwrap();
        store
    }

    #[test]
    fn test_ids_start_at_one() {
        let store = SqliteEventStore::open_in_memory().unwrap();
        let id = store.insert(&Event::intrusion(1, "Gate", &person(0), 1.0)).unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn test_query_filters() {
        let store = seeded();

        assert_eq!(store.query(&EventFilter::default()).unwrap().len(), 3);

        let cam1 = store.query(&EventFilter::camera(1)).unwrap();
        assert_eq!(cam1.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 2]);

        let intrusions = store
            .query(&EventFilter {
                rule: Some(RuleKind::Intrusion),
                ..EventFilter::default()
            })
            .unwrap();
        assert_eq!(intrusions.len(), 2);

        let both = store
            .query(&EventFilter::camera(1).with_rule(RuleKind::Loitering))
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].event.duration_sec, Some(10.0));

        let limited = store
            .query(&EventFilter {
                limit: Some(1),
                ..EventFilter::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_get_round_trips_fields() {
        let store = seeded();
        let stored = store.get(3).unwrap();

        assert_eq!(stored.event.camera_id, 2);
        assert_eq!(stored.event.rule, RuleKind::Intrusion);
        assert_eq!(stored.event.zone, "Dock");
        assert_eq!(stored.event.bbox, BoundingBox::new(50, 50, 70, 70));
        assert_eq!(stored.event.duration_sec, None);
        assert_eq!(stored.event.snapshot_path, None);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = seeded();
        assert!(store.get(99).unwrap_err().is_not_found());
    }

    #[test]
    fn test_bbox_stored_as_text() {
        let store = seeded();
        let conn = store.conn.lock();
        let text: String = conn
            .query_row("SELECT bbox FROM events WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(text, "[10, 10, 30, 30]");
    }

    #[test]
    fn test_unreadable_bbox_is_an_error() {
        let store = seeded();
        store
            .conn
            .lock()
            .execute("UPDATE events SET bbox = 'not a box' WHERE id = 2", [])
            .unwrap();

        assert!(matches!(store.get(2), Err(Error::Corrupt(_))));
        assert!(matches!(store.query(&EventFilter::camera(1)), Err(Error::Corrupt(_))));
        assert_eq!(store.get(1).unwrap().id, 1);
    }

    #[test]
    fn test_count_and_purge() {
        let store = seeded();
        assert_eq!(store.count().unwrap(), 3);

        // Timestamps near the epoch are far past any retention window
        assert_eq!(store.purge_older_than(30).unwrap(), 3);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = std::env::temp_dir().join(format!("zonewatch-test-{}", std::process::id()));
        let config = DatabaseConfig {
            path: dir.join("nested").join("events.db"),
            ..DatabaseConfig::default()
        };

        let store = SqliteEventStore::open(&config).unwrap();
        store.insert(&Event::intrusion(1, "Gate", &person(0), 1.0)).unwrap();
        drop(store);

        let reopened = SqliteEventStore::open(&config).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
        drop(reopened);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
