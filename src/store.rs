//! SQLite-backed storage for machines and their workout entries.
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A piece of gym equipment the user tracks progress against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub id: i64,
    pub label: String,
    /// Photo captured at creation, as a `data:` URL.
    pub image: String,
}

/// One dated workout measurement for a machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub machine_id: i64,
    pub date: String,
    pub weight: f64,
    pub reps: f64,
    pub sets: f64,
}

/// Owner of the on-disk database. Both collections only ever grow.
pub struct LocalStore {
    conn: Connection,
}

impl LocalStore {
    /// Open (or create) the database file at `path` and bring the schema up
    /// to date.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        run_migrations(&conn)?;
        log::info!("Opened database at {}", path.display());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn create_machine(&self, label: &str, image: &str) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO machines (label, image) VALUES (?1, ?2)",
            params![label, image],
        )?;
        let id = self.conn.last_insert_rowid();
        log::info!("Created machine {id} ({label})");
        Ok(id)
    }

    /// All machines in insertion order.
    pub fn list_machines(&self) -> StoreResult<Vec<Machine>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, label, image FROM machines ORDER BY id")?;
        let machines = stmt
            .query_map([], machine_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(machines)
    }

    pub fn get_machine(&self, id: i64) -> StoreResult<Option<Machine>> {
        let machine = self
            .conn
            .query_row(
                "SELECT id, label, image FROM machines WHERE id = ?1",
                [id],
                machine_from_row,
            )
            .optional()?;
        Ok(machine)
    }

    /// Insert an entry for `machine_id`.
    ///
    /// The machine is not checked for existence. NaN measurements are
    /// stored as NULL by SQLite and read back as NaN.
    pub fn create_entry(
        &self,
        machine_id: i64,
        date: &str,
        weight: f64,
        reps: f64,
        sets: f64,
    ) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO entries (machine_id, date, weight, reps, sets)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![machine_id, date, weight, reps, sets],
        )?;
        let id = self.conn.last_insert_rowid();
        log::info!("Created entry {id} for machine {machine_id} on {date}");
        Ok(id)
    }

    /// Entries for one machine, oldest date first. Entries sharing a date
    /// keep the order they were inserted in.
    pub fn list_entries_for_machine(&self, machine_id: i64) -> StoreResult<Vec<Entry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, machine_id, date, weight, reps, sets
             FROM entries WHERE machine_id = ?1
             ORDER BY date ASC, id ASC",
        )?;
        let entries = stmt
            .query_map([machine_id], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn count_entries_for_machine(&self, machine_id: i64) -> StoreResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE machine_id = ?1",
            [machine_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn machine_from_row(row: &Row<'_>) -> rusqlite::Result<Machine> {
    Ok(Machine {
        id: row.get(0)?,
        label: row.get(1)?,
        image: row.get(2)?,
    })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    let measurement = |idx: usize| -> rusqlite::Result<f64> {
        Ok(row.get::<_, Option<f64>>(idx)?.unwrap_or(f64::NAN))
    };
    Ok(Entry {
        id: row.get(0)?,
        machine_id: row.get(1)?,
        date: row.get(2)?,
        weight: measurement(3)?,
        reps: measurement(4)?,
        sets: measurement(5)?,
    })
}

fn run_migrations(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current_version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current_version < 1 {
        migration_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (?1)", [1])?;
        log::info!("Applied schema migration v1");
    }

    Ok(())
}

fn migration_v1(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS machines (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            label TEXT NOT NULL,
            image TEXT NOT NULL
        )",
        [],
    )?;

    // Measurements stay nullable: SQLite turns NaN into NULL on bind.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            machine_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            weight REAL,
            reps REAL,
            sets REAL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_entries_machine_date ON entries(machine_id, date)",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.date.as_str()).collect()
    }

    #[test]
    fn migrations_create_tables() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        // Running twice must be a no-op.
        run_migrations(&conn).unwrap();

        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('machines', 'entries')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(table_count, 2);

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn create_and_get_machine() {
        let store = LocalStore::open_in_memory().unwrap();
        let id = store.create_machine("Leg Press", "data:image/png;base64,AAAA").unwrap();

        let machine = store.get_machine(id).unwrap().expect("machine exists");
        assert_eq!(machine.label, "Leg Press");
        assert_eq!(machine.image, "data:image/png;base64,AAAA");
        assert!(store.get_machine(id + 1).unwrap().is_none());
    }

    #[test]
    fn machine_ids_are_distinct_and_increasing() {
        let store = LocalStore::open_in_memory().unwrap();
        let first = store.create_machine("Leg Press", "a").unwrap();
        let second = store.create_machine("Chest Fly", "b").unwrap();
        assert!(second > first);

        let machines = store.list_machines().unwrap();
        assert_eq!(machines.len(), 2);
        assert_eq!(machines[0].id, first);
        assert_eq!(machines[1].id, second);
    }

    #[test]
    fn entries_sorted_by_date_regardless_of_insert_order() {
        let store = LocalStore::open_in_memory().unwrap();
        let m = store.create_machine("Row", "img").unwrap();
        store.create_entry(m, "2024-03-01", 50.0, 10.0, 3.0).unwrap();
        store.create_entry(m, "2024-01-15", 45.0, 12.0, 3.0).unwrap();
        store.create_entry(m, "2024-02-10", 47.5, 10.0, 3.0).unwrap();

        let entries = store.list_entries_for_machine(m).unwrap();
        assert_eq!(dates(&entries), vec!["2024-01-15", "2024-02-10", "2024-03-01"]);
    }

    #[test]
    fn same_date_entries_keep_insertion_order() {
        let store = LocalStore::open_in_memory().unwrap();
        let m = store.create_machine("Row", "img").unwrap();
        let a = store.create_entry(m, "2024-01-10", 60.0, 8.0, 3.0).unwrap();
        store.create_entry(m, "2024-01-01", 55.0, 8.0, 3.0).unwrap();
        let b = store.create_entry(m, "2024-01-10", 40.0, 12.0, 3.0).unwrap();

        let entries = store.list_entries_for_machine(m).unwrap();
        let ids: Vec<i64> = entries.iter().skip(1).map(|e| e.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn entries_are_scoped_to_their_machine() {
        let store = LocalStore::open_in_memory().unwrap();
        let m1 = store.create_machine("Leg Press", "a").unwrap();
        let m2 = store.create_machine("Lat Pulldown", "b").unwrap();
        store.create_entry(m1, "2024-01-10", 100.0, 10.0, 3.0).unwrap();

        assert!(store.list_entries_for_machine(m2).unwrap().is_empty());
        assert_eq!(store.count_entries_for_machine(m1).unwrap(), 1);
        assert_eq!(store.count_entries_for_machine(m2).unwrap(), 0);
    }

    #[test]
    fn listing_twice_is_identical() {
        let store = LocalStore::open_in_memory().unwrap();
        let m = store.create_machine("Leg Press", "a").unwrap();
        store.create_entry(m, "2024-02-01", 110.0, 8.0, 3.0).unwrap();
        store.create_entry(m, "2024-01-10", 100.0, 10.0, 3.0).unwrap();

        assert_eq!(store.list_machines().unwrap(), store.list_machines().unwrap());
        let first: Vec<i64> = store.list_entries_for_machine(m).unwrap().iter().map(|e| e.id).collect();
        let second: Vec<i64> = store.list_entries_for_machine(m).unwrap().iter().map(|e| e.id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn nan_measurements_round_trip_as_nan() {
        let store = LocalStore::open_in_memory().unwrap();
        let m = store.create_machine("Leg Press", "a").unwrap();
        store.create_entry(m, "2024-01-10", f64::NAN, 10.0, 3.0).unwrap();

        let entries = store.list_entries_for_machine(m).unwrap();
        assert!(entries[0].weight.is_nan());
        assert_eq!(entries[0].reps, 10.0);
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gym.db");

        let id = {
            let store = LocalStore::open(&path).unwrap();
            let id = store.create_machine("Leg Press", "a").unwrap();
            store.create_entry(id, "2024-01-10", 100.0, 10.0, 3.0).unwrap();
            id
        };

        let store = LocalStore::open(&path).unwrap();
        assert_eq!(store.list_machines().unwrap().len(), 1);
        assert_eq!(store.list_entries_for_machine(id).unwrap().len(), 1);
        // AUTOINCREMENT never hands out an old id again.
        let next = store.create_machine("Chest Press", "b").unwrap();
        assert!(next > id);
    }
}
