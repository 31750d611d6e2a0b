use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use mewgenics_core::core_api::{CoreError, CoreErrorCode, RecordSource};
use mewgenics_core::record::RawRecord;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use tracing::debug;

/// Read-only view of a save file's `cats` and `files` tables.
pub struct SqliteSource {
    conn: Mutex<Connection>,
}

impl SqliteSource {
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("cannot open {}: {e}", path.display()),
            )
        })?;
        debug!(path = %path.display(), "opened save database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn storage_error(context: &str, err: rusqlite::Error) -> CoreError {
    CoreError::new(CoreErrorCode::Storage, format!("{context}: {err}"))
}

/// Blob columns are read as-is; text and integers are taken as their ASCII form.
fn value_bytes(value: ValueRef<'_>) -> Option<Vec<u8>> {
    match value {
        ValueRef::Blob(bytes) | ValueRef::Text(bytes) => Some(bytes.to_vec()),
        ValueRef::Integer(v) => Some(v.to_string().into_bytes()),
        ValueRef::Real(v) => Some(v.to_string().into_bytes()),
        ValueRef::Null => None,
    }
}

impl RecordSource for SqliteSource {
    fn fetch_record_bytes(&self, key: i64) -> Result<Option<Vec<u8>>, CoreError> {
        self.conn()
            .query_row("SELECT data FROM cats WHERE key = ?1", [key], |row| {
                Ok(value_bytes(row.get_ref(0)?))
            })
            .optional()
            .map(Option::flatten)
            .map_err(|e| storage_error("reading cats", e))
    }

    fn fetch_named_blob(&self, name: &str) -> Result<Option<Vec<u8>>, CoreError> {
        self.conn()
            .query_row("SELECT data FROM files WHERE key = ?1", [name], |row| {
                Ok(value_bytes(row.get_ref(0)?))
            })
            .optional()
            .map(Option::flatten)
            .map_err(|e| storage_error("reading files", e))
    }

    fn records(&self) -> Result<Vec<RawRecord>, CoreError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT key, data FROM cats ORDER BY key")
            .map_err(|e| storage_error("listing cats", e))?;
        let rows = stmt
            .query_map([], |row| {
                let key: i64 = row.get(0)?;
                Ok(value_bytes(row.get_ref(1)?).map(|bytes| RawRecord { key, bytes }))
            })
            .map_err(|e| storage_error("listing cats", e))?;

        let mut records = Vec::new();
        for row in rows {
            if let Some(record) = row.map_err(|e| storage_error("listing cats", e))? {
                records.push(record);
            }
        }
        debug!(count = records.len(), "enumerated stored records");
        Ok(records)
    }
}
