use std::collections::BTreeMap;

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, warn};

use rotaplan_core::{DocId, FieldValue};

use crate::document::{sort_snapshot, CollectionPath, RawDocument};
use crate::error::StoreError;
use crate::traits::{ListenCallback, ListenEvent, ListenerId, RemoteStore, WriteOp};

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StoreError> {
    v.try_into()
        .map_err(|_| StoreError::Serialization(format!("invalid {label} length")))
}

fn encode_fields(fields: &BTreeMap<String, FieldValue>) -> Result<Vec<u8>, StoreError> {
    rmp_serde::to_vec(fields).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode_fields(bytes: &[u8]) -> Result<BTreeMap<String, FieldValue>, StoreError> {
    rmp_serde::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

struct Listener {
    id: u64,
    path: String,
    order_by: String,
    callback: ListenCallback,
}

/// SQLite-backed store: one `documents` table keyed by (collection, doc_id)
/// with msgpack-encoded field bags. Batch atomicity comes from a single
/// transaction per `commit`; listeners are re-queried and notified after it
/// lands.
pub struct SqliteStore {
    conn: Connection,
    listeners: Vec<Listener>,
    next_listener: u64,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self {
            conn,
            listeners: Vec::new(),
            next_listener: 0,
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self {
            conn,
            listeners: Vec::new(),
            next_listener: 0,
        })
    }

    pub fn documents(&self, path: &CollectionPath) -> Result<Vec<RawDocument>, StoreError> {
        Self::query_snapshot(&self.conn, path.as_str(), rotaplan_core::FIELD_ORDER)
    }

    pub fn document(
        &self,
        path: &CollectionPath,
        id: DocId,
    ) -> Result<Option<RawDocument>, StoreError> {
        let row: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT fields FROM documents WHERE collection = ?1 AND doc_id = ?2",
                rusqlite::params![path.as_str(), id.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .optional()?;
        match row {
            Some(bytes) => Ok(Some(RawDocument::new(id, decode_fields(&bytes)?))),
            None => Ok(None),
        }
    }

    fn query_snapshot(
        conn: &Connection,
        path: &str,
        order_by: &str,
    ) -> Result<Vec<RawDocument>, StoreError> {
        let mut stmt =
            conn.prepare("SELECT doc_id, fields FROM documents WHERE collection = ?1")?;
        let rows: Vec<(Vec<u8>, Vec<u8>)> = stmt
            .query_map(rusqlite::params![path], |row| {
                Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut docs = Vec::with_capacity(rows.len());
        for (id_bytes, field_bytes) in rows {
            let id = DocId::from_bytes(to_array::<16>(id_bytes, "doc_id")?);
            docs.push(RawDocument::new(id, decode_fields(&field_bytes)?));
        }
        // Field bags are opaque blobs to SQLite; order in Rust instead.
        sort_snapshot(&mut docs, order_by);
        Ok(docs)
    }

    fn notify(&mut self, path: &CollectionPath) -> Result<(), StoreError> {
        let mut events = Vec::new();
        for listener in &self.listeners {
            if listener.path == path.as_str() {
                let docs = Self::query_snapshot(&self.conn, &listener.path, &listener.order_by)?;
                events.push((listener.id, docs));
            }
        }
        for (id, docs) in events {
            if let Some(listener) = self.listeners.iter_mut().find(|l| l.id == id) {
                (listener.callback)(ListenEvent::Snapshot(docs));
            }
        }
        Ok(())
    }
}

impl RemoteStore for SqliteStore {
    fn listen(
        &mut self,
        path: &CollectionPath,
        order_by: &str,
        mut callback: ListenCallback,
    ) -> ListenerId {
        let id = self.next_listener;
        self.next_listener += 1;
        match Self::query_snapshot(&self.conn, path.as_str(), order_by) {
            Ok(docs) => callback(ListenEvent::Snapshot(docs)),
            Err(e) => {
                callback(ListenEvent::Error(e));
                return ListenerId(id);
            }
        }
        self.listeners.push(Listener {
            id,
            path: path.as_str().to_string(),
            order_by: order_by.to_string(),
            callback,
        });
        ListenerId(id)
    }

    fn unlisten(&mut self, listener: ListenerId) {
        self.listeners.retain(|l| l.id != listener.0);
    }

    fn allocate_id(&mut self) -> DocId {
        DocId::new()
    }

    fn commit(&mut self, path: &CollectionPath, ops: &[WriteOp]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for op in ops {
            match op {
                WriteOp::Create { id, fields } => {
                    let result = tx.execute(
                        "INSERT INTO documents (collection, doc_id, fields) VALUES (?1, ?2, ?3)",
                        rusqlite::params![
                            path.as_str(),
                            id.as_bytes().as_slice(),
                            encode_fields(fields)?,
                        ],
                    );
                    match result {
                        Ok(_) => {}
                        Err(rusqlite::Error::SqliteFailure(err, _))
                            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                        {
                            return Err(StoreError::Rejected(format!(
                                "create collision on document {id}"
                            )));
                        }
                        Err(e) => return Err(StoreError::Sqlite(e)),
                    }
                }
                WriteOp::Merge { id, fields } => {
                    let existing: Option<Vec<u8>> = tx
                        .query_row(
                            "SELECT fields FROM documents WHERE collection = ?1 AND doc_id = ?2",
                            rusqlite::params![path.as_str(), id.as_bytes().as_slice()],
                            |row| row.get(0),
                        )
                        .optional()?;
                    let mut merged = match existing {
                        Some(bytes) => decode_fields(&bytes)?,
                        None => BTreeMap::new(),
                    };
                    for (key, value) in fields {
                        merged.insert(key.clone(), value.clone());
                    }
                    tx.execute(
                        "INSERT INTO documents (collection, doc_id, fields) VALUES (?1, ?2, ?3)
                         ON CONFLICT (collection, doc_id) DO UPDATE SET
                             fields = excluded.fields,
                             updated_at = CAST(unixepoch('now','subsec') * 1000 AS INTEGER)",
                        rusqlite::params![
                            path.as_str(),
                            id.as_bytes().as_slice(),
                            encode_fields(&merged)?,
                        ],
                    )?;
                }
                WriteOp::Delete { id } => {
                    tx.execute(
                        "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
                        rusqlite::params![path.as_str(), id.as_bytes().as_slice()],
                    )?;
                }
            }
        }
        tx.commit()?;
        debug!(path = %path, ops = ops.len(), "committed batch");
        // The write has landed; a snapshot decode problem must not read as
        // a commit failure to callers.
        if let Err(error) = self.notify(path) {
            warn!(path = %path, error = %error, "post-commit notify failed");
        }
        Ok(())
    }
}
