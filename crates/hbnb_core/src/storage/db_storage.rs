//! Relational backend over an embedded SQLite session.
//!
//! # Responsibility
//! - Translate registry operations into SQL on one long-lived connection.
//! - Group staged `new`/`delete` calls into one unit of work per `save`.
//! - Apply cascade deletes explicitly instead of relying on the schema.
//!
//! # Invariants
//! - The first staged write opens a transaction; reads see staged work.
//! - `save` commits all staged work or rolls all of it back.
//! - Referential checks are deferred to commit time.
//! - Schema reset runs at most once, on first session establishment, and
//!   only when configured.
//! - After `close`, every operation except `reload` fails with `Closed`.

use crate::config::RelationalConfig;
use crate::db::{open_db, open_db_in_memory, IN_MEMORY_DATABASE};
use crate::model::entity::{composite_key, format_timestamp, parse_timestamp, Entity};
use crate::model::kind::{FieldSpec, FieldType, Kind};
use crate::model::value::AttrValue;
use crate::storage::cascade::plan_cascade;
use crate::storage::{Registry, Storage, StoreError, StoreResult};
use log::{debug, error, info, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::BTreeMap;
use std::time::Instant;

/// Relational store bound to one SQLite database.
pub struct DbStorage {
    config: RelationalConfig,
    conn: Option<Connection>,
    reset_pending: bool,
}

impl DbStorage {
    /// Establishes the session, resetting the schema first if configured.
    ///
    /// # Errors
    /// Returns the connection/bootstrap failure; no half-open store is kept.
    pub fn open(config: RelationalConfig) -> StoreResult<Self> {
        info!(
            "event=storage_open module=db_storage status=start host={} user={} database={} reset={}",
            config.host, config.user, config.database, config.reset_schema
        );
        let reset_pending = config.reset_schema;
        let mut storage = Self {
            config,
            conn: None,
            reset_pending,
        };
        storage.establish()?;
        Ok(storage)
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    /// Whether staged work is waiting for `save`.
    pub fn has_pending_work(&self) -> bool {
        self.conn
            .as_ref()
            .is_some_and(|conn| !conn.is_autocommit())
    }

    fn establish(&mut self) -> StoreResult<()> {
        let conn = if self.config.database == IN_MEMORY_DATABASE {
            open_db_in_memory()?
        } else {
            open_db(&self.config.database, self.reset_pending)?
        };
        self.reset_pending = false;
        self.conn = Some(conn);
        Ok(())
    }

    fn conn(&self) -> StoreResult<&Connection> {
        self.conn.as_ref().ok_or(StoreError::Closed)
    }

    /// Opens the unit of work if none is active and returns the connection.
    fn staging_conn(&self) -> StoreResult<&Connection> {
        let conn = self.conn()?;
        if conn.is_autocommit() {
            conn.execute_batch("BEGIN DEFERRED;")?;
        }
        Ok(conn)
    }

    fn table_for(&self, kind: Kind) -> StoreResult<&'static str> {
        kind.table().ok_or(StoreError::UnsupportedKind(kind))
    }
}

impl Storage for DbStorage {
    fn backend_name(&self) -> &'static str {
        "db"
    }

    fn supports(&self, kind: Kind) -> bool {
        kind.table().is_some()
    }

    fn all(&self, kind: Option<Kind>) -> StoreResult<Registry> {
        let conn = self.conn()?;
        let kinds: Vec<Kind> = match kind {
            Some(kind) => vec![kind],
            None => Kind::all().to_vec(),
        };

        let mut objects = Registry::new();
        for kind in kinds.into_iter().filter(|kind| self.supports(*kind)) {
            for entity in query_entities(conn, kind, None)? {
                objects.insert(entity.key(), entity);
            }
        }
        Ok(objects)
    }

    fn get(&self, kind: Kind, id: &str) -> StoreResult<Option<Entity>> {
        let conn = self.conn()?;
        if !self.supports(kind) {
            return Ok(None);
        }
        Ok(query_entities(conn, kind, Some(id))?.into_iter().next())
    }

    fn new(&mut self, entity: Entity) -> StoreResult<()> {
        let table = self.table_for(entity.kind())?;
        let conn = self.staging_conn()?;
        upsert_entity(conn, table, &entity)?;
        if entity.kind() == Kind::Place {
            replace_amenity_links(conn, &entity)?;
        }
        debug!(
            "event=storage_new module=db_storage status=staged key={}",
            entity.key()
        );
        Ok(())
    }

    fn save(&mut self) -> StoreResult<()> {
        let conn = self.conn()?;
        if conn.is_autocommit() {
            return Ok(());
        }

        let started_at = Instant::now();
        match conn.execute_batch("COMMIT;") {
            Ok(()) => {
                info!(
                    "event=storage_save module=db_storage status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=storage_save module=db_storage status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                if !conn.is_autocommit() {
                    if let Err(rollback_err) = conn.execute_batch("ROLLBACK;") {
                        error!(
                            "event=storage_rollback module=db_storage status=error error={}",
                            rollback_err
                        );
                    }
                }
                Err(err.into())
            }
        }
    }

    fn delete(&mut self, entity: &Entity) -> StoreResult<()> {
        self.table_for(entity.kind())?;
        let conn = self.staging_conn()?;

        let plan = plan_cascade(entity, |dependent, parent_id| {
            let table = dependent.kind.table().ok_or(StoreError::UnsupportedKind(dependent.kind))?;
            let mut stmt = conn.prepare(&format!(
                "SELECT id FROM {table} WHERE {} = ?1 ORDER BY id;",
                dependent.foreign_key
            ))?;
            let ids = stmt
                .query_map([parent_id], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(ids)
        })?;

        for (kind, id) in &plan {
            match kind {
                Kind::Place => {
                    conn.execute("DELETE FROM place_amenity WHERE place_id = ?1;", [id])?;
                }
                Kind::Amenity => {
                    conn.execute("DELETE FROM place_amenity WHERE amenity_id = ?1;", [id])?;
                }
                _ => {}
            }
            let table = self.table_for(*kind)?;
            conn.execute(&format!("DELETE FROM {table} WHERE id = ?1;"), [id])?;
        }

        debug!(
            "event=storage_delete module=db_storage status=staged key={} removed={}",
            composite_key(entity.kind(), entity.id()),
            plan.len()
        );
        Ok(())
    }

    fn reload(&mut self) -> StoreResult<()> {
        match &self.conn {
            None => self.establish()?,
            Some(conn) if !conn.is_autocommit() => {
                warn!("event=storage_reload module=db_storage status=ok discarded=staged_work");
                conn.execute_batch("ROLLBACK;")?;
            }
            Some(_) => {}
        }
        debug!("event=storage_reload module=db_storage status=ok");
        Ok(())
    }

    fn count(&self, kind: Option<Kind>) -> StoreResult<usize> {
        let conn = self.conn()?;
        let kinds: Vec<Kind> = match kind {
            Some(kind) => vec![kind],
            None => Kind::all().to_vec(),
        };

        let mut total = 0usize;
        for table in kinds.into_iter().filter_map(Kind::table) {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))?;
            total += usize::try_from(count).unwrap_or_default();
        }
        Ok(total)
    }

    fn close(&mut self) -> StoreResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };

        if !conn.is_autocommit() {
            warn!("event=storage_close module=db_storage status=ok discarded=staged_work");
            conn.execute_batch("ROLLBACK;")?;
        }
        conn.close().map_err(|(_, err)| StoreError::from(err))?;
        info!("event=storage_close module=db_storage status=ok");
        Ok(())
    }
}

/// Columns stored directly on the kind's table (lists live in link tables).
fn scalar_fields(kind: Kind) -> impl Iterator<Item = &'static FieldSpec> {
    kind.fields()
        .iter()
        .filter(|spec| spec.ty != FieldType::IdList)
}

fn upsert_entity(conn: &Connection, table: &str, entity: &Entity) -> StoreResult<()> {
    let fields: Vec<&FieldSpec> = scalar_fields(entity.kind()).collect();
    let mut columns = vec!["id", "created_at", "updated_at"];
    columns.extend(fields.iter().map(|spec| spec.name));

    let placeholders: Vec<String> = (1..=columns.len()).map(|index| format!("?{index}")).collect();
    let assignments: Vec<String> = columns
        .iter()
        .skip(1)
        .map(|column| format!("{column} = excluded.{column}"))
        .collect();
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})
         ON CONFLICT(id) DO UPDATE SET {};",
        columns.join(", "),
        placeholders.join(", "),
        assignments.join(", ")
    );

    let mut values = vec![
        Value::Text(entity.id().to_string()),
        Value::Text(format_timestamp(&entity.created_at())),
        Value::Text(format_timestamp(&entity.updated_at())),
    ];
    values.extend(fields.iter().map(|spec| column_value(spec, entity)));

    conn.execute(&sql, params_from_iter(values))?;
    Ok(())
}

fn column_value(spec: &FieldSpec, entity: &Entity) -> Value {
    match entity.get(spec.name).cloned().and_then(|value| value.conform(spec.ty)) {
        Some(AttrValue::Int(value)) => Value::Integer(value),
        Some(AttrValue::Float(value)) => Value::Real(value),
        Some(AttrValue::Text(value)) => Value::Text(value),
        Some(AttrValue::List(_)) | None => {
            if spec.ty == FieldType::Integer && !spec.nullable {
                Value::Integer(0)
            } else {
                Value::Null
            }
        }
    }
}

fn replace_amenity_links(conn: &Connection, place: &Entity) -> StoreResult<()> {
    conn.execute(
        "DELETE FROM place_amenity WHERE place_id = ?1;",
        [place.id()],
    )?;
    for amenity_id in place.amenity_ids() {
        conn.execute(
            "INSERT OR IGNORE INTO place_amenity (place_id, amenity_id) VALUES (?1, ?2);",
            params![place.id(), amenity_id],
        )?;
    }
    Ok(())
}

fn query_entities(conn: &Connection, kind: Kind, id: Option<&str>) -> StoreResult<Vec<Entity>> {
    let table = kind.table().ok_or(StoreError::UnsupportedKind(kind))?;
    let fields: Vec<&FieldSpec> = scalar_fields(kind).collect();
    let mut columns = vec!["id", "created_at", "updated_at"];
    columns.extend(fields.iter().map(|spec| spec.name));

    let mut sql = format!("SELECT {} FROM {table}", columns.join(", "));
    if id.is_some() {
        sql.push_str(" WHERE id = ?1");
    }
    sql.push_str(" ORDER BY id;");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = match id {
        Some(id) => stmt.query([id])?,
        None => stmt.query([])?,
    };

    let mut entities = Vec::new();
    while let Some(row) = rows.next()? {
        let mut entity = parse_entity_row(kind, &fields, row)?;
        if kind == Kind::Place {
            let links = load_amenity_links(conn, entity.id())?;
            if !links.is_empty() {
                entity.set("amenity_ids", AttrValue::List(links));
            }
        }
        entities.push(entity);
    }
    Ok(entities)
}

fn parse_entity_row(kind: Kind, fields: &[&FieldSpec], row: &Row<'_>) -> StoreResult<Entity> {
    let id: String = row.get("id")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    let mut attrs = BTreeMap::new();
    for spec in fields {
        let value = match row.get::<_, Value>(spec.name)? {
            Value::Null => continue,
            Value::Integer(value) => AttrValue::Int(value),
            Value::Real(value) => AttrValue::Float(value),
            Value::Text(value) => AttrValue::Text(value),
            Value::Blob(_) => {
                return Err(StoreError::InvalidData(format!(
                    "unexpected blob in {}.{}",
                    kind.table().unwrap_or_default(),
                    spec.name
                )));
            }
        };
        attrs.insert(spec.name.to_string(), value);
    }

    Ok(Entity::from_parts(
        kind,
        id,
        parse_timestamp("created_at", &created_at)?,
        parse_timestamp("updated_at", &updated_at)?,
        attrs,
    ))
}

fn load_amenity_links(conn: &Connection, place_id: &str) -> StoreResult<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT amenity_id FROM place_amenity WHERE place_id = ?1 ORDER BY rowid;")?;
    let ids = stmt
        .query_map([place_id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(ids)
}
