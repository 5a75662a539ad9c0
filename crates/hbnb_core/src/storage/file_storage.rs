//! JSON-file backend.
//!
//! # Responsibility
//! - Hold the whole registry in memory.
//! - Flush it to one flat JSON document keyed by `"<Kind>.<id>"`.
//! - Rebuild entities from that document through the kind discriminator.
//!
//! # Invariants
//! - `save` writes a temp file in the target directory and renames it over
//!   the document, so an interrupted write never corrupts the last flush.
//! - A missing document is an empty store, not an error.
//! - An unknown discriminator or key/record mismatch aborts the reload and
//!   leaves the in-memory registry untouched.
//! - A failed `save` restores the registry to its last durable state.

use crate::model::entity::{composite_key, Entity};
use crate::model::kind::{Dependent, Kind};
use crate::model::value::AttrValue;
use crate::storage::cascade::plan_cascade;
use crate::storage::{Registry, Storage, StoreError, StoreResult};
use log::{debug, error, info};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;

/// File-backed object cache.
pub struct FileStorage {
    path: PathBuf,
    objects: Registry,
    /// Registry as of the last successful `save` or `reload`.
    durable: Registry,
}

impl FileStorage {
    /// Creates an empty store bound to `path`. Nothing is read until `reload`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            objects: Registry::new(),
            durable: Registry::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_document(&self) -> StoreResult<()> {
        let document: serde_json::Map<String, serde_json::Value> = self
            .objects
            .iter()
            .map(|(key, entity)| (key.clone(), entity.to_record()))
            .collect();
        let bytes = serde_json::to_vec(&document)?;

        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut staged = NamedTempFile::new_in(&directory)?;
        staged.write_all(&bytes)?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }

    fn read_document(&self) -> StoreResult<Option<Registry>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let document: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(&bytes)?;
        let mut objects = Registry::new();
        for (key, record) in document {
            let entity = Entity::from_record(record)?;
            if entity.key() != key {
                return Err(StoreError::InvalidData(format!(
                    "record under `{key}` describes `{}`",
                    entity.key()
                )));
            }
            objects.insert(key, entity);
        }

        Ok(Some(objects))
    }

    fn child_ids(&self, dependent: Dependent, parent_id: &str) -> Vec<String> {
        self.objects
            .values()
            .filter(|entity| entity.kind() == dependent.kind)
            .filter(|entity| {
                entity
                    .get(dependent.foreign_key)
                    .and_then(AttrValue::as_text)
                    .is_some_and(|value| value == parent_id)
            })
            .map(|entity| entity.id().to_string())
            .collect()
    }

    fn unlink_amenity(&mut self, amenity_id: &str) {
        for place in self
            .objects
            .values_mut()
            .filter(|entity| entity.kind() == Kind::Place)
        {
            let remaining: Vec<String> = place
                .amenity_ids()
                .iter()
                .filter(|id| id.as_str() != amenity_id)
                .cloned()
                .collect();
            if remaining.len() != place.amenity_ids().len() {
                place.set("amenity_ids", AttrValue::List(remaining));
            }
        }
    }
}

impl Storage for FileStorage {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    fn supports(&self, _kind: Kind) -> bool {
        true
    }

    fn all(&self, kind: Option<Kind>) -> StoreResult<Registry> {
        Ok(self
            .objects
            .iter()
            .filter(|(_, entity)| kind.map_or(true, |kind| entity.kind() == kind))
            .map(|(key, entity)| (key.clone(), entity.clone()))
            .collect())
    }

    fn get(&self, kind: Kind, id: &str) -> StoreResult<Option<Entity>> {
        Ok(self.objects.get(&composite_key(kind, id)).cloned())
    }

    fn new(&mut self, entity: Entity) -> StoreResult<()> {
        self.objects.insert(entity.key(), entity);
        Ok(())
    }

    fn save(&mut self) -> StoreResult<()> {
        let started_at = Instant::now();
        match self.write_document() {
            Ok(()) => {
                self.durable = self.objects.clone();
                info!(
                    "event=storage_save module=file_storage status=ok objects={} duration_ms={}",
                    self.objects.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=storage_save module=file_storage status=error duration_ms={} restored=durable error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                self.objects = self.durable.clone();
                Err(err)
            }
        }
    }

    fn delete(&mut self, entity: &Entity) -> StoreResult<()> {
        let plan = plan_cascade(entity, |dependent, parent_id| {
            Ok(self.child_ids(dependent, parent_id))
        })?;

        for (kind, id) in &plan {
            self.objects.remove(&composite_key(*kind, id));
        }
        if entity.kind() == Kind::Amenity {
            self.unlink_amenity(entity.id());
        }

        debug!(
            "event=storage_delete module=file_storage status=ok kind={} removed={}",
            entity.kind(),
            plan.len()
        );
        Ok(())
    }

    fn reload(&mut self) -> StoreResult<()> {
        match self.read_document() {
            Ok(Some(objects)) => {
                info!(
                    "event=storage_reload module=file_storage status=ok objects={}",
                    objects.len()
                );
                self.durable = objects.clone();
                self.objects = objects;
                Ok(())
            }
            Ok(None) => {
                debug!("event=storage_reload module=file_storage status=ok document=missing");
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=storage_reload module=file_storage status=error error={}",
                    err
                );
                Err(err)
            }
        }
    }

    fn count(&self, kind: Option<Kind>) -> StoreResult<usize> {
        Ok(self
            .objects
            .values()
            .filter(|entity| kind.map_or(true, |kind| entity.kind() == kind))
            .count())
    }

    fn close(&mut self) -> StoreResult<()> {
        debug!("event=storage_close module=file_storage status=ok");
        Ok(())
    }
}
