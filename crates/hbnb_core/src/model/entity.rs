//! Entity record shared by every kind.
//!
//! # Responsibility
//! - Own identity (`kind` + `id`) and the two lifecycle timestamps.
//! - Hold kind-specific attributes as a typed-on-write attribute bag.
//! - Convert to and from the schema-free persisted record.
//!
//! # Invariants
//! - `id` is generated at construction when absent and never changes.
//! - `created_at` is fixed at construction; `updated_at` moves on `touch()`.
//! - Timestamps carry microsecond precision so the textual encoding
//!   round-trips exactly.
//! - Equality is identity: two entities are equal iff kind and id match.

use crate::model::kind::Kind;
use crate::model::value::{python_str, AttrValue};
use crate::storage::{Storage, StoreResult};
use chrono::{NaiveDateTime, SubsecRound, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Fixed textual timestamp encoding used by every persisted form.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Record key naming the kind of a persisted entity.
pub const DISCRIMINATOR: &str = "__class__";

/// Attribute names owned by the entity itself, never set through `set`.
pub const PROTECTED_ATTRIBUTES: &[&str] = &["id", "created_at", "updated_at", DISCRIMINATOR];

/// Error converting a persisted record back into an entity.
#[derive(Debug)]
pub enum EntityError {
    UnknownKind(String),
    InvalidTimestamp { field: &'static str, value: String },
    InvalidData(String),
}

impl Display for EntityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownKind(name) => write!(f, "unknown entity kind `{name}`"),
            Self::InvalidTimestamp { field, value } => {
                write!(f, "invalid timestamp `{value}` in `{field}`")
            }
            Self::InvalidData(message) => write!(f, "invalid entity record: {message}"),
        }
    }
}

impl Error for EntityError {}

#[derive(Deserialize)]
struct EntityRecord {
    #[serde(rename = "__class__")]
    class: String,
    id: String,
    created_at: String,
    updated_at: String,
    #[serde(flatten)]
    attrs: BTreeMap<String, AttrValue>,
}

/// Live instance of one kind.
#[derive(Debug, Clone)]
pub struct Entity {
    kind: Kind,
    id: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    attrs: BTreeMap<String, AttrValue>,
}

/// Builds the registry key `"<KindName>.<id>"`.
pub fn composite_key(kind: Kind, id: &str) -> String {
    format!("{}.{}", kind.name(), id)
}

/// Current time truncated to the precision of the textual encoding.
pub fn now_timestamp() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(6)
}

pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(field: &'static str, value: &str) -> Result<NaiveDateTime, EntityError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_PARSE_FORMAT).map_err(|_| {
        EntityError::InvalidTimestamp {
            field,
            value: value.to_string(),
        }
    })
}

impl Entity {
    /// Creates a new entity with a generated id and fresh timestamps.
    pub fn new(kind: Kind) -> Self {
        Self::with_id(kind, Uuid::new_v4().to_string())
    }

    /// Creates a new entity with a caller-provided id.
    pub fn with_id(kind: Kind, id: impl Into<String>) -> Self {
        let now = now_timestamp();
        Self {
            kind,
            id: id.into(),
            created_at: now,
            updated_at: now,
            attrs: BTreeMap::new(),
        }
    }

    /// Rebuilds an entity from already-decoded parts (query materialization).
    pub fn from_parts(
        kind: Kind,
        id: String,
        created_at: NaiveDateTime,
        updated_at: NaiveDateTime,
        attrs: BTreeMap<String, AttrValue>,
    ) -> Self {
        Self {
            kind,
            id,
            created_at,
            updated_at,
            attrs,
        }
    }

    /// Rebuilds an entity from its persisted record.
    ///
    /// # Errors
    /// - `UnknownKind` when the discriminator names no known kind.
    /// - `InvalidTimestamp` / `InvalidData` for malformed records.
    pub fn from_record(record: serde_json::Value) -> Result<Self, EntityError> {
        let record: EntityRecord = serde_json::from_value(record)
            .map_err(|err| EntityError::InvalidData(err.to_string()))?;
        let kind = Kind::from_name(&record.class)
            .ok_or_else(|| EntityError::UnknownKind(record.class.clone()))?;

        Ok(Self {
            kind,
            id: record.id,
            created_at: parse_timestamp("created_at", &record.created_at)?,
            updated_at: parse_timestamp("updated_at", &record.updated_at)?,
            attrs: record.attrs,
        })
    }

    /// Converts this entity to its persisted record, discriminator included.
    pub fn to_record(&self) -> serde_json::Value {
        let mut record = serde_json::Map::new();
        record.insert(
            DISCRIMINATOR.to_string(),
            serde_json::Value::String(self.kind.name().to_string()),
        );
        record.insert("id".to_string(), serde_json::Value::String(self.id.clone()));
        record.insert(
            "created_at".to_string(),
            serde_json::Value::String(format_timestamp(&self.created_at)),
        );
        record.insert(
            "updated_at".to_string(),
            serde_json::Value::String(format_timestamp(&self.updated_at)),
        );
        for (name, value) in &self.attrs {
            record.insert(name.clone(), value.to_json());
        }
        serde_json::Value::Object(record)
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn key(&self) -> String {
        composite_key(self.kind, &self.id)
    }

    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn updated_at(&self) -> NaiveDateTime {
        self.updated_at
    }

    /// Refreshes `updated_at`; never moves it before `created_at`.
    pub fn touch(&mut self) {
        self.updated_at = now_timestamp().max(self.created_at);
    }

    pub fn attrs(&self) -> &BTreeMap<String, AttrValue> {
        &self.attrs
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// Sets one attribute, conforming it to the declared field type.
    ///
    /// Returns `false` (and leaves the entity unchanged) when `name` is
    /// protected or the value does not fit the declared type. Undeclared
    /// names are stored as given.
    pub fn set(&mut self, name: &str, value: AttrValue) -> bool {
        if PROTECTED_ATTRIBUTES.contains(&name) {
            return false;
        }

        let value = match self.kind.field(name) {
            Some(spec) => match value.conform(spec.ty) {
                Some(value) => value,
                None => return false,
            },
            None => value,
        };

        self.attrs.insert(name.to_string(), value);
        true
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        self.attrs.remove(name)
    }

    /// Appends an amenity id to a place's `amenity_ids`.
    ///
    /// Returns `false` when `self` is not a Place, `amenity` is not an
    /// Amenity, or the link already exists.
    pub fn link_amenity(&mut self, amenity: &Entity) -> bool {
        if self.kind != Kind::Place || amenity.kind != Kind::Amenity {
            return false;
        }

        let entry = self
            .attrs
            .entry("amenity_ids".to_string())
            .or_insert_with(|| AttrValue::List(Vec::new()));
        match entry {
            AttrValue::List(ids) if !ids.iter().any(|id| id == amenity.id()) => {
                ids.push(amenity.id().to_string());
                true
            }
            _ => false,
        }
    }

    /// Ids listed in `amenity_ids` (empty for non-places).
    pub fn amenity_ids(&self) -> &[String] {
        match self.attrs.get("amenity_ids") {
            Some(AttrValue::List(ids)) => ids.as_slice(),
            _ => &[],
        }
    }

    /// Registers this entity, refreshes `updated_at` and flushes the store.
    pub fn save(&mut self, storage: &mut dyn Storage) -> StoreResult<()> {
        self.touch();
        storage.new(self.clone())?;
        storage.save()
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.id == other.id
    }
}

impl Eq for Entity {}

impl Display for Entity {
    /// `[<Kind>] (<id>) {<python-style mapping>}`
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] ({}) {{'id': {}, 'created_at': {}, 'updated_at': {}",
            self.kind,
            self.id,
            python_str(&self.id),
            python_str(&format_timestamp(&self.created_at)),
            python_str(&format_timestamp(&self.updated_at)),
        )?;
        for (name, value) in &self.attrs {
            write!(f, ", {}: {}", python_str(name), value.to_python_literal())?;
        }
        f.write_str("}")
    }
}
