//! Relationship getters over any backend.
//!
//! Foreign keys are plain id attributes, so these are filters over
//! `Storage::all`. Results are sorted by composite key.

use crate::model::entity::Entity;
use crate::model::kind::Kind;
use crate::model::value::AttrValue;
use crate::storage::{Storage, StoreResult};

/// Entities of `child` whose `foreign_key` attribute equals `parent_id`.
pub fn children(
    storage: &dyn Storage,
    child: Kind,
    foreign_key: &str,
    parent_id: &str,
) -> StoreResult<Vec<Entity>> {
    Ok(storage
        .all(Some(child))?
        .into_values()
        .filter(|entity| {
            entity
                .get(foreign_key)
                .and_then(AttrValue::as_text)
                .is_some_and(|value| value == parent_id)
        })
        .collect())
}

/// Cities belonging to `state`.
pub fn cities_of(storage: &dyn Storage, state: &Entity) -> StoreResult<Vec<Entity>> {
    children(storage, Kind::City, "state_id", state.id())
}

/// Places located in a City or owned by a User.
pub fn places_of(storage: &dyn Storage, parent: &Entity) -> StoreResult<Vec<Entity>> {
    match parent.kind() {
        Kind::City => children(storage, Kind::Place, "city_id", parent.id()),
        Kind::User => children(storage, Kind::Place, "user_id", parent.id()),
        _ => Ok(Vec::new()),
    }
}

/// Reviews written about a Place or by a User.
pub fn reviews_of(storage: &dyn Storage, parent: &Entity) -> StoreResult<Vec<Entity>> {
    match parent.kind() {
        Kind::Place => children(storage, Kind::Review, "place_id", parent.id()),
        Kind::User => children(storage, Kind::Review, "user_id", parent.id()),
        _ => Ok(Vec::new()),
    }
}

/// Amenities linked to `place`, in link order. Dangling ids are skipped.
pub fn amenities_of(storage: &dyn Storage, place: &Entity) -> StoreResult<Vec<Entity>> {
    let mut amenities = Vec::new();
    for id in place.amenity_ids() {
        if let Some(amenity) = storage.get(Kind::Amenity, id)? {
            amenities.push(amenity);
        }
    }
    Ok(amenities)
}
