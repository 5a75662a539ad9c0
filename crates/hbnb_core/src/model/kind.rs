//! Static kind table.
//!
//! # Responsibility
//! - Map kind names to their descriptor (table, typed fields, dependents).
//! - Reject unknown names without any reflective lookup.
//!
//! # Invariants
//! - Kind names are case-sensitive and unique.
//! - `BaseModel` is the only kind without a relational table.

use std::fmt::{Display, Formatter};

/// Every concrete entity kind known to the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    BaseModel,
    User,
    State,
    City,
    Amenity,
    Place,
    Review,
}

/// Declared scalar type of one entity attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    Float,
    /// Ordered list of referenced ids (`Place.amenity_ids`).
    IdList,
}

/// One declared attribute of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    /// Relational column may be NULL. Non-nullable integers default to `0`.
    pub nullable: bool,
}

/// Child kind that must be removed when its parent is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependent {
    pub kind: Kind,
    /// Attribute on the child holding the parent id.
    pub foreign_key: &'static str,
}

const fn field(name: &'static str, ty: FieldType, nullable: bool) -> FieldSpec {
    FieldSpec { name, ty, nullable }
}

const ALL_KINDS: &[Kind] = &[
    Kind::BaseModel,
    Kind::User,
    Kind::State,
    Kind::City,
    Kind::Amenity,
    Kind::Place,
    Kind::Review,
];

const USER_FIELDS: &[FieldSpec] = &[
    field("email", FieldType::Text, false),
    field("password", FieldType::Text, false),
    field("first_name", FieldType::Text, true),
    field("last_name", FieldType::Text, true),
];

const STATE_FIELDS: &[FieldSpec] = &[field("name", FieldType::Text, false)];

const CITY_FIELDS: &[FieldSpec] = &[
    field("state_id", FieldType::Text, false),
    field("name", FieldType::Text, false),
];

const AMENITY_FIELDS: &[FieldSpec] = &[field("name", FieldType::Text, false)];

const PLACE_FIELDS: &[FieldSpec] = &[
    field("city_id", FieldType::Text, false),
    field("user_id", FieldType::Text, false),
    field("name", FieldType::Text, false),
    field("description", FieldType::Text, true),
    field("number_rooms", FieldType::Integer, false),
    field("number_bathrooms", FieldType::Integer, false),
    field("max_guest", FieldType::Integer, false),
    field("price_by_night", FieldType::Integer, false),
    field("latitude", FieldType::Float, true),
    field("longitude", FieldType::Float, true),
    field("amenity_ids", FieldType::IdList, true),
];

const REVIEW_FIELDS: &[FieldSpec] = &[
    field("place_id", FieldType::Text, false),
    field("user_id", FieldType::Text, false),
    field("text", FieldType::Text, false),
];

const STATE_DEPENDENTS: &[Dependent] = &[Dependent {
    kind: Kind::City,
    foreign_key: "state_id",
}];

const CITY_DEPENDENTS: &[Dependent] = &[Dependent {
    kind: Kind::Place,
    foreign_key: "city_id",
}];

const USER_DEPENDENTS: &[Dependent] = &[
    Dependent {
        kind: Kind::Place,
        foreign_key: "user_id",
    },
    Dependent {
        kind: Kind::Review,
        foreign_key: "user_id",
    },
];

const PLACE_DEPENDENTS: &[Dependent] = &[Dependent {
    kind: Kind::Review,
    foreign_key: "place_id",
}];

impl Kind {
    /// Returns every kind in table order.
    pub fn all() -> &'static [Kind] {
        ALL_KINDS
    }

    /// Resolves a kind from its exact name.
    pub fn from_name(name: &str) -> Option<Kind> {
        ALL_KINDS.iter().copied().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::BaseModel => "BaseModel",
            Self::User => "User",
            Self::State => "State",
            Self::City => "City",
            Self::Amenity => "Amenity",
            Self::Place => "Place",
            Self::Review => "Review",
        }
    }

    /// Relational table backing this kind, if any.
    pub fn table(self) -> Option<&'static str> {
        match self {
            Self::BaseModel => None,
            Self::User => Some("users"),
            Self::State => Some("states"),
            Self::City => Some("cities"),
            Self::Amenity => Some("amenities"),
            Self::Place => Some("places"),
            Self::Review => Some("reviews"),
        }
    }

    /// Declared attributes beyond `id`/`created_at`/`updated_at`.
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            Self::BaseModel => &[],
            Self::User => USER_FIELDS,
            Self::State => STATE_FIELDS,
            Self::City => CITY_FIELDS,
            Self::Amenity => AMENITY_FIELDS,
            Self::Place => PLACE_FIELDS,
            Self::Review => REVIEW_FIELDS,
        }
    }

    pub fn field(self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|spec| spec.name == name)
    }

    /// Kinds holding a foreign key to this kind, removed on cascade delete.
    pub fn dependents(self) -> &'static [Dependent] {
        match self {
            Self::State => STATE_DEPENDENTS,
            Self::City => CITY_DEPENDENTS,
            Self::User => USER_DEPENDENTS,
            Self::Place => PLACE_DEPENDENTS,
            Self::BaseModel | Self::Amenity | Self::Review => &[],
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldType, Kind};

    #[test]
    fn from_name_is_exact_and_case_sensitive() {
        assert_eq!(Kind::from_name("State"), Some(Kind::State));
        assert_eq!(Kind::from_name("BaseModel"), Some(Kind::BaseModel));
        assert_eq!(Kind::from_name("state"), None);
        assert_eq!(Kind::from_name("Galaxy"), None);
        assert_eq!(Kind::from_name(""), None);
    }

    #[test]
    fn every_kind_roundtrips_through_its_name() {
        for kind in Kind::all() {
            assert_eq!(Kind::from_name(kind.name()), Some(*kind));
        }
    }

    #[test]
    fn place_declares_numeric_fields() {
        assert_eq!(
            Kind::Place.field("number_rooms").map(|spec| spec.ty),
            Some(FieldType::Integer)
        );
        assert_eq!(
            Kind::Place.field("latitude").map(|spec| spec.ty),
            Some(FieldType::Float)
        );
        assert!(Kind::Place.field("colour").is_none());
    }

    #[test]
    fn only_base_model_has_no_table() {
        let tableless: Vec<Kind> = Kind::all()
            .iter()
            .copied()
            .filter(|kind| kind.table().is_none())
            .collect();
        assert_eq!(tableless, vec![Kind::BaseModel]);
    }
}
