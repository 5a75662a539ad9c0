use hbnb_core::{composite_key, AttrValue, Entity, EntityError, Kind};
use serde_json::json;

#[test]
fn new_entity_has_unique_id_and_equal_timestamps() {
    let first = Entity::new(Kind::State);
    let second = Entity::new(Kind::State);

    assert_ne!(first.id(), second.id());
    assert_eq!(first.created_at(), first.updated_at());
    assert_eq!(first.key(), format!("State.{}", first.id()));
}

#[test]
fn touch_moves_updated_at_forward_only() {
    let mut entity = Entity::new(Kind::User);
    let created = entity.created_at();
    entity.touch();

    assert_eq!(entity.created_at(), created);
    assert!(entity.updated_at() >= created);
}

#[test]
fn set_conforms_declared_fields_and_drops_mismatches() {
    let mut place = Entity::new(Kind::Place);

    assert!(place.set("number_rooms", AttrValue::Int(4)));
    assert!(place.set("latitude", AttrValue::Int(37)));
    assert!(!place.set("longitude", AttrValue::from("a")));
    assert!(!place.set("max_guest", AttrValue::Float(2.5)));
    assert!(place.set("nickname", AttrValue::Int(3)));

    assert_eq!(place.get("number_rooms"), Some(&AttrValue::Int(4)));
    assert_eq!(place.get("latitude"), Some(&AttrValue::Float(37.0)));
    assert_eq!(place.get("longitude"), None);
    assert_eq!(place.get("max_guest"), None);
    assert_eq!(place.get("nickname"), Some(&AttrValue::Int(3)));
}

#[test]
fn protected_attributes_cannot_be_set() {
    let mut user = Entity::new(Kind::User);
    let id = user.id().to_string();

    assert!(!user.set("id", AttrValue::from("other")));
    assert!(!user.set("created_at", AttrValue::from("2017-01-01T00:00:00.000000")));
    assert!(!user.set("__class__", AttrValue::from("State")));
    assert_eq!(user.id(), id);
    assert!(user.attrs().is_empty());
}

#[test]
fn equality_is_kind_plus_id_only() {
    let mut original = Entity::with_id(Kind::City, "c-1");
    let mut copy = original.clone();
    original.set("name", AttrValue::from("San Francisco"));
    copy.set("name", AttrValue::from("Oakland"));

    assert_eq!(original, copy);
    assert_ne!(original, Entity::with_id(Kind::State, "c-1"));
}

#[test]
fn record_roundtrip_restores_every_attribute_and_timestamp() {
    let mut place = Entity::new(Kind::Place);
    place.set("name", AttrValue::from("My house"));
    place.set("number_rooms", AttrValue::Int(4));
    place.set("latitude", AttrValue::Float(37.77));
    place.set("price_by_night", AttrValue::Int(0));
    place.touch();

    let record = place.to_record();
    assert_eq!(record["__class__"], json!("Place"));
    assert_eq!(record["number_rooms"], json!(4));

    let restored = Entity::from_record(record).unwrap();
    assert_eq!(restored, place);
    assert_eq!(restored.created_at(), place.created_at());
    assert_eq!(restored.updated_at(), place.updated_at());
    assert_eq!(restored.attrs(), place.attrs());
}

#[test]
fn float_with_zero_fraction_stays_float_through_record() {
    let mut place = Entity::new(Kind::Place);
    place.set("longitude", AttrValue::Float(-122.0));

    let restored = Entity::from_record(place.to_record()).unwrap();
    assert_eq!(restored.get("longitude"), Some(&AttrValue::Float(-122.0)));
}

#[test]
fn unknown_discriminator_is_rejected() {
    let record = json!({
        "__class__": "Galaxy",
        "id": "g-1",
        "created_at": "2017-09-28T21:03:54.052298",
        "updated_at": "2017-09-28T21:03:54.052302",
    });

    let err = Entity::from_record(record).unwrap_err();
    assert!(matches!(err, EntityError::UnknownKind(name) if name == "Galaxy"));
}

#[test]
fn malformed_timestamp_is_rejected() {
    let record = json!({
        "__class__": "State",
        "id": "s-1",
        "created_at": "yesterday",
        "updated_at": "2017-09-28T21:03:54.052302",
    });

    let err = Entity::from_record(record).unwrap_err();
    assert!(matches!(
        err,
        EntityError::InvalidTimestamp { field: "created_at", .. }
    ));
}

#[test]
fn display_uses_kind_id_and_python_mapping() {
    let mut place = Entity::with_id(Kind::Place, "p-1");
    place.set("city_id", AttrValue::from("0001"));
    place.set("name", AttrValue::from("My house"));
    place.set("number_rooms", AttrValue::Int(4));
    place.set("latitude", AttrValue::Float(37.77));

    let text = place.to_string();
    assert!(text.starts_with("[Place] (p-1) {'id': 'p-1', 'created_at': '"));
    assert!(text.contains("'city_id': '0001'"));
    assert!(text.contains("'name': 'My house'"));
    assert!(text.contains("'number_rooms': 4"));
    assert!(text.contains("'latitude': 37.77"));
    assert!(!text.contains("'longitude'"));
    assert!(text.ends_with('}'));
}

#[test]
fn link_amenity_only_links_places_to_amenities_once() {
    let mut place = Entity::new(Kind::Place);
    let amenity = Entity::new(Kind::Amenity);
    let state = Entity::new(Kind::State);

    assert!(place.link_amenity(&amenity));
    assert!(!place.link_amenity(&amenity));
    assert!(!place.link_amenity(&state));
    assert_eq!(place.amenity_ids(), [amenity.id().to_string()]);
}

#[test]
fn composite_key_joins_kind_name_and_id() {
    assert_eq!(composite_key(Kind::Review, "r-9"), "Review.r-9");
}
