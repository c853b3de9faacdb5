// Structural mutation coverage: component add/remove, swap-and-pop,
// whole-archetype moves, and the slot-indexed mirror.
//
// Run:
//   cargo test --test structural -- --nocapture

use archon_ecs::{AccessError, EcsError, FieldType, Schema, Store};

fn world_with_position() -> (Store, archon_ecs::ComponentId) {
    let mut store = Store::new();
    let position = store.register_component(
        Schema::new("Position")
            .field("x", FieldType::F64)
            .field("y", FieldType::F64),
    );
    (store, position)
}

#[test]
fn add_then_read_roundtrip() {
    let (mut store, position) = world_with_position();
    let entity = store.create_entity().unwrap();

    store.add_component(entity, position, &[1.5, -2.5]).unwrap();

    assert!(store.has_component(entity, position).unwrap());
    assert_eq!(store.get_field(entity, position, 0).unwrap(), 1.5);
    assert_eq!(store.get_field(entity, position, 1).unwrap(), -2.5);
}

#[test]
fn second_add_overwrites_in_place() {
    let (mut store, position) = world_with_position();
    let entity = store.create_entity().unwrap();

    store.add_component(entity, position, &[1.0, 1.0]).unwrap();
    let archetype_before = store.archetype_of(entity).unwrap();
    let count_before = store.archetype_count();

    store.add_component(entity, position, &[9.0, 8.0]).unwrap();

    assert_eq!(store.archetype_of(entity).unwrap(), archetype_before);
    assert_eq!(store.archetype_count(), count_before);
    assert_eq!(store.get_field(entity, position, 0).unwrap(), 9.0);
    assert_eq!(store.get_field(entity, position, 1).unwrap(), 8.0);
}

#[test]
fn remove_component_is_idempotent() {
    let (mut store, position) = world_with_position();
    let entity = store.create_entity().unwrap();

    store.add_component(entity, position, &[1.0, 2.0]).unwrap();
    store.remove_component(entity, position).unwrap();
    assert!(!store.has_component(entity, position).unwrap());

    // Removing an absent component is a no-op.
    store.remove_component(entity, position).unwrap();
    assert!(!store.has_component(entity, position).unwrap());
}

#[test]
fn operations_on_dead_entities_fail() {
    let (mut store, position) = world_with_position();
    let entity = store.create_entity().unwrap();
    store.destroy_entity(entity).unwrap();

    assert!(matches!(
        store.has_component(entity, position),
        Err(EcsError::Access(AccessError::DeadEntity { .. }))
    ));
    assert!(matches!(
        store.add_component(entity, position, &[0.0, 0.0]),
        Err(EcsError::Access(AccessError::DeadEntity { .. }))
    ));
}

#[test]
fn unknown_component_and_arity_are_rejected() {
    let (mut store, position) = world_with_position();
    let entity = store.create_entity().unwrap();

    assert!(matches!(
        store.add_component(entity, 99, &[]),
        Err(EcsError::Access(AccessError::UnknownComponent { component: 99 }))
    ));
    assert!(matches!(
        store.add_component(entity, position, &[1.0]),
        Err(EcsError::Access(AccessError::FieldCountMismatch { expected: 2, got: 1, .. }))
    ));
}

#[test]
fn swap_and_pop_preserves_every_other_row() {
    let mut store = Store::new();
    let data = store.register_component(
        Schema::new("Data")
            .field("a", FieldType::I32)
            .field("b", FieldType::I32)
            .field("c", FieldType::I32)
            .field("d", FieldType::I32)
            .field("e", FieldType::I32),
    );

    let mut entities = Vec::new();
    for i in 0..5 {
        let entity = store.create_entity().unwrap();
        let values: Vec<f64> = (0..5).map(|j| f64::from(10 * i + j)).collect();
        store.add_component(entity, data, &values).unwrap();
        entities.push(entity);
    }

    let check_survivors = |store: &Store, skip: &[usize]| {
        for (i, &entity) in entities.iter().enumerate() {
            if skip.contains(&i) {
                continue;
            }
            for j in 0..5 {
                assert_eq!(
                    store.get_field(entity, data, j).unwrap(),
                    f64::from(10 * i as i32 + j as i32),
                    "entity {i} field {j} corrupted by swap-and-pop"
                );
            }
        }
    };

    // Tail removal pops without a swap.
    store.destroy_entity(entities[4]).unwrap();
    check_survivors(&store, &[4]);

    // Middle removal swaps the tail row in.
    store.destroy_entity(entities[1]).unwrap();
    check_survivors(&store, &[4, 1]);

    // Head removal.
    store.destroy_entity(entities[0]).unwrap();
    check_survivors(&store, &[4, 1, 0]);

    assert_eq!(store.entity_count(), 2);
}

#[test]
fn identical_component_sequences_share_archetypes() {
    let (mut store, position) = world_with_position();
    let velocity = store.register_component(
        Schema::new("Velocity")
            .field("vx", FieldType::F64)
            .field("vy", FieldType::F64),
    );

    let first = store.create_entity().unwrap();
    store.add_component(first, position, &[0.0, 0.0]).unwrap();
    store.add_component(first, velocity, &[0.0, 0.0]).unwrap();
    let count_after_one = store.archetype_count();

    for _ in 0..10 {
        let entity = store.create_entity().unwrap();
        store.add_component(entity, position, &[0.0, 0.0]).unwrap();
        store.add_component(entity, velocity, &[0.0, 0.0]).unwrap();
    }

    assert_eq!(store.archetype_count(), count_after_one);
}

#[test]
fn add_components_moves_once() {
    let (mut store, position) = world_with_position();
    let velocity = store.register_component(
        Schema::new("Velocity")
            .field("vx", FieldType::F64)
            .field("vy", FieldType::F64),
    );
    let tag = store.register_tag("Marker");

    let entity = store.create_entity().unwrap();
    store
        .add_components(
            entity,
            &[
                (position, &[1.0, 2.0][..]),
                (velocity, &[3.0, 4.0][..]),
                (tag, &[][..]),
            ],
        )
        .unwrap();

    // Empty -> {position, velocity, tag}: exactly one new archetype.
    assert_eq!(store.archetype_count(), 2);
    assert!(store.has_component(entity, tag).unwrap());
    assert_eq!(store.get_field(entity, velocity, 1).unwrap(), 4.0);
}

#[test]
fn remove_components_moves_once() {
    let (mut store, position) = world_with_position();
    let velocity = store.register_component(
        Schema::new("Velocity")
            .field("vx", FieldType::F64)
            .field("vy", FieldType::F64),
    );

    let entity = store.create_entity().unwrap();
    store
        .add_components(entity, &[(position, &[1.0, 2.0][..]), (velocity, &[3.0, 4.0][..])])
        .unwrap();

    store.remove_components(entity, &[position, velocity]).unwrap();
    assert!(!store.has_component(entity, position).unwrap());
    assert!(!store.has_component(entity, velocity).unwrap());
    assert!(store.is_alive(entity));
}

#[test]
fn dense_growth_preserves_rows() {
    let (mut store, position) = world_with_position();

    // Push well past the initial dense and sparse capacities.
    let mut entities = Vec::new();
    for i in 0..100 {
        let entity = store.create_entity().unwrap();
        store
            .add_component(entity, position, &[f64::from(i), f64::from(-i)])
            .unwrap();
        entities.push(entity);
    }

    for (i, &entity) in entities.iter().enumerate() {
        assert_eq!(store.get_field(entity, position, 0).unwrap(), i as f64);
        assert_eq!(store.get_field(entity, position, 1).unwrap(), -(i as f64));
    }
}

#[test]
fn batch_add_moves_whole_archetype() {
    let (mut store, position) = world_with_position();
    let frozen = store.register_tag("Frozen");

    let mut entities = Vec::new();
    for i in 0..20 {
        let entity = store.create_entity().unwrap();
        store
            .add_component(entity, position, &[f64::from(i), 0.0])
            .unwrap();
        entities.push(entity);
    }

    let source = store.archetype_of(entities[0]).unwrap();
    store.batch_add_component(source, frozen, &[]).unwrap();

    for (i, &entity) in entities.iter().enumerate() {
        assert!(store.has_component(entity, frozen).unwrap());
        assert_eq!(store.get_field(entity, position, 0).unwrap(), i as f64);
    }

    // The emptied source stays registered.
    assert_eq!(store.archetype(source).len(), 0);
    let target = store.archetype_of(entities[0]).unwrap();
    assert_ne!(source, target);
    assert_eq!(store.archetype(target).len(), 20);
}

#[test]
fn batch_add_broadcasts_values() {
    let (mut store, position) = world_with_position();
    let health = store.register_component(Schema::new("Health").field("points", FieldType::I32));

    for _ in 0..5 {
        let entity = store.create_entity().unwrap();
        store.add_component(entity, position, &[0.0, 0.0]).unwrap();
    }
    let source = {
        let entity = store.create_entity().unwrap();
        store.add_component(entity, position, &[0.0, 0.0]).unwrap();
        store.archetype_of(entity).unwrap()
    };

    store.batch_add_component(source, health, &[50.0]).unwrap();

    let target_entities: Vec<_> = {
        let query = store.query(&[health]).unwrap();
        let ids = store.matched(query).to_vec();
        ids.iter()
            .flat_map(|&id| store.archetype(id).entities().to_vec())
            .collect()
    };
    assert_eq!(target_entities.len(), 6);
    for entity in target_entities {
        assert_eq!(store.get_field(entity, health, 0).unwrap(), 50.0);
    }
}

#[test]
fn batch_add_is_noop_when_component_present() {
    let (mut store, position) = world_with_position();
    let entity = store.create_entity().unwrap();
    store.add_component(entity, position, &[7.0, 7.0]).unwrap();

    let source = store.archetype_of(entity).unwrap();
    store.batch_add_component(source, position, &[0.0, 0.0]).unwrap();

    assert_eq!(store.archetype_of(entity).unwrap(), source);
    assert_eq!(store.get_field(entity, position, 0).unwrap(), 7.0);
}

#[test]
fn batch_remove_moves_whole_archetype() {
    let (mut store, position) = world_with_position();
    let marker = store.register_tag("Marker");

    let mut entities = Vec::new();
    for i in 0..8 {
        let entity = store.create_entity().unwrap();
        store
            .add_components(entity, &[(position, &[f64::from(i), 1.0][..]), (marker, &[][..])])
            .unwrap();
        entities.push(entity);
    }

    let source = store.archetype_of(entities[0]).unwrap();
    store.batch_remove_component(source, marker).unwrap();

    for (i, &entity) in entities.iter().enumerate() {
        assert!(!store.has_component(entity, marker).unwrap());
        assert_eq!(store.get_field(entity, position, 0).unwrap(), i as f64);
    }

    // Removing a component the source lacks is a no-op.
    let target = store.archetype_of(entities[0]).unwrap();
    store.batch_remove_component(target, marker).unwrap();
    assert_eq!(store.archetype_of(entities[0]).unwrap(), target);
}

#[test]
fn mirror_columns_track_writes_and_poison_on_destroy() {
    let (mut store, position) = world_with_position();
    let entity = store.create_entity().unwrap();
    let slot = entity.slot();

    store.add_component(entity, position, &[4.0, 5.0]).unwrap();
    assert_eq!(store.components().get_field(position, slot, 0).unwrap(), 4.0);

    store.set_field(entity, position, 1, 11.0).unwrap();
    assert_eq!(store.components().get_field(position, slot, 1).unwrap(), 11.0);

    store.destroy_entity(entity).unwrap();
    assert!(store.components().get_field(position, slot, 0).unwrap().is_nan());
}

#[test]
fn membership_maps_survive_churn() {
    let (mut store, position) = world_with_position();
    let velocity = store.register_component(
        Schema::new("Velocity")
            .field("vx", FieldType::F64)
            .field("vy", FieldType::F64),
    );
    let marker = store.register_tag("Marker");

    let mut entities = Vec::new();
    for i in 0..30usize {
        let entity = store.create_entity().unwrap();
        if i % 2 == 0 {
            store.add_component(entity, position, &[i as f64, 0.0]).unwrap();
        }
        if i % 3 == 0 {
            store.add_component(entity, velocity, &[0.0, i as f64]).unwrap();
        }
        if i % 7 == 0 {
            store.add_component(entity, marker, &[]).unwrap();
        }
        entities.push(entity);
    }
    for (i, &entity) in entities.iter().enumerate() {
        if i % 5 == 0 {
            store.destroy_entity(entity).unwrap();
        } else if i % 4 == 0 {
            store.remove_component(entity, position).unwrap();
        }
    }

    // Dense and sparse membership agree everywhere, and the live entities
    // are exactly the rows of all archetypes.
    let everything = store.query(&[]).unwrap();
    let mut total = 0;
    for &id in store.matched(everything) {
        let archetype = store.archetype(id);
        total += archetype.len();
        for row in 0..archetype.len() {
            let entity = archetype.entity_at(row);
            assert!(store.is_alive(entity));
            assert_eq!(archetype.row_of(entity.slot()), Some(row));
            assert_eq!(store.archetype_of(entity).unwrap(), id);
        }
    }
    assert_eq!(total, store.entity_count());
}

#[test]
fn tags_participate_in_signatures_without_storage() {
    let mut store = Store::new();
    let marker = store.register_tag("Marker");
    assert!(store.components().is_tag(marker).unwrap());

    let entity = store.create_entity().unwrap();
    store.add_component(entity, marker, &[]).unwrap();
    assert!(store.has_component(entity, marker).unwrap());

    let archetype = store.archetype_of(entity).unwrap();
    assert_eq!(store.archetype(archetype).field_count(marker), Some(0));
}
