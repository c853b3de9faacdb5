//! Shared fixtures for the benchmark suite.

use archon_ecs::{ComponentId, FieldType, Schema, Store};

/// Medium population for iteration-heavy benchmarks.
pub const AGENTS_MED: usize = 100_000;
/// Small population for per-entity structural benchmarks.
pub const AGENTS_SMALL: usize = 10_000;

pub struct World {
    pub store: Store,
    pub position: ComponentId,
    pub velocity: ComponentId,
    pub wealth: ComponentId,
}

pub fn make_world() -> World {
    let mut store = Store::new();
    let position = store.register_component(
        Schema::new("Position")
            .field("x", FieldType::F64)
            .field("y", FieldType::F64),
    );
    let velocity = store.register_component(
        Schema::new("Velocity")
            .field("vx", FieldType::F64)
            .field("vy", FieldType::F64),
    );
    let wealth = store.register_component(Schema::new("Wealth").field("value", FieldType::F64));
    World { store, position, velocity, wealth }
}

pub fn populate(world: &mut World, count: usize) {
    for i in 0..count {
        let entity = world.store.create_entity().unwrap();
        let f = i as f64;
        world
            .store
            .add_components(
                entity,
                &[
                    (world.position, &[f, -f][..]),
                    (world.velocity, &[1.0, 0.5][..]),
                    (world.wealth, &[100.0][..]),
                ],
            )
            .unwrap();
    }
}
