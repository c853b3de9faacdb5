use criterion::*;
use std::hint::black_box;

mod common;
use common::*;

fn iterate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");
    group.throughput(Throughput::Elements(AGENTS_MED as u64));

    group.bench_function("write_wealth_100k", |b| {
        b.iter_batched(
            || {
                let mut world = make_world();
                populate(&mut world, AGENTS_MED);
                let query = world.store.query(&[world.wealth]).unwrap();
                (world, query)
            },
            |(mut world, query)| {
                let wealth = world.wealth;
                world
                    .store
                    .each(query, |archetype| {
                        let rows = archetype.len();
                        let values = archetype
                            .get_column_mut(wealth, 0)
                            .and_then(|c| c.as_f64_mut())
                            .unwrap();
                        for value in &mut values[..rows] {
                            *value *= 1.0001;
                        }
                        Ok(())
                    })
                    .unwrap();
                black_box(world);
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("sum_position_100k", |b| {
        b.iter_batched(
            || {
                let mut world = make_world();
                populate(&mut world, AGENTS_MED);
                let query = world.store.query(&[world.position]).unwrap();
                (world, query)
            },
            |(mut world, query)| {
                let position = world.position;
                let mut total = 0.0;
                world
                    .store
                    .each(query, |archetype| {
                        let rows = archetype.len();
                        let xs = archetype
                            .get_column(position, 0)
                            .and_then(|c| c.as_f64())
                            .unwrap();
                        for &x in &xs[..rows] {
                            total += x;
                        }
                        Ok(())
                    })
                    .unwrap();
                black_box(total);
                black_box(world);
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, iterate_benchmark);
criterion_main!(benches);
