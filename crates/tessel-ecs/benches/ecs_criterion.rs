//! ECS benchmarks using criterion for historical comparison.

use std::hint::black_box;

use bytemuck::{Pod, Zeroable};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tessel_ecs::{Entity, World};

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct Frozen(u8);

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct Damage {
    amount: u32,
}

fn populate(world: &mut World, count: u64) -> Vec<Entity> {
    (0..count)
        .map(|i| {
            let e = world.create_entity();
            world.add_component(
                e,
                Position {
                    x: i as f32,
                    y: 0.0,
                    z: 0.0,
                },
            );
            e
        })
        .collect()
}

fn create_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("create");

    for count in [1, 100, 1000, 10000] {
        group.throughput(Throughput::Elements(count));

        group.bench_with_input(BenchmarkId::new("empty", count), &count, |b, &count| {
            b.iter(|| {
                let mut world = World::new();
                for _ in 0..count {
                    black_box(world.create_entity());
                }
            });
        });

        group.bench_with_input(
            BenchmarkId::new("with_position", count),
            &count,
            |b, &count| {
                b.iter(|| {
                    let mut world = World::new();
                    black_box(populate(&mut world, count));
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("recycled", count), &count, |b, &count| {
            let mut world = World::new();
            b.iter(|| {
                let entities = populate(&mut world, count);
                for entity in entities {
                    world.destroy(entity);
                }
            });
        });
    }

    group.finish();
}

fn component_access_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("component_access");

    for count in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(count));

        group.bench_with_input(BenchmarkId::new("get", count), &count, |b, &count| {
            let mut world = World::new();
            let entities = populate(&mut world, count);

            b.iter(|| {
                for &entity in &entities {
                    black_box(world.component::<Position>(entity));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("get_mut", count), &count, |b, &count| {
            let mut world = World::new();
            let entities = populate(&mut world, count);

            b.iter(|| {
                for &entity in &entities {
                    world.component_mut::<Position>(entity).x += 1.0;
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("table_values", count), &count, |b, &count| {
            let mut world = World::new();
            populate(&mut world, count);

            b.iter(|| {
                let sum: f32 = world
                    .table::<Position>()
                    .map_or(0.0, |table| table.values::<Position>().iter().map(|p| p.x).sum());
                black_box(sum);
            });
        });
    }

    group.finish();
}

fn structural_change_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("structural_change");

    for count in [100, 1000] {
        group.throughput(Throughput::Elements(count));

        group.bench_with_input(
            BenchmarkId::new("add_component_with_queries", count),
            &count,
            |b, &count| {
                b.iter(|| {
                    let mut world = World::new();
                    world.query().with::<Position>().with::<Velocity>().build();
                    world.query().with::<Position>().without::<Velocity>().build();
                    world.query().with::<Velocity>().without::<Frozen>().build();

                    for entity in populate(&mut world, count) {
                        world.add_component(
                            entity,
                            Velocity {
                                x: 1.0,
                                y: 0.0,
                                z: 0.0,
                            },
                        );
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("remove_component", count),
            &count,
            |b, &count| {
                b.iter_batched(
                    || {
                        let mut world = World::new();
                        world.query().with::<Velocity>().build();
                        let entities = populate(&mut world, count);
                        for &e in &entities {
                            world.add_component(
                                e,
                                Velocity {
                                    x: 1.0,
                                    y: 0.0,
                                    z: 0.0,
                                },
                            );
                        }
                        (world, entities)
                    },
                    |(mut world, entities)| {
                        for entity in entities {
                            world.remove_component::<Velocity>(entity);
                        }
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn query_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    for count in [1000, 10000] {
        group.throughput(Throughput::Elements(count));

        group.bench_with_input(BenchmarkId::new("iterate", count), &count, |b, &count| {
            let mut world = World::new();
            let movers = world.query().with::<Position>().with::<Velocity>().build();
            for (i, e) in populate(&mut world, count).into_iter().enumerate() {
                if i % 2 == 0 {
                    world.add_component(
                        e,
                        Velocity {
                            x: 1.0,
                            y: 0.0,
                            z: 0.0,
                        },
                    );
                }
            }

            b.iter(|| {
                for e in movers.iter(&world) {
                    black_box(world.component::<Position>(e));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("late_build", count), &count, |b, &count| {
            b.iter_batched(
                || {
                    let mut world = World::new();
                    populate(&mut world, count);
                    world
                },
                |mut world| black_box(world.query().with::<Position>().build()),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn message_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("messages");

    for count in [100, 1000] {
        group.throughput(Throughput::Elements(count));

        group.bench_with_input(BenchmarkId::new("send_read_refresh", count), &count, |b, &count| {
            let mut world = World::new();
            b.iter(|| {
                for i in 0..count {
                    world.send_message(Damage { amount: i as u32 });
                }
                let total: u32 = world
                    .receive_all_messages::<Damage>()
                    .iter()
                    .map(|d| d.amount)
                    .sum();
                black_box(total);
                world.refresh();
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    create_benchmarks,
    component_access_benchmarks,
    structural_change_benchmarks,
    query_benchmarks,
    message_benchmarks,
);

criterion_main!(benches);
