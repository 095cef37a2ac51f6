// Benchmark for the simulation tick and its hot paths
// Run with: cargo bench --bench simulation_step

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Point2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use swarmslam::algorithms::confidence_map::ConfidenceMap;
use swarmslam::algorithms::occupancy_grid::create_environment;
use swarmslam::algorithms::raycast::sense;
use swarmslam::config::SimulationConfig;
use swarmslam::simulation::Simulation;

fn benchmark_step_by_agent_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_step_agents");

    for agents in [1usize, 2, 4, 8].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(agents), agents, |b, &count| {
            let mut config = SimulationConfig::default();
            config.agents.count = count;
            config.run.seed = Some(42);
            let mut sim = Simulation::new(config).expect("default config is valid");

            b.iter(|| black_box(sim.step()));
        });
    }

    group.finish();
}

fn benchmark_step_by_grid_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_step_grid");

    for size in [50usize, 100, 200, 300].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut config = SimulationConfig::default();
            config.environment.size = size;
            config.run.seed = Some(42);
            let mut sim = Simulation::new(config).expect("config is valid");

            b.iter(|| black_box(sim.step()));
        });
    }

    group.finish();
}

fn benchmark_sense(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let grid = create_environment(100, 15, 8, &mut rng);
    let position = Point2::new(50.0, 50.0);

    c.bench_function("sense_9_rays", |b| {
        b.iter(|| black_box(sense(&grid, black_box(&position), 0.3, 30.0, 9)));
    });
}

fn benchmark_map_decay(c: &mut Criterion) {
    let mut map = ConfidenceMap::new(300);

    c.bench_function("map_decay_300", |b| {
        b.iter(|| map.decay(black_box(0.95)));
    });
}

criterion_group!(
    benches,
    benchmark_step_by_agent_count,
    benchmark_step_by_grid_size,
    benchmark_sense,
    benchmark_map_decay
);
criterion_main!(benches);
