//! End-to-end scenarios for the simulation loop

use nalgebra::Point2;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use swarmslam::agent::{Agent, AgentStatus, MoveOutcome, Neighbor};
use swarmslam::algorithms::navigation::decide;
use swarmslam::algorithms::occupancy_grid::{create_environment, generate_environment, Cell, Grid};
use swarmslam::algorithms::raycast::sense;
use swarmslam::config::{EnvironmentLayout, SimulationConfig};
use swarmslam::simulation::Simulation;

fn open_grid(size: usize) -> Grid {
    let mut grid = Grid::new(size);
    grid.apply_boundary(3);
    grid
}

#[test]
fn test_open_space_agent_never_gets_stuck() {
    let config = SimulationConfig::default();

    for seed in 1..=3 {
        let agent = Agent::new(0, Point2::new(25.0, 25.0), 0.0, &config.agents);
        let mut sim =
            Simulation::from_parts(config.clone(), open_grid(50), vec![agent], seed).unwrap();

        let mut rates = Vec::new();
        for _ in 0..200 {
            let stats = sim.step().unwrap();
            assert_eq!(
                stats.stuck_agents, 0,
                "seed {} tick {}: false stuck in open space",
                seed, stats.tick
            );
            assert_eq!(sim.agents()[0].status, AgentStatus::Normal);
            rates.push(stats.exploration_rate);
        }

        assert!(rates.windows(2).all(|w| w[1] >= w[0]));
        let first = rates.first().copied().unwrap_or_default();
        let last = rates.last().copied().unwrap_or_default();
        assert!(last > first, "seed {}: exploration did not grow", seed);
    }
}

#[test]
fn test_enclosed_agent_escalates_to_emergency() {
    let config = SimulationConfig::default();
    let mut grid = Grid::filled(50, Cell::Occupied);
    grid.set_free(25, 25);

    let start = Point2::new(25.5, 25.5);
    let agent = Agent::new(0, start, 0.0, &config.agents);
    let mut sim = Simulation::from_parts(config, grid, vec![agent], 7).unwrap();

    let mut stuck_at = None;
    let mut emergency_at = None;
    for _ in 0..80 {
        sim.step();
        let agent = &sim.agents()[0];
        assert_eq!(agent.position, start);

        match agent.status {
            AgentStatus::Stuck if stuck_at.is_none() => stuck_at = Some(sim.tick()),
            AgentStatus::EmergencyEscape if emergency_at.is_none() => {
                emergency_at = Some(sim.tick())
            }
            _ => {}
        }
    }

    let stuck_at = stuck_at.expect("agent never detected it was stuck");
    let emergency_at = emergency_at.expect("agent never escalated");
    assert!(stuck_at <= 10, "stuck detected late at tick {}", stuck_at);
    assert!(emergency_at - stuck_at > 50);
    assert_eq!(sim.agents()[0].escape_attempts, 1);
    assert_eq!(sim.agents()[0].collision_count, 80);
}

#[test]
fn test_close_agents_repel_each_other() {
    let config = SimulationConfig::default();
    let grid = open_grid(50);
    let mut agents = vec![
        Agent::new(0, Point2::new(25.0, 25.0), 0.0, &config.agents),
        Agent::new(1, Point2::new(27.0, 25.0), 0.0, &config.agents),
    ];
    let mut rng = ChaCha8Rng::seed_from_u64(0);

    for i in 0..agents.len() {
        let others: Vec<Neighbor> = agents
            .iter()
            .filter(|a| a.id != agents[i].id)
            .map(Neighbor::from)
            .collect();
        let agent = &mut agents[i];
        let readings = sense(
            &grid,
            &agent.position,
            agent.heading,
            config.sensor.range,
            config.sensor.count,
        );
        let decision = decide(
            agent,
            &readings,
            &others,
            &grid,
            config.sensor.range,
            &config.agents,
            &mut rng,
        );

        assert!(decision.repulsed, "agent {} ignored its neighbor", i);
        assert!(decision.linear_speed < config.agents.speed);
    }
}

#[test]
fn test_rejected_move_only_turns() {
    let config = SimulationConfig::default();
    let mut grid = open_grid(50);
    grid.fill_rect(27, 3, 3, 44, Cell::Occupied);

    let mut agent = Agent::new(0, Point2::new(22.5, 25.5), 0.0, &config.agents);
    let mut outcome = MoveOutcome::Moved;
    for _ in 0..20 {
        let before = agent.position;
        let heading = agent.heading;
        outcome = agent.drive(3.0, 0.1, &grid, &[], &config.agents);
        if outcome == MoveOutcome::Blocked {
            assert_eq!(agent.position, before);
            assert!((agent.heading - (heading + 0.1)).abs() < 1e-9);
            break;
        }
    }
    assert_eq!(outcome, MoveOutcome::Blocked);
}

#[test]
fn test_same_seed_same_run() {
    let mut config = SimulationConfig::default();
    config.agents.count = 3;
    config.run.seed = Some(1234);

    let mut a = Simulation::new(config.clone()).unwrap();
    let mut b = Simulation::new(config.clone()).unwrap();
    assert_eq!(a.grid(), b.grid());

    for _ in 0..100 {
        assert_eq!(a.step(), b.step());
    }
    assert_eq!(a.snapshots(), b.snapshots());
    assert_eq!(a.map(), b.map());

    config.run.seed = Some(4321);
    let c = Simulation::new(config).unwrap();
    assert_ne!(a.grid(), c.grid());
}

#[test]
fn test_every_layout_runs() {
    for layout in EnvironmentLayout::ALL {
        let mut config = SimulationConfig::default();
        config.environment.layout = layout;
        config.agents.count = 4;
        config.run.total_ticks = 60;
        config.run.seed = Some(21);

        let mut sim = Simulation::new(config).unwrap();
        let history = sim.run();

        assert_eq!(history.len(), 60, "{}", layout);
        assert!(sim.grid().border_is_occupied(3));
        for stats in &history {
            assert!((0.0..=1.0).contains(&stats.exploration_rate));
            assert!((0.0..=1.0).contains(&stats.map_coverage));
        }
    }
}

#[test]
fn test_mapping_picks_up_walls() {
    let config = SimulationConfig::default();
    let agent = Agent::new(0, Point2::new(40.0, 25.0), 0.0, &config.agents);
    let mut sim = Simulation::from_parts(config, open_grid(50), vec![agent], 3).unwrap();

    for _ in 0..30 {
        sim.step();
    }
    let map = sim.map();
    let grid = sim.grid();

    // Only occupied cells can have been reinforced as hits
    let mut reinforced = 0;
    for y in 0..50i64 {
        for x in 0..50i64 {
            if map.get(x, y) > 0.0 {
                assert!(grid.is_occupied(x, y), "free cell ({}, {}) mapped", x, y);
                reinforced += 1;
            }
        }
    }
    assert!(reinforced > 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_border_always_occupied(
        seed in any::<u64>(),
        size in 20usize..120,
        obstacles in 0usize..40,
        max_size in 3usize..12
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let grid = create_environment(size, obstacles, max_size, &mut rng);
        prop_assert!(grid.border_is_occupied(3));
    }

    #[test]
    fn test_layout_border_always_occupied(
        seed in any::<u64>(),
        size in 20usize..150,
        complexity in 1u32..=10,
        layout_index in 0usize..5
    ) {
        let config = swarmslam::config::EnvironmentConfig {
            size,
            complexity,
            layout: EnvironmentLayout::ALL[layout_index],
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let grid = generate_environment(&config, &mut rng);
        prop_assert!(grid.border_is_occupied(3));
    }

    #[test]
    fn test_map_values_stay_in_unit_range(
        seed in any::<u64>(),
        agents in 1usize..5,
        decay in 0.5f64..=1.0,
        threshold in 0.0f64..0.9
    ) {
        let mut config = SimulationConfig::default();
        config.environment.size = 40;
        config.environment.obstacle_count = 6;
        config.agents.count = agents;
        config.mapping.decay_factor = decay;
        config.mapping.confidence_threshold = threshold;
        config.run.total_ticks = 40;
        config.run.seed = Some(seed);

        let mut sim = Simulation::new(config).unwrap();
        for _ in 0..40 {
            sim.step();
            prop_assert!(sim.map().values().iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }
}
