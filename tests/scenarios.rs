use particle_arena::placement::worst_overlap_ratio;
use particle_arena::{RestLength, Simulation};
use particle_arena_common::{LatticeConfig, ParticleTemplate, SimulationConfig, SpeciesConfig, Vec2};
use proptest::prelude::*;

/// All optional forces, heating, damping and gravity off; closed arena.
pub fn quiet_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.run.seed = Some(1234);
    config.arena.closed_top = true;
    config.thermal.resistance = 0.0;
    config.thermal.wall_resistance = 0.0;
    config.thermal.heat = 0.0;
    config.thermal.wall_heat = 0.0;
    config.thermal.gravity = 0.0;
    config.forces.repulsion.coupling = 0.0;
    config.forces.electrostatic_coupling = 0.0;
    config.forces.pair_gravity = 0.0;
    config.forces.colour = None;
    config
}

/// A lattice of identical particles with top-left at `origin`.
pub fn lattice(rows: u32, columns: u32, spacing: f64, origin: [f64; 2], template: ParticleTemplate) -> LatticeConfig {
    LatticeConfig { rows, columns, spacing, stiffness: 1.0, origin, template }
}

fn bond_lengths(sim: &Simulation) -> Vec<(f64, Option<f64>)> {
    let particles = sim.particles();
    sim.constraints()
        .iter()
        .map(|c| {
            let a = particles.get(c.a).unwrap().position;
            let b = particles.get(c.b).unwrap().position;
            (a.distance(b), c.rest_length())
        })
        .collect()
}

// ==================================================================================
// Placement
// ==================================================================================

#[test]
fn pair_at_exact_threshold_keeps_its_separation() {
    let mut config = quiet_config();
    config.lattice = Some(lattice(1, 2, 8.0, [300.0, 200.0], ParticleTemplate::new(1.0, 5.0)));
    let sim = Simulation::new(config).unwrap();
    let snap = sim.snapshot();
    let d = snap.particles[0].position.distance(snap.particles[1].position);
    assert!(d >= 8.0, "separation {}", d);
}

#[test]
fn overlapping_pair_is_separated_before_start() {
    let mut config = quiet_config();
    config.lattice = Some(lattice(1, 2, 3.0, [300.0, 200.0], ParticleTemplate::new(1.0, 5.0)));
    let sim = Simulation::new(config).unwrap();
    let snap = sim.snapshot();
    let d = snap.particles[0].position.distance(snap.particles[1].position);
    assert!(d >= 8.0, "separation {}", d);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn placement_leaves_no_pair_below_threshold(
        seed in any::<u64>(),
        count in 2u32..120,
        radius in 2.0f64..8.0,
        at_bottom in any::<bool>(),
    ) {
        let mut config = quiet_config();
        config.run.seed = Some(seed);
        config.placement.at_bottom = at_bottom;
        config.species.push(SpeciesConfig {
            name: None,
            count,
            template: ParticleTemplate::new(1.0, radius),
        });
        let sim = Simulation::new(config).unwrap();
        prop_assert!(sim.relaxation().converged);
        let worst = worst_overlap_ratio(sim.particles().all()).unwrap();
        prop_assert!(worst >= 1.0, "worst ratio {}", worst);
    }
}

// ==================================================================================
// Integration
// ==================================================================================

#[test]
fn resting_particle_is_a_fixed_point() {
    let mut config = quiet_config();
    // Default force terms stay on; with no peers they contribute nothing.
    config.forces = SimulationConfig::default().forces;
    config.lattice = Some(lattice(1, 1, 1.0, [320.0, 240.0], ParticleTemplate::new(1.0, 5.0)));
    let mut sim = Simulation::new(config).unwrap();
    for _ in 0..100 {
        sim.advance_frame();
    }
    let p = sim.particles().get(0).unwrap();
    assert_eq!(p.position, Vec2::new(320.0, 240.0));
    assert_eq!(sim.lost(), 0);
}

#[test]
fn spring_pair_conserves_momentum() {
    let mut config = quiet_config();
    config.arena.width = 1_000.0;
    config.arena.height = 1_000.0;
    let mut template = ParticleTemplate::new(1.0, 5.0);
    template.max_speed = 4.0;
    let mut bonded = lattice(1, 2, 30.0, [485.0, 500.0], template);
    bonded.stiffness = 3.0;
    config.lattice = Some(bonded);

    let mut sim = Simulation::new(config).unwrap();
    let dt = sim.params().dt;
    let before = sim.particles().momentum(dt);
    for _ in 0..50 {
        sim.advance_frame();
    }
    let after = sim.particles().momentum(dt);
    assert_eq!(sim.live_count(), 2);
    assert!((after - before).length() < 1e-7, "before {:?} after {:?}", before, after);
    // The spring actually did work.
    let (length, rest) = bond_lengths(&sim)[0];
    assert!((length - rest.unwrap()).abs() > 1e-6);
}

#[test]
fn lattice_at_rest_stays_at_rest_length() {
    let mut config = quiet_config();
    config.lattice = Some(lattice(3, 3, 20.0, [200.0, 200.0], ParticleTemplate::new(1.0, 5.0)));
    let mut sim = Simulation::new(config).unwrap();
    assert!(sim.constraints().iter().all(|c| c.rest == RestLength::Uncaptured));
    sim.substep();
    let lengths = bond_lengths(&sim);
    assert_eq!(lengths.len(), 20);
    for (length, rest) in lengths {
        let rest = rest.expect("captured on first substep");
        assert!((length - rest).abs() < 1e-9, "length {} rest {}", length, rest);
    }
}

#[test]
fn rest_length_survives_stiffness_change() {
    let mut config = quiet_config();
    config.lattice = Some(lattice(2, 2, 25.0, [200.0, 200.0], ParticleTemplate::new(1.0, 5.0)));
    config.thermal.gravity = 2.0;
    let mut sim = Simulation::new(config).unwrap();
    sim.advance_frame();
    let captured: Vec<Option<f64>> = bond_lengths(&sim).into_iter().map(|(_, r)| r).collect();
    sim.constraints_mut().set_stiffness(40.0);
    for _ in 0..10 {
        sim.advance_frame();
    }
    let later: Vec<Option<f64>> = bond_lengths(&sim).into_iter().map(|(_, r)| r).collect();
    assert_eq!(captured, later);
}

// ==================================================================================
// Particle loss
// ==================================================================================

#[test]
fn evaporating_particle_is_lost_exactly_once() {
    let mut config = quiet_config();
    config.arena.closed_top = false;
    // Upward pull drags both particles out through the open top.
    config.thermal.gravity = -40.0;
    config.lattice = Some(lattice(1, 2, 40.0, [300.0, 200.0], ParticleTemplate::new(1.0, 5.0)));
    let mut sim = Simulation::new(config).unwrap();

    let mut last_lost = 0;
    for _ in 0..100 {
        let status = sim.advance_frame();
        assert!(status.lost >= last_lost);
        assert!(status.lost <= 2);
        assert_eq!(status.live + status.lost as usize, 2);
        last_lost = status.lost;
    }
    assert_eq!(sim.lost(), 2);
    let snap = sim.snapshot();
    assert!(snap.particles.is_empty());
    // The bond outlives its endpoints but is no longer drawn.
    assert_eq!(sim.constraints().len(), 1);
    assert!(snap.segments.is_empty());
    assert!(sim.particles().all().iter().all(|p| !p.alive));
}

#[test]
fn closed_arena_loses_nothing_at_rest() {
    let mut config = quiet_config();
    config.forces.repulsion = SimulationConfig::default().forces.repulsion;
    config.species.push(SpeciesConfig {
        name: Some("gas".into()),
        count: 40,
        template: ParticleTemplate::new(1.0, 4.0),
    });
    let mut sim = Simulation::new(config).unwrap();
    for _ in 0..20 {
        sim.advance_frame();
    }
    assert_eq!(sim.lost(), 0);
    assert_eq!(sim.snapshot().particles.len(), 40);
}

#[test]
fn demo_config_parses_and_runs() {
    let text = include_str!("../config.toml");
    let mut config = SimulationConfig::from_toml_str(text).unwrap();
    config.run.seed = Some(5);
    let mut sim = Simulation::new(config).unwrap();
    let status = sim.advance_frame();
    assert_eq!(status.frame, 1);
    assert!(sim.snapshot().particles.iter().all(|p| p.position.x.is_finite() && p.position.y.is_finite()));
}

#[test]
fn hot_open_top_keeps_loss_bookkeeping_consistent() {
    let mut config = SimulationConfig::from_toml_str(include_str!("../config.toml")).unwrap();
    config.run.seed = Some(17);
    config.thermal.wall_heat = 200.0;
    config.thermal.heat = 20.0;
    let total = config.total_particles();
    let mut sim = Simulation::new(config).unwrap();

    let mut gone = std::collections::HashSet::new();
    for _ in 0..100 {
        let status = sim.advance_frame();
        assert_eq!(status.live + status.lost as usize, total);
        let snap = sim.snapshot();
        assert!(snap.particles.iter().all(|p| !gone.contains(&p.id)));
        let dead: Vec<u32> = sim.particles().all().iter().filter(|p| !p.alive).map(|p| p.id).collect();
        assert_eq!(dead.len(), status.lost as usize);
        gone.extend(dead);
    }
}
