use glam::{IVec4, UVec2, Vec2, Vec4};
use motion_field_synth::cpu::motion_field::{MotionField, cell_of, encode_influence, vortex};
use motion_field_synth::cpu::particles::{AGE, GENERATION, ParticleState};
use motion_field_synth::cpu::pipeline::CpuPipeline;
use motion_field_synth::cpu::step::{StepParams, advance_particle, simulate};
use motion_field_synth::cpu::surface::AccumulationSurface;
use motion_field_synth::{FrameDriver, FrameStages, SetupError, SynthConfig, SynthSetup};

fn small_config(width: u32, height: u32, particle_count: u32, batch_size: u32) -> SynthConfig {
    SynthConfig {
        width,
        height,
        particle_count,
        batch_size,
        ..Default::default()
    }
}

fn cell_centre(cell: UVec2, width: u32, height: u32) -> Vec4 {
    Vec4::new(
        (cell.x as f32 + 0.5) / width as f32,
        (cell.y as f32 + 0.5) / height as f32,
        0.0,
        0.0,
    )
}

#[test]
fn zero_field_leaves_particles_in_place_and_ages_once() {
    let config = small_config(64, 64, 1024, 256);
    let field = MotionField::uniform(64, 64, [0, 0, 0, 0]);
    let setup = SynthSetup::new(config, field).unwrap();
    let before = setup.particles().clone();

    let mut cpu = CpuPipeline::new(setup);
    let mut driver = FrameDriver::default();
    driver.step(&mut cpu).unwrap();

    let after = cpu.particles();
    assert_eq!(after.len(), 1024);
    for i in 0..after.len() {
        assert_eq!(after.positions[i], before.positions[i], "particle {i} moved");
        assert_eq!(after.velocities[i], Vec4::ZERO);
        assert_eq!(after.controls[i], IVec4::new(1, 0, 0, 0));
    }
}

#[test]
fn single_hot_cell_moves_only_its_particles() {
    let (w, h) = (64, 64);
    let hot = UVec2::new(10, 10);
    let field = MotionField::uniform(w, h, [0; 4]).with_cell(hot, [255, 128, 255, 255]);

    let mut particles = ParticleState::filled(256, cell_centre(UVec2::new(40, 40), w, h));
    for i in 0..8 {
        particles.positions[i] = cell_centre(hot, w, h);
    }
    let setup = SynthSetup::new(small_config(w, h, 256, 256), field)
        .unwrap()
        .with_particles(particles.clone())
        .unwrap();

    let mut cpu = CpuPipeline::new(setup);
    let mut driver = FrameDriver::default();
    driver.step(&mut cpu).unwrap();

    let state = cpu.particles();
    assert!(state.velocities[0].x > 0.0, "hot cell should push along +x");
    assert_eq!(state.velocities[200], Vec4::ZERO);

    driver.step(&mut cpu).unwrap();
    let state = cpu.particles();
    let moved = state.positions[0] - particles.positions[0];
    let still = state.positions[200] - particles.positions[200];
    assert!(moved.x > 0.0);
    assert_eq!(still, Vec4::ZERO);
    assert_ne!(state.positions[0], state.positions[200]);
}

#[test]
fn twin_particles_share_a_trajectory() {
    let (w, h) = (64, 64);
    let mut config = small_config(w, h, 512, 256);
    config.integration.respawn_age = 40; // include a few respawns
    let field = vortex(w, h);

    let mut particles = ParticleState::seeded(512, 7);
    let twin = (Vec4::new(0.3, 0.7, 0.1, 0.9), Vec4::new(0.002, -0.001, 0.0, 0.0));
    for i in [3, 400] {
        particles.set(i, twin.0, twin.1, IVec4::new(5, 0, 0, 0));
    }
    let setup = SynthSetup::new(config.clone(), field.clone())
        .unwrap()
        .with_particles(particles)
        .unwrap();

    // the same tuple advanced on its own, with no other particles around
    let params = StepParams::from_config(&config);
    let (mut p, mut v, mut c) = (twin.0, twin.1, IVec4::new(5, 0, 0, 0));

    let mut cpu = CpuPipeline::new(setup);
    let mut driver = FrameDriver::default();
    for frame in 0..200 {
        driver.step(&mut cpu).unwrap();
        advance_particle(&mut p, &mut v, &mut c, &field, &params);

        let state = cpu.particles();
        assert_eq!(state.get(3), state.get(400), "twins split at frame {frame}");
        assert_eq!(state.get(3), (p, v, c), "population changed particle 3 at frame {frame}");
    }
    assert!(c[GENERATION] > 0, "expected at least one respawn");
}

#[test]
fn positions_stay_in_unit_square_for_100k_frames() {
    let (w, h) = (32, 32);
    let config = SynthConfig {
        seed: 0xC0FFEE,
        ..small_config(w, h, 64, 64)
    };
    let setup = SynthSetup::new(config, vortex(w, h)).unwrap();
    let mut cpu = CpuPipeline::new(setup);

    for frame in 0..100_000 {
        cpu.simulate();
        cpu.clear_surface();
        for (i, p) in cpu.particles().positions.iter().enumerate() {
            assert!(
                (0.0..1.0).contains(&p.x) && (0.0..1.0).contains(&p.y),
                "particle {i} left the domain at frame {frame}: {p:?}"
            );
        }
    }
}

#[test]
fn runaway_velocity_respawns_instead_of_producing_nan() {
    let (w, h) = (16, 16);
    let mut config = small_config(w, h, 256, 128);
    config.integration.field_gain = 3.0e38;
    config.integration.damping = 1.0;
    config.integration.dt = 1.0; // second step overflows to infinity
    config.integration.respawn_age = 0;
    let field = MotionField::uniform(w, h, encode_influence(Vec2::new(1.0, 1.0), 1.0));
    let setup = SynthSetup::new(config, field).unwrap();
    let mut cpu = CpuPipeline::new(setup);

    for _ in 0..50 {
        cpu.simulate();
        cpu.clear_surface();
        let state = cpu.particles();
        for i in 0..state.len() {
            let (p, v, _) = state.get(i);
            assert!(p.is_finite() && v.is_finite());
            assert!((0.0..1.0).contains(&p.x) && (0.0..1.0).contains(&p.y));
        }
    }
    assert!(cpu.particles().controls.iter().all(|c| c[GENERATION] > 0));
}

#[test]
fn respawn_resets_age_and_velocity() {
    let (w, h) = (32, 32);
    let mut config = small_config(w, h, 256, 256);
    config.integration.respawn_age = 3;
    let setup = SynthSetup::new(config, vortex(w, h)).unwrap();
    let start = setup.particles().clone();
    let mut cpu = CpuPipeline::new(setup);
    let mut driver = FrameDriver::default();

    for _ in 0..2 {
        driver.step(&mut cpu);
    }
    assert!(cpu.particles().controls.iter().all(|c| c[AGE] == 2));

    driver.step(&mut cpu);
    let state = cpu.particles();
    for i in 0..state.len() {
        let (p, v, c) = state.get(i);
        assert_eq!(c[AGE], 0);
        assert_eq!(c[GENERATION], 1);
        assert_eq!(v, Vec4::ZERO);
        // z/w ride along untouched
        assert_eq!((p.z, p.w), (start.positions[i].z, start.positions[i].w));
    }
}

#[test]
fn surface_is_blank_after_every_frame() {
    let setup = SynthSetup::new(small_config(64, 64, 512, 256), vortex(64, 64)).unwrap();
    let mut cpu = CpuPipeline::new(setup);
    let mut driver = FrameDriver::default();

    for _ in 0..20 {
        let frame = driver.step(&mut cpu).unwrap();
        assert!(frame.lit_count() > 0);
        assert!(cpu.surface().is_blank());
    }
}

#[test]
fn presented_frame_holds_exactly_this_frames_stamps() {
    let (w, h) = (64, 64);
    let mut config = small_config(w, h, 512, 256);
    config.integration.field_gain = 120.0; // roughly a cell per frame or more
    let color = config.stamp_color;
    let setup = SynthSetup::new(config, vortex(w, h)).unwrap();
    let mut cpu = CpuPipeline::new(setup);
    let mut driver = FrameDriver::default();

    let mut previous: Option<Vec<bool>> = None;
    for _ in 0..10 {
        let frame = driver.step(&mut cpu).unwrap();

        let mut expected = vec![false; (w * h) as usize];
        for p in &cpu.particles().positions {
            let cell = cell_of(p.truncate().truncate(), w, h);
            expected[(cell.y * w + cell.x) as usize] = true;
        }
        let lit: Vec<bool> = frame.pixels.iter().map(|px| *px == color).collect();
        assert_eq!(lit, expected);

        if let Some(prev) = &previous {
            assert_ne!(prev, &lit, "frame repeated the previous frame's stamps");
        }
        previous = Some(lit);
    }
}

#[test]
fn batched_simulation_matches_per_particle_updates() {
    let (w, h) = (32, 32);
    let config = small_config(w, h, 512, 128);
    let field = vortex(w, h);
    let params = StepParams::from_config(&config);

    let mut batched = ParticleState::seeded(512, 3);
    let mut single = batched.clone();
    let mut surface = AccumulationSurface::new(w, h);

    simulate(&mut batched, &field, &mut surface, &params);
    for i in 0..single.len() {
        let (mut p, mut v, mut c) = single.get(i);
        advance_particle(&mut p, &mut v, &mut c, &field, &params);
        single.set(i, p, v, c);
    }
    assert_eq!(batched, single);
    assert!(surface.stamped_count() > 0);
}

#[test]
fn indivisible_particle_count_is_rejected_at_setup() {
    let config = small_config(64, 64, 1000, 256);
    let err = SynthSetup::new(config, MotionField::uniform(64, 64, [0; 4])).unwrap_err();
    assert_eq!(
        err,
        SetupError::ParticleCountNotDivisible {
            particle_count: 1000,
            batch_size: 256
        }
    );
    assert!(err.is_configuration_mismatch());
}

#[test]
fn replacing_particles_checks_the_count() {
    let setup = SynthSetup::new(small_config(8, 8, 256, 256), MotionField::uniform(8, 8, [0; 4])).unwrap();
    let err = setup.with_particles(ParticleState::seeded(100, 1)).unwrap_err();
    assert_eq!(
        err,
        SetupError::ParticleCountMismatch {
            expected: 256,
            found: 100
        }
    );
}

#[test]
fn seeded_particles_start_normalized_and_at_rest() {
    let state = ParticleState::seeded(10_240, 99);
    assert_eq!(state.len(), 10_240);
    for i in 0..state.len() {
        let (p, v, c) = state.get(i);
        assert!(p.cmpge(Vec4::ZERO).all() && p.cmplt(Vec4::ONE).all());
        assert_eq!(v, Vec4::ZERO);
        assert_eq!(c, IVec4::ZERO);
    }
    assert_eq!(state, ParticleState::seeded(10_240, 99));
    assert_ne!(state, ParticleState::seeded(10_240, 100));
}

#[test]
fn replacing_particles_rejects_ragged_stores() {
    let config = small_config(8, 8, 256, 256);
    let field = MotionField::uniform(8, 8, [0; 4]);

    let mut short_velocities = ParticleState::filled(256, Vec4::splat(0.5));
    short_velocities.velocities.truncate(10);
    let err = SynthSetup::new(config.clone(), field.clone())
        .unwrap()
        .with_particles(short_velocities)
        .unwrap_err();
    assert_eq!(
        err,
        SetupError::ParticleCountMismatch {
            expected: 256,
            found: 10
        }
    );

    let mut long_controls = ParticleState::filled(256, Vec4::splat(0.5));
    long_controls.controls.push(IVec4::ZERO);
    let err = SynthSetup::new(config, field)
        .unwrap()
        .with_particles(long_controls)
        .unwrap_err();
    assert_eq!(
        err,
        SetupError::ParticleCountMismatch {
            expected: 256,
            found: 257
        }
    );
}

#[test]
fn control_counters_wrap_instead_of_overflowing() {
    let (w, h) = (8, 8);
    let field = MotionField::uniform(w, h, [0; 4]);
    let start = cell_centre(UVec2::new(3, 3), w, h);

    let mut config = small_config(w, h, 64, 64);
    config.integration.respawn_age = 0;
    let params = StepParams::from_config(&config);
    let (mut p, mut v, mut c) = (start, Vec4::ZERO, IVec4::new(i32::MAX, 0, 0, 0));
    advance_particle(&mut p, &mut v, &mut c, &field, &params);
    assert_eq!(c[AGE], i32::MIN);
    assert_eq!(p, start);

    config.integration.respawn_age = 1;
    let params = StepParams::from_config(&config);
    let (mut p, mut v, mut c) = (start, Vec4::ZERO, IVec4::new(0, i32::MAX, 0, 0));
    advance_particle(&mut p, &mut v, &mut c, &field, &params);
    assert_eq!((c[AGE], c[GENERATION]), (0, i32::MIN));
    assert!((0.0..1.0).contains(&p.x) && (0.0..1.0).contains(&p.y));
}
