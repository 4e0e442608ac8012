use motion_field_synth::cpu::motion_field::{MotionField, vortex};
use motion_field_synth::cpu::pipeline::CpuPipeline;
use motion_field_synth::cpu::present::present;
use motion_field_synth::cpu::surface::AccumulationSurface;
use motion_field_synth::{FrameDriver, FrameStages, FrameState, QuitSignal, SynthConfig, SynthSetup};

/// Records the order in which the driver calls the stages.
#[derive(Default)]
struct Recorder {
    calls: Vec<&'static str>,
    quit_after: Option<(usize, QuitSignal)>,
    presented: usize,
}

impl FrameStages for Recorder {
    type Frame = usize;

    fn simulate(&mut self) {
        self.calls.push("simulate");
    }

    fn present(&mut self) -> usize {
        self.calls.push("present");
        self.presented += 1;
        if let Some((n, quit)) = &self.quit_after {
            if self.presented == *n {
                // arrives mid-frame; must not cut the frame short
                quit.request();
            }
        }
        self.presented
    }

    fn clear_surface(&mut self) {
        self.calls.push("clear");
    }
}

#[test]
fn stages_run_in_order_every_frame() {
    let mut stages = Recorder::default();
    let mut driver = FrameDriver::default();
    driver.step(&mut stages);
    driver.step(&mut stages);
    assert_eq!(
        stages.calls,
        ["simulate", "present", "clear", "simulate", "present", "clear"]
    );
    assert_eq!(driver.frames(), 2);
    assert_eq!(driver.state(), FrameState::Running);
}

#[test]
fn quit_is_observed_only_after_the_frame_completes() {
    let quit = QuitSignal::default();
    let mut stages = Recorder {
        quit_after: Some((3, quit.clone())),
        ..Default::default()
    };
    let mut driver = FrameDriver::new(quit);

    let mut seen = Vec::new();
    let frames = driver.run(&mut stages, |index, frame| seen.push((index, frame)));

    assert_eq!(frames, 3);
    assert_eq!(seen, [(0, 1), (1, 2), (2, 3)]);
    assert_eq!(stages.calls.last(), Some(&"clear"));
    assert_eq!(driver.state(), FrameState::Terminated);
}

#[test]
fn terminated_is_final() {
    let quit = QuitSignal::default();
    quit.request();
    let mut driver = FrameDriver::new(quit);
    let mut stages = Recorder::default();

    assert_eq!(driver.step(&mut stages), Some(1));
    assert_eq!(driver.state(), FrameState::Terminated);
    assert_eq!(driver.step(&mut stages), None);
    assert_eq!(driver.finish_frame(), FrameState::Terminated);
    assert_eq!(driver.frames(), 1);
    assert_eq!(stages.calls.len(), 3);
}

#[test]
fn quit_signal_is_shared_between_clones() {
    let driver = FrameDriver::default();
    let handle = driver.quit_signal();
    assert!(!handle.is_requested());
    handle.request();
    assert!(driver.quit_signal().is_requested());
}

#[test]
fn cpu_pipeline_runs_under_the_driver_until_quit() {
    let config = SynthConfig {
        width: 32,
        height: 32,
        particle_count: 256,
        ..Default::default()
    };
    let setup = SynthSetup::new(config, vortex(32, 32)).unwrap();
    let mut cpu = CpuPipeline::new(setup).with_viewport(64, 64);
    let quit = QuitSignal::default();
    let mut driver = FrameDriver::new(quit.clone());

    let frames = driver.run(&mut cpu, |index, frame| {
        assert_eq!((frame.width, frame.height), (64, 64));
        assert!(frame.lit_count() > 0);
        if index == 3 {
            quit.request();
        }
    });
    assert_eq!(frames, 5);
    assert!(cpu.surface().is_blank());
}

#[test]
fn presentation_scales_the_surface_to_the_viewport() {
    let mut surface = AccumulationSurface::new(4, 4);
    surface.stamp(glam::UVec2::new(1, 2), [255, 0, 0, 255]);

    let frame = present(&surface, (8, 8));
    assert_eq!(frame.lit_count(), 4);
    for (x, y) in [(2, 4), (3, 4), (2, 5), (3, 5)] {
        assert_eq!(frame.pixel(x, y), [255, 0, 0, 255]);
    }
    assert_eq!(frame.pixel(0, 0), [0, 0, 0, 0]);

    let same = present(&surface, (4, 4));
    assert_eq!(same.pixels, surface.texels());
}

#[test]
fn motion_field_rejects_short_buffers() {
    let err = MotionField::from_rgba8(4, 4, &[0; 60]).unwrap_err();
    assert!(err.is_configuration_mismatch());
    assert!(err.to_string().contains("60"));

    let field = MotionField::from_rgba8(2, 1, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
    assert_eq!(field.sample(glam::UVec2::new(1, 0)), [5, 6, 7, 8]);
    assert_eq!(field.as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn raised_setup_failure_exits_with_an_error_once() {
    use bevy::prelude::*;
    use motion_field_synth::frame::{SetupFailureFlag, SetupFailurePlugin};

    let flag = SetupFailureFlag::default();
    let mut app = App::new();
    app.add_plugins(SetupFailurePlugin).insert_resource(flag.clone());

    app.update();
    assert!(app.world_mut().resource_mut::<Events<AppExit>>().drain().next().is_none());

    // raised from the render world while the app keeps updating
    flag.raise();
    app.update();
    let exits: Vec<AppExit> = app.world_mut().resource_mut::<Events<AppExit>>().drain().collect();
    assert_eq!(exits, vec![AppExit::error()]);

    app.update();
    assert!(app.world_mut().resource_mut::<Events<AppExit>>().drain().next().is_none());
}
