//! Frame sequencing: simulate, present, clear, then check for quit.
//!
//! The driver is a two-state machine. `Running` becomes `Terminated` once,
//! when the quit token is observed at the end of a completed frame; nothing
//! is ever aborted mid-frame.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::input::InputSystem;
use bevy::prelude::*;
use bevy::window::{PrimaryWindow, WindowCloseRequested};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameState {
    #[default]
    Running,
    Terminated,
}

/// Cancellation token shared with whoever may ask the loop to stop.
#[derive(Debug, Clone, Default)]
pub struct QuitSignal(Arc<AtomicBool>);

impl QuitSignal {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Raised from the render world when a pipeline fails to compile. Checked
/// by the main world, which exits before the loop runs productively.
#[derive(Resource, Debug, Clone, Default)]
pub struct SetupFailureFlag(Arc<AtomicBool>);

impl SetupFailureFlag {
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The three per-frame stages, in the order the driver calls them.
pub trait FrameStages {
    type Frame;

    fn simulate(&mut self);
    fn present(&mut self) -> Self::Frame;
    fn clear_surface(&mut self);
}

#[derive(Resource, Debug, Default)]
pub struct FrameDriver {
    state: FrameState,
    frames: u64,
    quit: QuitSignal,
}

impl FrameDriver {
    pub fn new(quit: QuitSignal) -> Self {
        Self {
            state: FrameState::Running,
            frames: 0,
            quit,
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn quit_signal(&self) -> QuitSignal {
        self.quit.clone()
    }

    /// Marks one frame complete and checks the quit token. Returns the state
    /// after the check.
    pub fn finish_frame(&mut self) -> FrameState {
        if self.state == FrameState::Terminated {
            return self.state;
        }
        self.frames += 1;
        if self.quit.is_requested() {
            self.state = FrameState::Terminated;
        }
        self.state
    }

    /// Runs one whole frame. `None` once terminated.
    pub fn step<S: FrameStages>(&mut self, stages: &mut S) -> Option<S::Frame> {
        if self.state == FrameState::Terminated {
            return None;
        }
        stages.simulate();
        let frame = stages.present();
        stages.clear_surface();
        self.finish_frame();
        Some(frame)
    }

    /// Loops until the quit token is observed. `on_frame` gets the index and
    /// output of every completed frame.
    pub fn run<S: FrameStages>(
        &mut self,
        stages: &mut S,
        mut on_frame: impl FnMut(u64, S::Frame),
    ) -> u64 {
        while let Some(frame) = self.step(stages) {
            on_frame(self.frames - 1, frame);
        }
        self.frames
    }
}

// ========================== systems ==================================

fn request_quit_on_input(
    keys: Res<ButtonInput<KeyCode>>,
    mut close_requests: EventReader<WindowCloseRequested>,
    driver: Res<FrameDriver>,
) {
    let closing = close_requests.read().count() > 0;
    if closing || keys.just_pressed(KeyCode::Escape) {
        driver.quit.request();
    }
}

fn finish_frame(mut driver: ResMut<FrameDriver>, mut exit: EventWriter<AppExit>) {
    let before = driver.state();
    if driver.finish_frame() == FrameState::Terminated && before == FrameState::Running {
        info!("frame driver terminated after {} frames", driver.frames());
        exit.write(AppExit::Success);
    }
}

fn exit_on_setup_failure(
    failure: Option<Res<SetupFailureFlag>>,
    mut exit: EventWriter<AppExit>,
    mut reported: Local<bool>,
) {
    let Some(failure) = failure else { return };
    if failure.is_raised() && !*reported {
        *reported = true;
        error!("setup failed, shutting down");
        exit.write(AppExit::error());
    }
}

fn show_fps_in_title(
    diagnostics: Res<DiagnosticsStore>,
    mut window: Query<&mut Window, With<PrimaryWindow>>,
) {
    let Ok(mut window) = window.single_mut() else {
        return;
    };
    if let Some(fps) = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|d| d.smoothed())
    {
        window.title = format!("Render - FPS: {fps:.2}");
    }
}

// Plugin

pub struct FrameDriverPlugin;

impl Plugin for FrameDriverPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<FrameTimeDiagnosticsPlugin>() {
            app.add_plugins(FrameTimeDiagnosticsPlugin::default());
        }
        app.init_resource::<FrameDriver>()
            .add_systems(PreUpdate, request_quit_on_input.after(InputSystem))
            .add_systems(Update, show_fps_in_title)
            .add_systems(Last, finish_frame);
    }
}

/// Turns a raised `SetupFailureFlag` into `AppExit::error()`. Added by
/// whichever plugin owns the flag.
pub struct SetupFailurePlugin;

impl Plugin for SetupFailurePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Last, exit_on_setup_failure);
    }
}
