use crate::config::{SynthConfig, SynthSetup};
use crate::cpu::motion_field::MotionField;
use crate::cpu::particles::ParticleState;
use crate::cpu::present::{PresentedFrame, present};
use crate::cpu::step::{StepParams, simulate};
use crate::cpu::surface::AccumulationSurface;
use crate::frame::FrameStages;

/// All stores plus both stages, run on the CPU.
pub struct CpuPipeline {
    config: SynthConfig,
    params: StepParams,
    field: MotionField,
    particles: ParticleState,
    surface: AccumulationSurface,
    viewport: (u32, u32),
}

impl CpuPipeline {
    pub fn new(setup: SynthSetup) -> Self {
        let (config, field, particles) = setup.into_parts();
        let params = StepParams::from_config(&config);
        let surface = AccumulationSurface::new(config.width, config.height);
        let viewport = (config.width, config.height);
        Self {
            config,
            params,
            field,
            particles,
            surface,
            viewport,
        }
    }

    /// Presentation target size; defaults to the field size.
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = (width, height);
        self
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn particles(&self) -> &ParticleState {
        &self.particles
    }

    pub fn surface(&self) -> &AccumulationSurface {
        &self.surface
    }

    pub fn field(&self) -> &MotionField {
        &self.field
    }
}

impl FrameStages for CpuPipeline {
    type Frame = PresentedFrame;

    fn simulate(&mut self) {
        simulate(
            &mut self.particles,
            &self.field,
            &mut self.surface,
            &self.params,
        );
    }

    fn present(&mut self) -> PresentedFrame {
        present(&self.surface, self.viewport)
    }

    fn clear_surface(&mut self) {
        self.surface.clear();
    }
}
