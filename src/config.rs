use bevy::prelude::Resource;

use crate::cpu::motion_field::MotionField;
use crate::cpu::particles::ParticleState;
use crate::error::SetupError;

/// Largest work group the compute pass may request (portable wgpu limit).
pub const MAX_BATCH_SIZE: u32 = 256;
/// Largest number of work groups in one dispatch dimension.
pub const MAX_WORK_GROUPS: u32 = 65_535;

/// Velocity / position integration constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Integration {
    pub damping: f32,    // fraction of velocity kept per step, 0..=1
    pub field_gain: f32, // scale on the sampled influence
    pub dt: f32,         // fixed step, not frame-relative
    pub respawn_age: i32, // 0 disables respawn
}

impl Default for Integration {
    fn default() -> Self {
        Self {
            damping: 0.96,
            field_gain: 0.6,
            dt: 1.0 / 60.0,
            respawn_age: 600,
        }
    }
}

#[derive(Resource, Clone, Debug, PartialEq)]
pub struct SynthConfig {
    pub width: u32,
    pub height: u32,
    pub particle_count: u32,
    pub batch_size: u32,
    pub integration: Integration,
    pub seed: u64,
    pub stamp_color: [u8; 4],
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            particle_count: 10_240,
            batch_size: 256,
            integration: Integration::default(),
            seed: 1,
            stamp_color: [255, 255, 255, 255],
        }
    }
}

impl SynthConfig {
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.width == 0 {
            return Err(SetupError::ZeroDimension("width"));
        }
        if self.height == 0 {
            return Err(SetupError::ZeroDimension("height"));
        }
        if self.particle_count == 0 {
            return Err(SetupError::ZeroDimension("particle_count"));
        }
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(SetupError::BatchSizeOutOfRange(self.batch_size));
        }
        if self.particle_count % self.batch_size != 0 {
            return Err(SetupError::ParticleCountNotDivisible {
                particle_count: self.particle_count,
                batch_size: self.batch_size,
            });
        }
        if self.work_groups() > MAX_WORK_GROUPS {
            return Err(SetupError::TooManyWorkGroups(self.work_groups()));
        }

        let i = &self.integration;
        if !(0.0..=1.0).contains(&i.damping) {
            return Err(SetupError::InvalidIntegration(format!(
                "damping {} outside [0, 1]",
                i.damping
            )));
        }
        if !i.field_gain.is_finite() {
            return Err(SetupError::InvalidIntegration(format!(
                "field_gain {} is not finite",
                i.field_gain
            )));
        }
        if !(i.dt.is_finite() && i.dt > 0.0) {
            return Err(SetupError::InvalidIntegration(format!(
                "dt {} must be positive and finite",
                i.dt
            )));
        }
        if i.respawn_age < 0 {
            return Err(SetupError::InvalidIntegration(format!(
                "respawn_age {} is negative",
                i.respawn_age
            )));
        }
        Ok(())
    }

    /// Work groups per simulation dispatch. Exact once validated.
    pub fn work_groups(&self) -> u32 {
        self.particle_count / self.batch_size.max(1)
    }

    /// The seed folded to 32 bits (high half XOR low half), mixed into the respawn hash.
    pub fn hash_seed(&self) -> u32 {
        (self.seed ^ (self.seed >> 32)) as u32
    }
}

/// A validated configuration together with the stores it sizes.
///
/// Only `SynthSetup::new` builds one, so anything holding a `SynthSetup`
/// may rely on the divisibility and field-size preconditions.
#[derive(Clone, Debug)]
pub struct SynthSetup {
    config: SynthConfig,
    field: MotionField,
    particles: ParticleState,
}

impl SynthSetup {
    pub fn new(config: SynthConfig, field: MotionField) -> Result<Self, SetupError> {
        config.validate()?;
        if field.size() != (config.width, config.height) {
            return Err(SetupError::MotionFieldSizeMismatch {
                expected: (config.width, config.height),
                found: field.size(),
            });
        }
        let particles = ParticleState::seeded(config.particle_count as usize, config.seed);
        Ok(Self {
            config,
            field,
            particles,
        })
    }

    /// Replaces the seeded particles, e.g. to place particles on chosen cells.
    pub fn with_particles(mut self, particles: ParticleState) -> Result<Self, SetupError> {
        let expected = self.config.particle_count as usize;
        // all three stores are indexed by the same particle id
        let lengths = [
            particles.positions.len(),
            particles.velocities.len(),
            particles.controls.len(),
        ];
        if let Some(&found) = lengths.iter().find(|&&len| len != expected) {
            return Err(SetupError::ParticleCountMismatch { expected, found });
        }
        self.particles = particles;
        Ok(self)
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn field(&self) -> &MotionField {
        &self.field
    }

    pub fn particles(&self) -> &ParticleState {
        &self.particles
    }

    pub fn into_parts(self) -> (SynthConfig, MotionField, ParticleState) {
        (self.config, self.field, self.particles)
    }
}
