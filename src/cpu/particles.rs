use bevy::prelude::Resource;
use glam::{IVec4, Vec4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Indices into a particle's control channels.
pub const AGE: usize = 0;
pub const GENERATION: usize = 1;

/// Three co-indexed arrays: index `i` of each is the same particle.
///
/// Position channels x/y are the normalized location; z/w are carried
/// along untouched. Velocity uses x/y. Control holds age and respawn
/// generation in x/y, z/w reserved.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct ParticleState {
    pub positions: Vec<Vec4>,
    pub velocities: Vec<Vec4>,
    pub controls: Vec<IVec4>,
}

impl ParticleState {
    /// All four position channels uniform in [0, 1), velocity and control zero.
    pub fn seeded(count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let positions = (0..count)
            .map(|_| {
                Vec4::new(
                    rng.random::<f32>(),
                    rng.random::<f32>(),
                    rng.random::<f32>(),
                    rng.random::<f32>(),
                )
            })
            .collect();
        Self {
            positions,
            velocities: vec![Vec4::ZERO; count],
            controls: vec![IVec4::ZERO; count],
        }
    }

    /// Every particle at the same position, at rest.
    pub fn filled(count: usize, position: Vec4) -> Self {
        Self {
            positions: vec![position; count],
            velocities: vec![Vec4::ZERO; count],
            controls: vec![IVec4::ZERO; count],
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// The (position, velocity, control) tuple of particle `i`.
    pub fn get(&self, i: usize) -> (Vec4, Vec4, IVec4) {
        (self.positions[i], self.velocities[i], self.controls[i])
    }

    pub fn set(&mut self, i: usize, position: Vec4, velocity: Vec4, control: IVec4) {
        self.positions[i] = position;
        self.velocities[i] = velocity;
        self.controls[i] = control;
    }
}
