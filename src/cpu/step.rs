// per-particle update, CPU twin of assets/shaders/motion_sim.wgsl
use glam::{IVec4, UVec2, Vec2, Vec4};

use crate::config::{Integration, SynthConfig};
use crate::cpu::motion_field::{MotionField, cell_of};
use crate::cpu::particles::{AGE, GENERATION, ParticleState};
use crate::cpu::surface::{AccumulationSurface, Texel};

/// Everything one step needs besides the particle itself.
#[derive(Clone, Copy, Debug)]
pub struct StepParams {
    pub integration: Integration,
    pub hash_seed: u32,
    pub stamp_color: Texel,
    pub batch_size: usize,
}

impl StepParams {
    pub fn from_config(config: &SynthConfig) -> Self {
        Self {
            integration: config.integration,
            hash_seed: config.hash_seed(),
            stamp_color: config.stamp_color,
            batch_size: config.batch_size as usize,
        }
    }
}

#[inline]
pub fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

/// Top 24 bits of a hash as a float in [0, 1).
#[inline]
fn unit_float(h: u32) -> f32 {
    (h >> 8) as f32 * (1.0 / 16_777_216.0)
}

/// Folds a coordinate into [0, 1). `1.0` can appear from rounding of tiny
/// negatives and is mapped to `0.0`.
#[inline]
pub fn wrap_unit(v: f32) -> f32 {
    let w = v - v.floor();
    if w >= 1.0 { 0.0 } else { w }
}

#[inline]
pub fn wrap_position(p: Vec2) -> Vec2 {
    Vec2::new(wrap_unit(p.x), wrap_unit(p.y))
}

/// New location after a respawn, derived only from the particle's own state.
#[inline]
pub fn respawn_position(pos: Vec2, generation: i32, seed: u32) -> Vec2 {
    let h0 = pcg_hash(generation as u32 ^ seed);
    let h1 = pcg_hash(pos.y.to_bits() ^ h0);
    let hx = pcg_hash(pos.x.to_bits() ^ h1);
    let hy = pcg_hash(hx);
    Vec2::new(unit_float(hx), unit_float(hy))
}

/// Advances one particle and returns the cell to stamp.
///
/// Reads nothing but its own tuple and the field.
pub fn advance_particle(
    position: &mut Vec4,
    velocity: &mut Vec4,
    control: &mut IVec4,
    field: &MotionField,
    params: &StepParams,
) -> UVec2 {
    let (w, h) = field.size();
    let integ = &params.integration;

    let pos = wrap_position(position.truncate().truncate());
    let influence = field.influence(cell_of(pos, w, h));

    let vel = velocity.truncate().truncate() * integ.damping + influence * (integ.field_gain * integ.dt);
    let moved = pos + vel * integ.dt;

    control[AGE] = control[AGE].wrapping_add(1);
    let expired = integ.respawn_age > 0 && control[AGE] >= integ.respawn_age;

    let (new_pos, new_vel) = if expired || !moved.is_finite() || !vel.is_finite() {
        control[AGE] = 0;
        control[GENERATION] = control[GENERATION].wrapping_add(1);
        (
            respawn_position(pos, control[GENERATION], params.hash_seed),
            Vec2::ZERO,
        )
    } else {
        (wrap_position(moved), vel)
    };

    position.x = new_pos.x;
    position.y = new_pos.y;
    velocity.x = new_vel.x;
    velocity.y = new_vel.y;

    cell_of(new_pos, w, h)
}

/// One simulation stage over every particle, in `batch_size` chunks as the
/// compute dispatch does. Stamps the surface at each new position.
pub fn simulate(
    particles: &mut ParticleState,
    field: &MotionField,
    surface: &mut AccumulationSurface,
    params: &StepParams,
) {
    let batch = params.batch_size.max(1);
    let ParticleState {
        positions,
        velocities,
        controls,
    } = particles;

    for ((pos_batch, vel_batch), ctl_batch) in positions
        .chunks_mut(batch)
        .zip(velocities.chunks_mut(batch))
        .zip(controls.chunks_mut(batch))
    {
        for ((p, v), c) in pos_batch.iter_mut().zip(vel_batch).zip(ctl_batch) {
            let cell = advance_particle(p, v, c, field, params);
            surface.stamp(cell, params.stamp_color);
        }
    }
}
