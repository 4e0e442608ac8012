use bytemuck::{Pod, Zeroable};

use crate::config::SynthConfig;
use crate::cpu::particles::ParticleState;

// Plain arrays, not glam, so the layout is exactly what WGSL sees.

/// `SimParams` uniform of motion_sim.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuSimParams {
    pub field_size: [u32; 2],
    pub particle_count: u32,
    pub respawn_age: i32,
    pub damping: f32,
    pub field_gain: f32,
    pub dt: f32,
    pub hash_seed: u32,
    pub stamp_color: [f32; 4],
}

/// `(width, height)` uniform of surface_draw.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuDisplaySize {
    pub size: [u32; 2],
    pub _pad: [u32; 2], // uniform buffers round up to 16 bytes
}

impl GpuSimParams {
    pub fn from_config(config: &SynthConfig) -> Self {
        let i = &config.integration;
        Self {
            field_size: [config.width, config.height],
            particle_count: config.particle_count,
            respawn_age: i.respawn_age,
            damping: i.damping,
            field_gain: i.field_gain,
            dt: i.dt,
            hash_seed: config.hash_seed(),
            stamp_color: config.stamp_color.map(|c| c as f32 / 255.0),
        }
    }
}

impl GpuDisplaySize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: [width, height],
            _pad: [0; 2],
        }
    }
}

pub fn gpu_positions(state: &ParticleState) -> Vec<[f32; 4]> {
    state.positions.iter().map(|p| p.to_array()).collect()
}

pub fn gpu_velocities(state: &ParticleState) -> Vec<[f32; 4]> {
    state.velocities.iter().map(|v| v.to_array()).collect()
}

pub fn gpu_controls(state: &ParticleState) -> Vec<[i32; 4]> {
    state.controls.iter().map(|c| c.to_array()).collect()
}
