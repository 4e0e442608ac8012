// read-only W x H grid of RGBA8 direction/intensity samples
use bevy::prelude::Resource;
use glam::{UVec2, Vec2};

use crate::error::SetupError;

pub type Sample = [u8; 4];

// multiplied, never divided; motion_sim.wgsl uses the same constants
const INV_HALF_BYTE: f32 = 1.0 / 127.5;
const INV_BYTE: f32 = 1.0 / 255.0;

#[derive(Resource, Clone, Debug, PartialEq)]
pub struct MotionField {
    width: u32,
    height: u32,
    samples: Vec<Sample>, // row-major, row 0 first
}

impl MotionField {
    /// Wraps tightly packed RGBA8 bytes handed over by an image decoder.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self, SetupError> {
        if width == 0 || height == 0 {
            return Err(SetupError::ZeroDimension("motion field"));
        }
        let expected = width as usize * height as usize * 4;
        if bytes.len() != expected {
            return Err(SetupError::MotionFieldDataLength {
                expected,
                found: bytes.len(),
            });
        }
        let samples = bytes
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect();
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    pub fn uniform(width: u32, height: u32, sample: Sample) -> Self {
        Self {
            width,
            height,
            samples: vec![sample; width as usize * height as usize],
        }
    }

    /// Builds a field by evaluating `f(x, y)` at every cell.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Sample) -> Self {
        let mut samples = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                samples.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            samples,
        }
    }

    /// Returns a copy with one cell replaced. Out-of-range cells are ignored.
    pub fn with_cell(mut self, cell: UVec2, sample: Sample) -> Self {
        if cell.x < self.width && cell.y < self.height {
            let idx = self.index(cell);
            self.samples[idx] = sample;
        }
        self
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.samples)
    }

    #[inline]
    fn index(&self, cell: UVec2) -> usize {
        cell.y as usize * self.width as usize + cell.x as usize
    }

    /// Nearest-cell lookup. `cell` must come from `cell_of`.
    #[inline]
    pub fn sample(&self, cell: UVec2) -> Sample {
        self.samples[self.index(cell)]
    }

    #[inline]
    pub fn influence(&self, cell: UVec2) -> Vec2 {
        decode_influence(self.sample(cell))
    }
}

/// Direction from r/g centred on 127.5, intensity from b. Alpha is reserved.
/// An all-zero sample has zero intensity and therefore zero influence.
#[inline]
pub fn decode_influence(sample: Sample) -> Vec2 {
    let dir = Vec2::new(sample[0] as f32, sample[1] as f32) * INV_HALF_BYTE - Vec2::ONE;
    let intensity = sample[2] as f32 * INV_BYTE;
    dir * intensity
}

/// Encodes a direction in [-1, 1]^2 and an intensity in [0, 1] as a sample.
pub fn encode_influence(dir: Vec2, intensity: f32) -> Sample {
    let to_byte = |v: f32| ((v.clamp(-1.0, 1.0) + 1.0) * 127.5).round() as u8;
    [
        to_byte(dir.x),
        to_byte(dir.y),
        (intensity.clamp(0.0, 1.0) * 255.0).round() as u8,
        255,
    ]
}

/// Grid cell holding a position already wrapped into [0, 1).
#[inline]
pub fn cell_of(pos: Vec2, width: u32, height: u32) -> UVec2 {
    let x = ((pos.x * width as f32) as u32).min(width - 1);
    let y = ((pos.y * height as f32) as u32).min(height - 1);
    UVec2::new(x, y)
}

/// Procedural swirl used when no motion image is supplied.
pub fn vortex(width: u32, height: u32) -> MotionField {
    let centre = Vec2::new(width as f32, height as f32) * 0.5;
    let radius = centre.min_element().max(1.0);
    MotionField::from_fn(width, height, |x, y| {
        let offset = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - centre;
        let tangent = Vec2::new(-offset.y, offset.x).normalize_or_zero();
        let inward = -offset.normalize_or_zero() * 0.25;
        let falloff = (offset.length() / radius).min(1.0);
        encode_influence((tangent + inward).normalize_or_zero(), 0.35 + 0.65 * falloff)
    })
}
