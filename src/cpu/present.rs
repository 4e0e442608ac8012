use crate::cpu::surface::{AccumulationSurface, Texel};

/// What the full-viewport pass writes to the back buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct PresentedFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Texel>,
}

impl PresentedFrame {
    pub fn pixel(&self, x: u32, y: u32) -> Texel {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    pub fn lit_count(&self) -> usize {
        self.pixels.iter().filter(|p| p[3] != 0).count()
    }
}

/// Samples the surface at each pixel centre of a `viewport`-sized target,
/// same mapping as surface_draw.wgsl: uv in [0, 1) scaled by the surface size.
pub fn present(surface: &AccumulationSurface, viewport: (u32, u32)) -> PresentedFrame {
    let (sw, sh) = surface.size();
    let (vw, vh) = viewport;
    let mut pixels = Vec::with_capacity(vw as usize * vh as usize);
    for y in 0..vh {
        let v = (y as f32 + 0.5) / vh as f32;
        let sy = ((v * sh as f32) as u32).min(sh - 1);
        for x in 0..vw {
            let u = (x as f32 + 0.5) / vw as f32;
            let sx = ((u * sw as f32) as u32).min(sw - 1);
            pixels.push(surface.texel(sx, sy));
        }
    }
    PresentedFrame {
        width: vw,
        height: vh,
        pixels,
    }
}
