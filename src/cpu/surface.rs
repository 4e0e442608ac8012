use glam::UVec2;

pub type Texel = [u8; 4];

/// Value every texel holds right after a clear.
pub const BLANK: Texel = [0, 0, 0, 0];

/// Per-frame stamp target. Written by the simulation, read by presentation,
/// then cleared before the next frame.
#[derive(Clone, Debug, PartialEq)]
pub struct AccumulationSurface {
    width: u32,
    height: u32,
    texels: Vec<Texel>,
}

impl AccumulationSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            texels: vec![BLANK; width as usize * height as usize],
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn clear(&mut self) {
        self.texels.fill(BLANK);
    }

    /// Last writer wins, as with `textureStore` from many invocations.
    #[inline]
    pub fn stamp(&mut self, cell: UVec2, color: Texel) {
        let idx = cell.y as usize * self.width as usize + cell.x as usize;
        self.texels[idx] = color;
    }

    pub fn texel(&self, x: u32, y: u32) -> Texel {
        self.texels[y as usize * self.width as usize + x as usize]
    }

    pub fn is_blank(&self) -> bool {
        self.texels.iter().all(|t| *t == BLANK)
    }

    pub fn stamped_count(&self) -> usize {
        self.texels.iter().filter(|t| **t != BLANK).count()
    }

    pub fn texels(&self) -> &[Texel] {
        &self.texels
    }
}
