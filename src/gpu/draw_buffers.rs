use bevy::prelude::*;
use bevy::render::render_resource::*;
use bevy::render::renderer::RenderDevice;

use crate::gpu::buffers::{PresentationBindGroupLayout, SynthGpuResources};

// ---------------- Types ----------------

#[derive(Resource)]
pub struct PresentationBindGroup(pub BindGroup);

#[derive(Resource)]
pub struct QuadVertexBuffer {
    pub buffer: Buffer,
    pub vertex_count: u32,
}

// full-viewport quad as a triangle strip, in clip space
pub const QUAD_VERTS: &[[f32; 2]] = &[[-1.0, -1.0], [-1.0, 1.0], [1.0, -1.0], [1.0, 1.0]];

// ---------------- Systems (Render world) ----------------

pub fn init_quad_vb(mut commands: Commands, rd: Res<RenderDevice>) {
    let vb = rd.create_buffer_with_data(&BufferInitDescriptor {
        label: Some("fullscreen_quad_vb"),
        contents: bytemuck::cast_slice(QUAD_VERTS),
        usage: BufferUsages::VERTEX,
    });
    commands.insert_resource(QuadVertexBuffer {
        buffer: vb,
        vertex_count: QUAD_VERTS.len() as u32,
    });
}

// BG: accumulation surface (sampled) + display size UBO
pub fn prepare_draw_bind_group(
    mut commands: Commands,
    rd: Res<RenderDevice>,
    layout: Option<Res<PresentationBindGroupLayout>>,
    resources: Option<Res<SynthGpuResources>>,
) {
    let (Some(layout), Some(resources)) = (layout, resources) else {
        return;
    };
    let bg = resources.presentation_bindings().bind_group(&rd, &layout.0);
    commands.insert_resource(PresentationBindGroup(bg));
}
