// One table for both passes: the layouts and the bind groups are built from
// the same `BindingSlot`s, so a slot can't drift between the two.

use bevy::render::render_resource::{
    BindGroup, BindGroupEntry, BindGroupLayout, BindGroupLayoutEntry, BindingResource,
    BindingType, Buffer, BufferBindingType, ShaderStages, StorageTextureAccess, TextureFormat,
    TextureSampleType, TextureView, TextureViewDimension,
};
use bevy::render::renderer::RenderDevice;

pub const MOTION_FIELD_FORMAT: TextureFormat = TextureFormat::Rgba8Uint;
pub const SURFACE_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingSlot {
    MotionField,
    Position,
    Velocity,
    Control,
    AccumulationSurface,
    Params,
}

impl BindingSlot {
    pub const fn index(self) -> u32 {
        match self {
            BindingSlot::MotionField => 0,
            BindingSlot::Position => 1,
            BindingSlot::Velocity => 2,
            BindingSlot::Control => 3,
            BindingSlot::AccumulationSurface => 4,
            BindingSlot::Params => 5,
        }
    }
}

fn storage_buffer(slot: BindingSlot) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding: slot.index(),
        visibility: ShaderStages::COMPUTE,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform(slot: BindingSlot, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding: slot.index(),
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Compute-stage access: field read-only, particle arrays read-write,
/// surface write-only.
pub fn simulation_layout(render_device: &RenderDevice) -> BindGroupLayout {
    render_device.create_bind_group_layout(
        Some("motion_sim_bind_group_layout"),
        &[
            BindGroupLayoutEntry {
                binding: BindingSlot::MotionField.index(),
                visibility: ShaderStages::COMPUTE,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Uint,
                    view_dimension: TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            storage_buffer(BindingSlot::Position),
            storage_buffer(BindingSlot::Velocity),
            storage_buffer(BindingSlot::Control),
            BindGroupLayoutEntry {
                binding: BindingSlot::AccumulationSurface.index(),
                visibility: ShaderStages::COMPUTE,
                ty: BindingType::StorageTexture {
                    access: StorageTextureAccess::WriteOnly,
                    format: SURFACE_FORMAT,
                    view_dimension: TextureViewDimension::D2,
                },
                count: None,
            },
            uniform(BindingSlot::Params, ShaderStages::COMPUTE),
        ],
    )
}

/// Draw-stage access: surface sampled with `textureLoad`, size uniform.
pub fn presentation_layout(render_device: &RenderDevice) -> BindGroupLayout {
    render_device.create_bind_group_layout(
        Some("surface_draw_bind_group_layout"),
        &[
            BindGroupLayoutEntry {
                binding: BindingSlot::AccumulationSurface.index(),
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: false },
                    view_dimension: TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            uniform(BindingSlot::Params, ShaderStages::FRAGMENT),
        ],
    )
}

/// Everything the simulation stage binds, by name.
pub struct SimulationBindings<'a> {
    pub motion_field: &'a TextureView,
    pub position: &'a Buffer,
    pub velocity: &'a Buffer,
    pub control: &'a Buffer,
    pub surface: &'a TextureView,
    pub params: &'a Buffer,
}

impl SimulationBindings<'_> {
    pub fn bind_group(&self, render_device: &RenderDevice, layout: &BindGroupLayout) -> BindGroup {
        render_device.create_bind_group(
            Some("motion_sim_bind_group"),
            layout,
            &[
                BindGroupEntry {
                    binding: BindingSlot::MotionField.index(),
                    resource: BindingResource::TextureView(self.motion_field),
                },
                BindGroupEntry {
                    binding: BindingSlot::Position.index(),
                    resource: self.position.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: BindingSlot::Velocity.index(),
                    resource: self.velocity.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: BindingSlot::Control.index(),
                    resource: self.control.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: BindingSlot::AccumulationSurface.index(),
                    resource: BindingResource::TextureView(self.surface),
                },
                BindGroupEntry {
                    binding: BindingSlot::Params.index(),
                    resource: self.params.as_entire_binding(),
                },
            ],
        )
    }
}

/// Everything the presentation stage binds, by name.
pub struct PresentationBindings<'a> {
    pub surface: &'a TextureView,
    pub display_size: &'a Buffer,
}

impl PresentationBindings<'_> {
    pub fn bind_group(&self, render_device: &RenderDevice, layout: &BindGroupLayout) -> BindGroup {
        render_device.create_bind_group(
            Some("surface_draw_bind_group"),
            layout,
            &[
                BindGroupEntry {
                    binding: BindingSlot::AccumulationSurface.index(),
                    resource: BindingResource::TextureView(self.surface),
                },
                BindGroupEntry {
                    binding: BindingSlot::Params.index(),
                    resource: self.display_size.as_entire_binding(),
                },
            ],
        )
    }
}
