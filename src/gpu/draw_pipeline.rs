use bevy::asset::AssetServer;
use bevy::image::BevyDefault;
use bevy::prelude::*;
use bevy::render::render_resource::{
    CachedPipelineState, CachedRenderPipelineId, ColorTargetState, ColorWrites, FragmentState,
    MultisampleState, PipelineCache, PrimitiveState, PrimitiveTopology, RenderPipelineDescriptor,
    Shader, TextureFormat, VertexAttribute, VertexBufferLayout, VertexFormat, VertexState,
    VertexStepMode,
};

use crate::frame::SetupFailureFlag;
use crate::gpu::buffers::PresentationBindGroupLayout;

pub const PRESENTATION_SHADER: &str = "shaders/surface_draw.wgsl";

#[derive(Resource)]
pub struct DrawPipeline(pub CachedRenderPipelineId);

pub fn prepare_draw_pipeline(
    mut commands: Commands,
    cache: Res<PipelineCache>,
    bgl: Option<Res<PresentationBindGroupLayout>>,
    assets: Res<AssetServer>,
    failure: Option<Res<SetupFailureFlag>>,
    mut cached: Local<Option<CachedRenderPipelineId>>,
    mut settled: Local<bool>,
) {
    if *settled {
        return;
    }
    let Some(bgl) = bgl else {
        return;
    };

    let Some(id) = *cached else {
        let shader: Handle<Shader> = assets.load(PRESENTATION_SHADER);
        let vbuf_layout = VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 2]>() as u64,
            step_mode: VertexStepMode::Vertex,
            attributes: vec![VertexAttribute {
                format: VertexFormat::Float32x2,
                offset: 0,
                shader_location: 0,
            }],
        };

        let desc = RenderPipelineDescriptor {
            label: Some("surface_draw_pipeline".into()),
            layout: vec![bgl.0.clone()],
            vertex: VertexState {
                shader: shader.clone(),
                entry_point: "vs_main".into(),
                shader_defs: vec![],
                buffers: vec![vbuf_layout],
            },
            fragment: Some(FragmentState {
                shader,
                entry_point: "fs_main".into(),
                shader_defs: vec![],
                targets: vec![Some(ColorTargetState {
                    format: TextureFormat::bevy_default(),
                    blend: None, // the quad covers the whole view
                    write_mask: ColorWrites::ALL,
                })],
            }),
            primitive: PrimitiveState {
                topology: PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: MultisampleState::default(), // camera spawns with Msaa::Off
            push_constant_ranges: vec![],
            zero_initialize_workgroup_memory: false,
        };

        *cached = Some(cache.queue_render_pipeline(desc));
        info!("surface_draw pipeline queued");
        return;
    };

    match cache.get_render_pipeline_state(id) {
        CachedPipelineState::Ok(_) => {
            info!("surface_draw pipeline ready");
            commands.insert_resource(DrawPipeline(id));
            *settled = true;
        }
        CachedPipelineState::Err(err) => {
            error!("surface_draw pipeline failed: {err:?}");
            if let Some(failure) = failure {
                failure.raise();
            }
            *settled = true;
        }
        CachedPipelineState::Queued | CachedPipelineState::Creating(_) => {}
    }
}
