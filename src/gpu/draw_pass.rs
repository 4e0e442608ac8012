use bevy::ecs::query::QueryItem;
use bevy::prelude::*;
use bevy::render::render_graph::{NodeRunError, RenderGraphContext, RenderLabel, ViewNode};
use bevy::render::render_resource::{PipelineCache, RenderPassDescriptor};
use bevy::render::renderer::RenderContext;
use bevy::render::view::ViewTarget;

use crate::gpu::draw_buffers::{PresentationBindGroup, QuadVertexBuffer};
use crate::gpu::draw_pipeline::DrawPipeline;

#[derive(Debug, Hash, PartialEq, Eq, Clone, RenderLabel)]
pub struct SurfaceDrawPassLabel;

/// Presentation stage: one full-viewport quad sampling the accumulation
/// surface. Runs inside the camera's 2D graph, after the simulation node.
#[derive(Default)]
pub struct SurfaceDrawNode;

impl ViewNode for SurfaceDrawNode {
    // runs per view; fetch the camera's ViewTarget directly
    type ViewQuery = &'static ViewTarget;

    fn run<'w>(
        &self,
        _graph: &mut RenderGraphContext,
        rcx: &mut RenderContext<'w>,
        view_target: QueryItem<'w, Self::ViewQuery>,
        world: &'w World,
    ) -> Result<(), NodeRunError> {
        let Some(dp) = world.get_resource::<DrawPipeline>() else {
            return Ok(());
        };
        let cache = world.resource::<PipelineCache>();
        let Some(pipeline) = cache.get_render_pipeline(dp.0) else {
            return Ok(());
        };
        let Some(bg) = world.get_resource::<PresentationBindGroup>() else {
            return Ok(());
        };
        let Some(vb) = world.get_resource::<QuadVertexBuffer>() else {
            return Ok(());
        };

        let mut pass = rcx.begin_tracked_render_pass(RenderPassDescriptor {
            label: Some("surface_draw_pass"),
            color_attachments: &[Some(view_target.get_color_attachment())],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        }); // uses the correct load/store ops for this view

        pass.set_render_pipeline(pipeline);
        pass.set_bind_group(0, &bg.0, &[]);
        pass.set_vertex_buffer(0, vb.buffer.slice(..));
        pass.draw(0..vb.vertex_count, 0..1);
        Ok(())
    }
}
