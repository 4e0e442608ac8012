use bevy::prelude::*;
use bevy::render::graph::CameraDriverLabel;
use bevy::render::render_graph::{
    Node, NodeRunError, RenderGraph, RenderGraphContext, RenderLabel,
};
use bevy::render::render_resource::{
    LoadOp, Operations, RenderPassColorAttachment, RenderPassDescriptor, StoreOp,
};
use bevy::render::renderer::RenderContext;

use crate::gpu::buffers::{CopyPositions, PositionReadback, SimulationFrames, SynthGpuResources};

/// Blank value of the accumulation surface, same as `cpu::surface::BLANK`.
pub const SURFACE_BLANK: LinearRgba = LinearRgba::NONE;

#[derive(Debug, Hash, PartialEq, Eq, Clone, RenderLabel)]
pub struct SurfaceClearPassLabel;

/// Runs after every camera has drawn, so the surface is only cleared once
/// this frame's presentation has read it.
#[derive(Default)]
struct SurfaceClearNode;

impl Node for SurfaceClearNode {
    fn run(
        &self,
        _graph: &mut RenderGraphContext,
        render_context: &mut RenderContext,
        world: &World,
    ) -> Result<(), NodeRunError> {
        let Some(resources) = world.get_resource::<SynthGpuResources>() else { return Ok(()); };

        let encoder = render_context.command_encoder();

        // an empty pass with a clear load-op is the whole clear
        encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("surface_clear_pass"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view: &resources.surface_view,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Clear(SURFACE_BLANK.into()),
                    store: StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let copy = world.get_resource::<CopyPositions>().is_some_and(|c| c.0);
        if let (true, Some(readback)) = (copy, world.get_resource::<PositionReadback>()) {
            encoder.copy_buffer_to_buffer(&resources.position, 0, &readback.buffer, 0, readback.size);
            if let Some(frames) = world.get_resource::<SimulationFrames>() {
                frames.record_copy();
            }
        }

        Ok(())
    }
}

pub fn add_clear_node_to_graph(render_app: &mut bevy::app::SubApp) {
    let mut graph = render_app.world_mut().resource_mut::<RenderGraph>();
    graph.add_node(SurfaceClearPassLabel, SurfaceClearNode::default());
    graph.add_node_edge(CameraDriverLabel, SurfaceClearPassLabel);
}
