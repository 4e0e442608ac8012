/* compute stage: one invocation per particle, `batch_size` per work group.
Follows the compute_shader_game_of_life layout from the bevy examples. */

use std::borrow::Cow;

use bevy::prelude::*;
use bevy::render::graph::CameraDriverLabel;
use bevy::render::render_graph::{
    Node, NodeRunError, RenderGraph, RenderGraphContext, RenderLabel,
};
use bevy::render::render_resource::{
    CachedComputePipelineId, CachedPipelineState, ComputePassDescriptor, ComputePipeline,
    ComputePipelineDescriptor, PipelineCache, PushConstantRange, ShaderDefVal,
};
use bevy::render::renderer::RenderContext;

use crate::frame::SetupFailureFlag;
use crate::gpu::buffers::{
    SimulationBindGroup, SimulationBindGroupLayout, SimulationFrames, SynthGpuResources,
};

pub const SIMULATION_SHADER: &str = "shaders/motion_sim.wgsl";

#[derive(Resource)]
pub struct SimulationPipeline(pub ComputePipeline);

#[derive(Debug, Hash, PartialEq, Eq, Clone, RenderLabel)]
pub struct SimulationPassLabel;

#[derive(Default)]
struct SimulationNode;

impl Node for SimulationNode {
    fn run(
        &self,
        _graph: &mut RenderGraphContext,
        render_context: &mut RenderContext,
        world: &World,
    ) -> Result<(), NodeRunError> {
        // nothing to do until the pipeline has compiled
        let Some(pipeline) = world.get_resource::<SimulationPipeline>() else { return Ok(()); };
        let Some(bind_group) = world.get_resource::<SimulationBindGroup>() else { return Ok(()); };
        let Some(resources) = world.get_resource::<SynthGpuResources>() else { return Ok(()); };

        // particle_count is a multiple of batch_size, so this covers every index exactly
        let mut pass = render_context
            .command_encoder()
            .begin_compute_pass(&ComputePassDescriptor {
                label: Some("motion_sim_pass"),
                timestamp_writes: None,
            });

        pass.set_pipeline(&pipeline.0);
        pass.set_bind_group(0, &bind_group.0, &[]);
        pass.dispatch_workgroups(resources.work_groups, 1, 1);

        if let Some(frames) = world.get_resource::<SimulationFrames>() {
            frames.record_dispatch();
        }

        Ok(())
    }
}

pub fn prepare_simulation_pipeline(
    mut commands: Commands,
    pipeline_cache: Res<PipelineCache>,
    layout: Option<Res<SimulationBindGroupLayout>>,
    resources: Option<Res<SynthGpuResources>>,
    assets: Res<AssetServer>,
    failure: Option<Res<SetupFailureFlag>>,
    mut pipeline_id: Local<Option<CachedComputePipelineId>>,
    mut ready: Local<bool>,
) {
    if *ready {
        return;
    }
    let (Some(layout), Some(resources)) = (layout, resources) else {
        return;
    };

    let Some(id) = *pipeline_id else {
        let shader: Handle<Shader> = assets.load(SIMULATION_SHADER);
        let desc = ComputePipelineDescriptor {
            label: Some("motion_sim_pipeline".into()),
            layout: vec![layout.0.clone()],
            push_constant_ranges: Vec::<PushConstantRange>::new(),
            shader,
            shader_defs: vec![ShaderDefVal::UInt(
                "WORKGROUP_SIZE".into(),
                resources.batch_size,
            )],
            entry_point: Cow::from("main"),
            zero_initialize_workgroup_memory: false,
        };
        *pipeline_id = Some(pipeline_cache.queue_compute_pipeline(desc));
        info!("motion_sim pipeline queued");
        return; // waits for compilation
    };

    match pipeline_cache.get_compute_pipeline_state(id) {
        CachedPipelineState::Ok(_) => {
            if let Some(pipeline) = pipeline_cache.get_compute_pipeline(id) {
                commands.insert_resource(SimulationPipeline(pipeline.clone()));
                info!("motion_sim pipeline ready");
                *ready = true;
            }
        }
        CachedPipelineState::Err(err) => {
            error!("motion_sim pipeline failed: {err:?}");
            if let Some(failure) = failure {
                failure.raise();
            }
            *ready = true;
        }
        CachedPipelineState::Queued | CachedPipelineState::Creating(_) => {}
    }
}

pub fn add_simulation_node_to_graph(render_app: &mut bevy::app::SubApp) {
    let mut graph = render_app.world_mut().resource_mut::<RenderGraph>();
    graph.add_node(SimulationPassLabel, SimulationNode::default());
    graph.add_node_edge(SimulationPassLabel, CameraDriverLabel);
}
