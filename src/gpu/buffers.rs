use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bevy::core_pipeline::core_2d::graph::{Core2d, Node2d};
use bevy::prelude::*;
use bevy::render::render_graph::{RenderGraphApp, ViewNodeRunner};
use bevy::render::render_resource::{
    BindGroup, BindGroupLayout, Buffer, BufferDescriptor, BufferInitDescriptor, BufferUsages,
    Extent3d, Texture, TextureDataOrder, TextureDescriptor, TextureDimension, TextureUsages,
    TextureView, TextureViewDescriptor,
};
use bevy::render::renderer::{RenderDevice, RenderQueue};
use bevy::render::{Extract, ExtractSchedule, Render, RenderApp, RenderSet};

use crate::config::{SynthConfig, SynthSetup};
use crate::frame::{SetupFailureFlag, SetupFailurePlugin};
use crate::cpu::motion_field::MotionField;
use crate::cpu::particles::ParticleState;
use crate::gpu::bindings::{
    MOTION_FIELD_FORMAT, PresentationBindings, SURFACE_FORMAT, SimulationBindings,
    presentation_layout, simulation_layout,
};
use crate::gpu::clear_pass::add_clear_node_to_graph;
use crate::gpu::draw_buffers::{QuadVertexBuffer, init_quad_vb, prepare_draw_bind_group};
use crate::gpu::draw_pass::{SurfaceDrawNode, SurfaceDrawPassLabel};
use crate::gpu::draw_pipeline::prepare_draw_pipeline;
use crate::gpu::ffi::{GpuDisplaySize, GpuSimParams, gpu_controls, gpu_positions, gpu_velocities};
use crate::gpu::pipeline::{add_simulation_node_to_graph, prepare_simulation_pipeline};

// ==================== resources ======================================

/* every GPU-side store, created once at startup and released when the App
drops. The handles are refcounted, so the render world gets cheap clones. */
#[derive(Resource, Clone)]
pub struct SynthGpuResources {
    pub motion_field: Texture,
    pub motion_field_view: TextureView,
    pub position: Buffer,
    pub velocity: Buffer,
    pub control: Buffer,
    pub surface: Texture,
    pub surface_view: TextureView,
    pub sim_params: Buffer,
    pub display_size: Buffer,
    pub particle_count: u32,
    pub work_groups: u32,
    pub batch_size: u32,
}

#[derive(Resource, Clone)]
pub struct SimulationBindGroupLayout(pub BindGroupLayout);

#[derive(Resource, Clone)]
pub struct PresentationBindGroupLayout(pub BindGroupLayout);

#[derive(Resource)]
pub struct SimulationBindGroup(pub BindGroup);

/// Host-visible copy target for the position array.
#[derive(Resource, Clone)]
pub struct PositionReadback {
    pub buffer: Buffer,
    pub size: u64,
}

/// When true, the clear node also copies positions into `PositionReadback`.
#[derive(Resource, Clone, Copy, Default)]
pub struct CopyPositions(pub bool);

/// Shared between both worlds: how many simulation dispatches have been
/// recorded, and how many had been when positions were last copied out.
#[derive(Resource, Clone, Default)]
pub struct SimulationFrames(Arc<SimulationFrameCounts>);

#[derive(Default, Debug)]
pub struct SimulationFrameCounts {
    dispatched: AtomicU64,
    copied_at: AtomicU64,
}

impl SimulationFrames {
    pub fn dispatched(&self) -> u64 {
        self.0.dispatched.load(Ordering::SeqCst)
    }

    /// Dispatch count captured by the latest position copy.
    pub fn copied_at(&self) -> u64 {
        self.0.copied_at.load(Ordering::SeqCst)
    }

    pub(crate) fn record_dispatch(&self) {
        self.0.dispatched.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_copy(&self) {
        self.0.copied_at.store(self.dispatched(), Ordering::SeqCst);
    }
}

// =====================================================================

// ========================== systems ==================================

// Startup systems that have to run only once

fn init_gpu_resources(
    mut commands: Commands,
    render_device: Res<RenderDevice>,
    render_queue: Res<RenderQueue>,
    config: Res<SynthConfig>,
    field: Res<MotionField>,
    particles: Res<ParticleState>,
) {
    let resources = SynthGpuResources::new(&render_device, &render_queue, &config, &field, &particles);
    let readback_size = resources.position.size();
    commands.insert_resource(PositionReadback {
        buffer: render_device.create_buffer(&BufferDescriptor {
            label: Some("position_readback"),
            size: readback_size,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }),
        size: readback_size,
    });
    commands.insert_resource(resources);
    info!(
        "GPU stores ready: {} particles, {}x{} field, {} work groups of {}",
        config.particle_count,
        config.width,
        config.height,
        config.work_groups(),
        config.batch_size
    );
}

fn init_bind_group_layouts(mut commands: Commands, render_device: Res<RenderDevice>) {
    commands.insert_resource(SimulationBindGroupLayout(simulation_layout(&render_device)));
    commands.insert_resource(PresentationBindGroupLayout(presentation_layout(
        &render_device,
    )));
}

fn spawn_camera(mut commands: Commands) {
    // the draw pipeline is built for a single-sampled view
    commands.spawn((Camera2d, Msaa::Off));
}

// Extract systems that send from App to Render

fn extract_gpu_resources(
    mut commands: Commands,
    resources: Extract<Option<Res<SynthGpuResources>>>,
    readback: Extract<Option<Res<PositionReadback>>>,
    copy: Extract<Option<Res<CopyPositions>>>,
) {
    if let Some(resources) = &*resources {
        commands.insert_resource(SynthGpuResources::clone(resources));
    }
    if let Some(readback) = &*readback {
        commands.insert_resource(PositionReadback::clone(readback));
    }
    commands.insert_resource(copy.as_deref().copied().unwrap_or_default());
}

fn extract_bind_group_layouts(
    mut commands: Commands,
    sim: Extract<Option<Res<SimulationBindGroupLayout>>>,
    draw: Extract<Option<Res<PresentationBindGroupLayout>>>,
) {
    if let Some(sim) = &*sim {
        commands.insert_resource(SimulationBindGroupLayout(sim.0.clone()));
    }
    if let Some(draw) = &*draw {
        commands.insert_resource(PresentationBindGroupLayout(draw.0.clone()));
    }
}

// Prepare systems in Render

fn prepare_simulation_bind_group(
    mut commands: Commands,
    render_device: Res<RenderDevice>,
    layout: Option<Res<SimulationBindGroupLayout>>,
    resources: Option<Res<SynthGpuResources>>,
) {
    let (Some(layout), Some(res)) = (layout, resources) else {
        return;
    };
    let bind_group = res.simulation_bindings().bind_group(&render_device, &layout.0);
    commands.insert_resource(SimulationBindGroup(bind_group));
}

// Implementations

impl SynthGpuResources {
    pub fn new(
        render_device: &RenderDevice,
        render_queue: &RenderQueue,
        config: &SynthConfig,
        field: &MotionField,
        particles: &ParticleState,
    ) -> Self {
        let field_extent = Extent3d {
            width: field.width(),
            height: field.height(),
            depth_or_array_layers: 1,
        };

        let motion_field = render_device.create_texture_with_data(
            render_queue,
            &TextureDescriptor {
                label: Some("motion_field"),
                size: field_extent,
                mip_level_count: 1,
                sample_count: 1,
                dimension: TextureDimension::D2,
                format: MOTION_FIELD_FORMAT,
                usage: TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            field.as_bytes(),
        );
        let motion_field_view = motion_field.create_view(&TextureViewDescriptor::default());

        let storage = BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC;
        let position = render_device.create_buffer_with_data(&BufferInitDescriptor {
            label: Some("particle_position"),
            contents: bytemuck::cast_slice(&gpu_positions(particles)),
            usage: storage,
        });
        let velocity = render_device.create_buffer_with_data(&BufferInitDescriptor {
            label: Some("particle_velocity"),
            contents: bytemuck::cast_slice(&gpu_velocities(particles)),
            usage: storage,
        });
        let control = render_device.create_buffer_with_data(&BufferInitDescriptor {
            label: Some("particle_control"),
            contents: bytemuck::cast_slice(&gpu_controls(particles)),
            usage: storage,
        });

        // RENDER_ATTACHMENT so the clear node can use a load-op clear
        let surface = render_device.create_texture(&TextureDescriptor {
            label: Some("accumulation_surface"),
            size: Extent3d {
                width: config.width,
                height: config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: SURFACE_FORMAT,
            usage: TextureUsages::STORAGE_BINDING
                | TextureUsages::TEXTURE_BINDING
                | TextureUsages::RENDER_ATTACHMENT
                | TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let surface_view = surface.create_view(&TextureViewDescriptor::default());

        let sim_params = render_device.create_buffer_with_data(&BufferInitDescriptor {
            label: Some("sim_params_uniform"),
            contents: bytemuck::bytes_of(&GpuSimParams::from_config(config)),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let display_size = render_device.create_buffer_with_data(&BufferInitDescriptor {
            label: Some("display_size_uniform"),
            contents: bytemuck::bytes_of(&GpuDisplaySize::new(config.width, config.height)),
            usage: BufferUsages::UNIFORM,
        });

        Self {
            motion_field,
            motion_field_view,
            position,
            velocity,
            control,
            surface,
            surface_view,
            sim_params,
            display_size,
            particle_count: config.particle_count,
            work_groups: config.work_groups(),
            batch_size: config.batch_size,
        }
    }

    pub fn simulation_bindings(&self) -> SimulationBindings<'_> {
        SimulationBindings {
            motion_field: &self.motion_field_view,
            position: &self.position,
            velocity: &self.velocity,
            control: &self.control,
            surface: &self.surface_view,
            params: &self.sim_params,
        }
    }

    pub fn presentation_bindings(&self) -> PresentationBindings<'_> {
        PresentationBindings {
            surface: &self.surface_view,
            display_size: &self.display_size,
        }
    }
}

// =====================================================================

// Plugin

pub struct MotionSynthPlugin {
    setup: SynthSetup,
}

impl MotionSynthPlugin {
    /// Only a validated setup can build the plugin, so configuration
    /// mismatches never reach the frame loop.
    pub fn new(setup: SynthSetup) -> Self {
        Self { setup }
    }
}

impl Plugin for MotionSynthPlugin {
    fn build(&self, app: &mut App) {
        let (config, field, particles) = self.setup.clone().into_parts();
        info!(
            "motion field synthesis: {} particles in batches of {}, {}x{}",
            config.particle_count, config.batch_size, config.width, config.height
        );

        let failure = SetupFailureFlag::default();
        let frames = SimulationFrames::default();

        // App
        if !app.is_plugin_added::<SetupFailurePlugin>() {
            app.add_plugins(SetupFailurePlugin);
        }
        app.insert_resource(config)
            .insert_resource(failure.clone())
            .insert_resource(frames.clone())
            .insert_resource(field)
            .insert_resource(particles)
            .init_resource::<CopyPositions>()
            .add_systems(
                Startup,
                (init_gpu_resources, init_bind_group_layouts, spawn_camera),
            );

        // Render
        let render_app = app.sub_app_mut(RenderApp);
        render_app
            .insert_resource(failure)
            .insert_resource(frames)
            .add_systems(
                ExtractSchedule,
                (extract_gpu_resources, extract_bind_group_layouts),
            )
            .add_systems(
                Render,
                (
                    init_quad_vb
                        .run_if(not(resource_exists::<QuadVertexBuffer>))
                        .in_set(RenderSet::Prepare),
                    prepare_simulation_bind_group.in_set(RenderSet::PrepareBindGroups),
                    prepare_draw_bind_group.in_set(RenderSet::PrepareBindGroups),
                    prepare_simulation_pipeline.in_set(RenderSet::Prepare),
                    prepare_draw_pipeline.in_set(RenderSet::Prepare),
                ),
            );

        render_app
            .add_render_graph_node::<ViewNodeRunner<SurfaceDrawNode>>(Core2d, SurfaceDrawPassLabel)
            .add_render_graph_edges(
                Core2d,
                (
                    Node2d::MainTransparentPass,
                    SurfaceDrawPassLabel,
                    Node2d::EndMainPass,
                ),
            );
        add_simulation_node_to_graph(render_app);
        add_clear_node_to_graph(render_app);
    }
}
