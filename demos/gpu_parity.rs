// GPU vs CPU parity: let the GPU run a few frames, copy positions out, and
// replay the same number of steps on the CPU model.
use bevy::prelude::*;
use bevy::render::pipelined_rendering::PipelinedRenderingPlugin;
use bevy::render::render_resource::{Maintain, MapMode};
use bevy::render::renderer::RenderDevice;

use motion_field_synth::cpu::motion_field::vortex;
use motion_field_synth::cpu::pipeline::CpuPipeline;
use motion_field_synth::gpu::buffers::{CopyPositions, PositionReadback, SimulationFrames};
use motion_field_synth::{FrameDriver, MotionSynthPlugin, SynthConfig, SynthSetup};

const WARMUP_DISPATCHES: u64 = 10;
const MAX_ABS_ERR: f32 = 1e-4;

#[derive(Resource)]
struct Reference(SynthSetup);

fn main() -> AppExit {
    let config = SynthConfig {
        width: 256,
        height: 256,
        particle_count: 4096,
        ..Default::default()
    };
    let setup = match SynthSetup::new(config.clone(), vortex(config.width, config.height)) {
        Ok(setup) => setup,
        Err(err) => {
            eprintln!("setup failed: {err}");
            return AppExit::error();
        }
    };

    App::new()
        .add_plugins(DefaultPlugins.build().disable::<PipelinedRenderingPlugin>())
        .insert_resource(Reference(setup.clone()))
        .add_plugins(MotionSynthPlugin::new(setup))
        .add_systems(Update, readback)
        .run()
}

// wrap-aware distance on the unit torus
fn torus_dist(a: f32, b: f32) -> f32 {
    let d = (a - b).abs();
    d.min(1.0 - d)
}

fn readback(
    mut copy: ResMut<CopyPositions>,
    frames: Res<SimulationFrames>,
    readback: Option<Res<PositionReadback>>,
    reference: Res<Reference>,
    render_device: Res<RenderDevice>,
    mut exit: EventWriter<AppExit>,
    mut state: Local<u8>, // 0 wait, 1 copy requested, 2 copy recorded, 3 done
) {
    let Some(readback) = readback else { return };

    match *state {
        0 => {
            if frames.dispatched() >= WARMUP_DISPATCHES {
                copy.0 = true;
                *state = 1;
            }
        }
        1 => {
            // the copy request was extracted last frame
            copy.0 = false;
            *state = 2;
        }
        2 => {
            let steps = frames.copied_at();
            let slice = readback.buffer.slice(..);
            render_device.poll(Maintain::Wait);

            let status = std::sync::Arc::new(std::sync::atomic::AtomicU8::new(0));
            let cb = status.clone();
            slice.map_async(MapMode::Read, move |r| {
                cb.store(
                    if r.is_ok() { 1 } else { 2 },
                    std::sync::atomic::Ordering::SeqCst,
                )
            });

            loop {
                render_device.poll(Maintain::Poll);
                match status.load(std::sync::atomic::Ordering::SeqCst) {
                    0 => std::thread::yield_now(),
                    1 => break,
                    _ => {
                        error!("position readback failed to map");
                        exit.write(AppExit::error());
                        *state = 3;
                        return;
                    }
                }
            }

            let mut cpu = CpuPipeline::new(reference.0.clone());
            let mut driver = FrameDriver::default();
            for _ in 0..steps {
                driver.step(&mut cpu);
            }

            let mut max_err: f32 = 0.0;
            {
                let data = slice.get_mapped_range();
                let gpu: &[[f32; 4]] = bytemuck::cast_slice(&data);
                assert_eq!(gpu.len(), cpu.particles().len(), "GPU/CPU particle counts differ");
                for (g, c) in gpu.iter().zip(&cpu.particles().positions) {
                    max_err = max_err.max(torus_dist(g[0], c.x)).max(torus_dist(g[1], c.y));
                }
            }
            readback.buffer.unmap();

            info!("{steps}-step parity (GPU vs CPU): position max_abs = {max_err:.2e}");
            if max_err > MAX_ABS_ERR {
                error!("FAIL: position max_abs {max_err:.2e} > {MAX_ABS_ERR:.2e}");
                exit.write(AppExit::error());
            } else {
                exit.write(AppExit::Success);
            }
            *state = 3;
        }
        _ => {}
    }
}
