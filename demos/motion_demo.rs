use bevy::asset::RenderAssetUsages;
use bevy::image::{CompressedImageFormats, Image, ImageSampler, ImageType};
use bevy::prelude::*;
use bevy::render::pipelined_rendering::PipelinedRenderingPlugin;
use bevy::render::render_resource::TextureFormat;
use bevy::window::WindowResolution;

use motion_field_synth::cpu::motion_field::{MotionField, vortex};
use motion_field_synth::{FrameDriverPlugin, MotionSynthPlugin, SetupError, SynthConfig, SynthSetup};

// usage: cargo run --example motion_demo [motion.png]
fn main() -> AppExit {
    let config = SynthConfig::default();
    let setup = match load_field(&config, std::env::args().nth(1))
        .and_then(|field| SynthSetup::new(config.clone(), field))
    {
        Ok(setup) => setup,
        Err(err) => {
            eprintln!("setup failed: {err}");
            return AppExit::error();
        }
    };

    App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Render".into(),
                        resolution: WindowResolution::new(config.width as f32, config.height as f32),
                        resizable: false,
                        ..default()
                    }),
                    ..default()
                })
                // one frame in flight: clear of frame N is ordered before simulate of N+1
                .disable::<PipelinedRenderingPlugin>(),
        )
        .insert_resource(ClearColor(Color::BLACK))
        .add_plugins((MotionSynthPlugin::new(setup), FrameDriverPlugin))
        .run()
}

/// Decodes the motion image, or falls back to a procedural vortex.
fn load_field(config: &SynthConfig, path: Option<String>) -> Result<MotionField, SetupError> {
    let Some(path) = path else {
        return Ok(vortex(config.width, config.height));
    };

    let bytes = std::fs::read(&path).map_err(|e| SetupError::MotionFieldDecode(format!("{path}: {e}")))?;
    let ext = std::path::Path::new(&path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png")
        .to_owned();

    let image = Image::from_buffer(
        &bytes,
        ImageType::Extension(&ext),
        CompressedImageFormats::NONE,
        false,
        ImageSampler::Default,
        RenderAssetUsages::default(),
    )
    .map_err(|e| SetupError::MotionFieldDecode(format!("{path}: {e}")))?;

    // decoders hand RGB images over as RGBA8 already; anything else is converted
    let format = image.texture_descriptor.format;
    let image = match format {
        TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb => image,
        other => image.convert(TextureFormat::Rgba8Unorm).ok_or_else(|| {
            SetupError::MotionFieldDecode(format!("{path}: unsupported pixel format {other:?}"))
        })?,
    };

    let data = image
        .data
        .as_deref()
        .ok_or_else(|| SetupError::MotionFieldDecode(format!("{path}: no pixel data")))?;
    MotionField::from_rgba8(image.width(), image.height(), data)
}
