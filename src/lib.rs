pub mod config;
pub mod error;
pub mod frame;

pub mod cpu {
    pub mod motion_field;
    pub mod particles;
    pub mod pipeline;
    pub mod present;
    pub mod step;
    pub mod surface;
}

pub mod gpu {
    pub mod bindings;
    pub mod buffers;
    pub mod clear_pass;
    pub mod draw_buffers;
    pub mod draw_pass;
    pub mod draw_pipeline;
    pub mod ffi;
    pub mod pipeline;
}

pub use config::{Integration, SynthConfig, SynthSetup};
pub use error::SetupError;
pub use frame::{FrameDriver, FrameDriverPlugin, FrameStages, FrameState, QuitSignal};
pub use gpu::buffers::MotionSynthPlugin;
