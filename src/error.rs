//! Setup errors.
//!
//! Every failure the crate can report happens before the first frame. Once
//! the frame loop is running there is no error channel.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SetupError {
    /// Dispatch would under- or over-cover the particle arrays.
    #[error("particle count {particle_count} is not divisible by batch size {batch_size}")]
    ParticleCountNotDivisible { particle_count: u32, batch_size: u32 },

    #[error("particle state holds {found} particles, expected {expected}")]
    ParticleCountMismatch { expected: usize, found: usize },

    #[error("batch size {0} must be in 1..={max}", max = crate::config::MAX_BATCH_SIZE)]
    BatchSizeOutOfRange(u32),

    #[error("{0} work groups exceed the per-dimension dispatch limit of {max}", max = crate::config::MAX_WORK_GROUPS)]
    TooManyWorkGroups(u32),

    #[error("{0} must be non-zero")]
    ZeroDimension(&'static str),

    #[error("motion field is {found:?}, expected {expected:?}")]
    MotionFieldSizeMismatch { expected: (u32, u32), found: (u32, u32) },

    #[error("motion field holds {found} bytes, expected {expected}")]
    MotionFieldDataLength { expected: usize, found: usize },

    #[error("invalid integration parameter: {0}")]
    InvalidIntegration(String),

    /// The external image decoder could not hand over a usable field.
    #[error("motion field could not be decoded: {0}")]
    MotionFieldDecode(String),
}

impl SetupError {
    /// True for configuration mismatches, false for failures coming from
    /// outside collaborators (image decoding).
    pub fn is_configuration_mismatch(&self) -> bool {
        !matches!(self, SetupError::MotionFieldDecode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divisibility_message_names_both_values() {
        let err = SetupError::ParticleCountNotDivisible {
            particle_count: 1000,
            batch_size: 256,
        };
        assert_eq!(
            err.to_string(),
            "particle count 1000 is not divisible by batch size 256"
        );
        assert!(err.is_configuration_mismatch());
    }

    #[test]
    fn decode_failure_is_not_a_mismatch() {
        let err = SetupError::MotionFieldDecode("truncated file".into());
        assert!(!err.is_configuration_mismatch());
        assert!(err.to_string().contains("truncated file"));
    }

    #[test]
    fn batch_size_message_names_limit() {
        let err = SetupError::BatchSizeOutOfRange(512);
        assert_eq!(err.to_string(), "batch size 512 must be in 1..=256");
    }
}
