use crate::core::ProcessingConfig;
use crate::utils::{PipelineResult, ValidationError};

/// Validates processing settings before a batch is allowed to start.
pub fn validate_config(config: &ProcessingConfig) -> PipelineResult<()> {
    if config.max_width == 0 || config.max_height == 0 {
        return Err(ValidationError::Bounds {
            width: config.max_width,
            height: config.max_height,
        }
        .into());
    }

    if config.target_size_kb == 0 {
        return Err(ValidationError::TargetSize.into());
    }

    if config.worker_limit == 0 {
        return Err(ValidationError::WorkerLimit.into());
    }

    Ok(())
}
