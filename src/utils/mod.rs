pub mod error;
pub mod validation;
pub mod formats;
pub mod fs;

pub use error::{PipelineError, PipelineResult, ValidationError};
pub use validation::validate_config;
pub use formats::{ImageFormat, format_from_extension, is_supported_input};
pub use fs::{
    SourceEntry,
    ensure_output_dir,
    extract_filename,
    list_source_files,
    output_path_for,
};
