//! The watermark-and-resize pipeline.
//!
//! # Architecture
//!
//! - [`codec`]: Decode any supported input; encode PNG, JPEG or WebP.
//! - [`geometry`]: Fit-resize, exact resize and center crop.
//! - [`compositor`]: Watermark preparation and "over" blending.
//! - [`optimizer`]: Binary search of encoder quality under a size budget.
//! - [`ImagePipeline`]: All of the above for one file.
//! - [`FolderPipeline`]: Bounded concurrent run over a directory.

pub mod codec;
pub mod compositor;
pub mod geometry;
pub mod optimizer;
mod batch;
mod pipeline;

pub use batch::FolderPipeline;
pub use pipeline::{EncodedImage, ImagePipeline};
