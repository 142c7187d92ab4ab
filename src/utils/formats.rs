use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use crate::utils::PipelineError;

/// Output formats the codec adapter can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[serde(rename = "jpg", alias = "jpeg")]
    JPEG,
    PNG,
    WebP,
}

impl ImageFormat {
    /// Whether the quality search applies to this format
    pub fn is_lossy(&self) -> bool {
        !matches!(self, Self::PNG)
    }

    /// Get file extensions associated with this format
    pub fn extensions(&self) -> &[&str] {
        match self {
            Self::JPEG => &["jpg", "jpeg"],
            Self::PNG => &["png"],
            Self::WebP => &["webp"],
        }
    }

    /// Get the primary extension for this format
    pub fn primary_extension(&self) -> &str {
        self.extensions()[0]
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.primary_extension())
    }
}

impl FromStr for ImageFormat {
    type Err = PipelineError;

    fn from_str(ext: &str) -> Result<Self, Self::Err> {
        let ext = ext.trim().trim_start_matches('.').to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Ok(Self::JPEG),
            "png" => Ok(Self::PNG),
            "webp" => Ok(Self::WebP),
            _ => Err(PipelineError::unsupported_format(ext)),
        }
    }
}

/// Get format from file extension
pub fn format_from_extension(path: impl AsRef<Path>) -> Result<ImageFormat, PipelineError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| PipelineError::unsupported_format(
            format!("file has no extension: {}", path.display())
        ))?;

    ImageFormat::from_str(ext)
}

/// Whether the path carries one of the accepted input extensions (case-insensitive).
pub fn is_supported_input(path: impl AsRef<Path>) -> bool {
    format_from_extension(path).is_ok()
}
