use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use crate::utils::{ImageFormat, PipelineError, PipelineResult};

/// One regular file found while scanning the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub path: PathBuf,
    pub file_name: String,
}

/// Lists the regular files of `dir`, sorted by name. Subdirectories are ignored.
///
/// Failure to read the directory is a batch precondition failure.
pub async fn list_source_files(dir: impl AsRef<Path>) -> PipelineResult<Vec<SourceEntry>> {
    let dir = dir.as_ref();
    let mut reader = fs::read_dir(dir).await.map_err(|e| {
        PipelineError::precondition(format!("Cannot read directory '{}': {e}", dir.display()))
    })?;

    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await.map_err(|e| {
        PipelineError::precondition(format!("Cannot read directory '{}': {e}", dir.display()))
    })? {
        let file_type = match entry.file_type().await {
            Ok(ft) => ft,
            Err(e) => {
                debug!("Ignoring {}: {e}", entry.path().display());
                continue;
            }
        };
        if file_type.is_dir() {
            continue;
        }
        entries.push(SourceEntry {
            path: entry.path(),
            file_name: entry.file_name().to_string_lossy().into_owned(),
        });
    }

    entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(entries)
}

/// Creates the output directory (and parents). Already existing is fine.
pub async fn ensure_output_dir(dir: impl AsRef<Path>) -> PipelineResult<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).await.map_err(|e| {
        PipelineError::precondition(format!("Cannot create output directory '{}': {e}", dir.display()))
    })
}

/// Output path for `source`: its base name with the extension of `format`, inside `out_dir`.
pub fn output_path_for(source: impl AsRef<Path>, out_dir: impl AsRef<Path>, format: ImageFormat) -> PathBuf {
    let stem = source
        .as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());

    out_dir.as_ref().join(format!("{stem}.{}", format.primary_extension()))
}

/// Get file name as string
pub fn extract_filename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_swaps_extension() {
        let out = output_path_for("in/photo.JPEG", "out", ImageFormat::JPEG);
        assert_eq!(out, PathBuf::from("out/photo.jpg"));

        let out = output_path_for("in/archive.tar.png", "out", ImageFormat::WebP);
        assert_eq!(out, PathBuf::from("out/archive.tar.webp"));
    }

    #[tokio::test]
    async fn listing_skips_directories_and_sorts() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.png"), b"x").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let entries = list_source_files(dir.path()).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.png"]);
    }

    #[tokio::test]
    async fn missing_directory_is_a_precondition_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = list_source_files(dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Precondition(_)));
    }

    #[tokio::test]
    async fn existing_output_dir_is_not_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("out");
        ensure_output_dir(&out).await.unwrap();
        ensure_output_dir(&out).await.unwrap();
        assert!(out.is_dir());
    }
}
