//! Build requests
//!
//! A request names the input tree, where the archive goes, and how to build
//! it. `resolve` runs the pre-flight checks before anything is hashed.

use crate::error::{KilnError, KilnResult};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// One cache-check-and-build request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// File name of the archive inside `output_dir`
    pub output_filename: String,
    /// Source tree, mounted at /input
    pub input_dir: PathBuf,
    /// Destination directory, mounted at /output
    pub output_dir: PathBuf,
    /// Container image reference
    pub image: String,
    /// Build script, relative to `input_dir`
    pub script: PathBuf,
}

impl BuildRequest {
    /// Path of the output archive
    pub fn archive_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_filename)
    }

    /// Script path with forward slashes, as seen below the input mount
    pub fn script_in_container(&self) -> String {
        self.script
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Validate the request and return it with absolute directories
    ///
    /// The output directory is created if missing.
    pub async fn resolve(&self) -> KilnResult<Self> {
        check_file_name(&self.output_filename)?;
        if self.image.trim().is_empty() {
            return Err(KilnError::request("image", "must not be empty"));
        }
        check_script_path(&self.script)?;

        let input_meta = fs::metadata(&self.input_dir).await.map_err(|e| {
            KilnError::request("input", format!("{}: {}", self.input_dir.display(), e))
        })?;
        if !input_meta.is_dir() {
            return Err(KilnError::request(
                "input",
                format!("{} is not a directory", self.input_dir.display()),
            ));
        }

        create_output_dir(&self.output_dir).await?;

        let input_dir = canonical(&self.input_dir).await?;
        let output_dir = canonical(&self.output_dir).await?;

        let script_path = input_dir.join(&self.script);
        match fs::metadata(&script_path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(KilnError::request(
                    "script",
                    format!("{} is not a regular file", script_path.display()),
                ))
            }
            Err(e) => {
                return Err(KilnError::request(
                    "script",
                    format!("{}: {}", script_path.display(), e),
                ))
            }
        }

        debug!(
            "Resolved request: input {}, output {}",
            input_dir.display(),
            output_dir.display()
        );

        Ok(Self {
            output_filename: self.output_filename.clone(),
            input_dir,
            output_dir,
            image: self.image.clone(),
            script: self.script.clone(),
        })
    }
}

fn check_file_name(name: &str) -> KilnResult<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(()),
        _ => Err(KilnError::request(
            "filename",
            format!("'{}' must be a plain file name", name),
        )),
    }
}

fn check_script_path(script: &Path) -> KilnResult<()> {
    if script.as_os_str().is_empty() {
        return Err(KilnError::request("script", "must not be empty"));
    }
    if !script.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir)) {
        return Err(KilnError::request(
            "script",
            format!("{} must be a relative path inside the input directory", script.display()),
        ));
    }
    Ok(())
}

async fn create_output_dir(dir: &Path) -> KilnResult<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o755);

    builder
        .create(dir)
        .await
        .map_err(|e| KilnError::io(format!("creating output directory {}", dir.display()), e))
}

async fn canonical(path: &Path) -> KilnResult<PathBuf> {
    fs::canonicalize(path)
        .await
        .map_err(|e| KilnError::io(format!("resolving {}", path.display()), e))
}
