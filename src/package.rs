//! App Package - Asset Discovery and In-Place Writes

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use walkdir::WalkDir;

use crate::config::{CheckConfig, WriteMode};
use crate::validation::{CheckError, CheckOutcome, SvgSanitizationCheck, ValidationError};

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("Package root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// A candidate asset: where it lives and how to get its markup.
pub trait AssetRef {
    fn relative_path(&self) -> &str;
    fn read(&self) -> io::Result<String>;
}

/// Destination for sanitized markup.
pub trait AssetWriter {
    fn write(&self, relative_path: &str, contents: &str) -> io::Result<()>;
}

/// An SVG file inside a package directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppFile {
    root: PathBuf,
    relative_path: String,
}

impl AppFile {
    pub fn new(root: impl Into<PathBuf>, relative_path: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            relative_path: relative_path.into(),
        }
    }

    pub fn absolute_path(&self) -> PathBuf {
        self.root.join(&self.relative_path)
    }
}

impl AssetRef for AppFile {
    fn relative_path(&self) -> &str {
        &self.relative_path
    }

    fn read(&self) -> io::Result<String> {
        fs::read_to_string(self.absolute_path())
    }
}

/// Writes assets relative to a package root.
#[derive(Debug, Clone)]
pub struct FsWriter {
    root: PathBuf,
    mode: WriteMode,
}

impl FsWriter {
    pub fn new(root: impl Into<PathBuf>, mode: WriteMode) -> Self {
        Self { root: root.into(), mode }
    }
}

impl AssetWriter for FsWriter {
    fn write(&self, relative_path: &str, contents: &str) -> io::Result<()> {
        let target = self.root.join(relative_path);
        match self.mode {
            WriteMode::Overwrite => fs::write(&target, contents),
            WriteMode::Atomic => {
                // persist() renames over the target: its mode and read-only
                // bit have to be honored here.
                let permissions = match fs::metadata(&target) {
                    Ok(meta) => Some(meta.permissions()),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                    Err(e) => return Err(e),
                };
                if permissions.as_ref().map_or(false, |p| p.readonly()) {
                    return Err(io::Error::new(
                        io::ErrorKind::PermissionDenied,
                        format!("{} is read-only", target.display()),
                    ));
                }

                let dir = target.parent().unwrap_or(&self.root);
                let mut tmp = NamedTempFile::new_in(dir)?;
                tmp.write_all(contents.as_bytes())?;
                if let Some(permissions) = permissions {
                    tmp.as_file().set_permissions(permissions)?;
                }
                tmp.persist(&target).map_err(|e| e.error)?;
                Ok(())
            }
        }
    }
}

/// The slice of an app package this check touches: its SVG assets and the
/// warnings surfaced to the author.
#[derive(Debug)]
pub struct AppPackage {
    pub root: PathBuf,
    pub svg_files: Vec<AppFile>,
    pub warnings: Vec<String>,
    write_mode: WriteMode,
}

impl AppPackage {
    pub fn new(root: impl Into<PathBuf>, svg_files: Vec<AppFile>, write_mode: WriteMode) -> Self {
        Self {
            root: root.into(),
            svg_files,
            warnings: vec![],
            write_mode,
        }
    }

    /// Collect every `.svg` under `root/<assets_dir>`, sorted by path.
    pub fn load_from_dir(root: &Path, config: &CheckConfig) -> Result<Self, PackageError> {
        if !root.is_dir() {
            return Err(PackageError::RootNotFound(root.to_path_buf()));
        }

        let assets = root.join(&config.assets_dir);
        let mut svg_files = vec![];

        if assets.is_dir() {
            for entry in WalkDir::new(&assets).sort_by_file_name() {
                let entry = entry.map_err(|source| PackageError::Scan {
                    path: assets.clone(),
                    source,
                })?;
                if !entry.file_type().is_file() || !is_svg(entry.path()) {
                    continue;
                }
                if let Some(relative) = relative_path(root, entry.path()) {
                    svg_files.push(AppFile::new(root, relative));
                }
            }
        }

        tracing::debug!(root = %root.display(), count = svg_files.len(), "discovered svg assets");
        Ok(Self::new(root, svg_files, config.write_mode))
    }

    pub fn writer(&self) -> FsWriter {
        FsWriter::new(&self.root, self.write_mode)
    }

    /// Run the sanitization check over this package's SVGs. Warnings are
    /// appended to `self.warnings`; validation errors are returned.
    pub fn validate_svgs(
        &mut self,
        check: &SvgSanitizationCheck,
    ) -> Result<Vec<ValidationError>, CheckError> {
        Ok(self.check_svgs(check)?.errors)
    }

    /// Like [`validate_svgs`](Self::validate_svgs), but hands back the whole
    /// outcome, per-asset reports included.
    pub fn check_svgs(&mut self, check: &SvgSanitizationCheck) -> Result<CheckOutcome, CheckError> {
        let outcome = check.check(&self.svg_files, &self.writer())?;
        self.warnings.extend(outcome.warnings.iter().cloned());
        Ok(outcome)
    }
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("svg"))
}

/// `path` relative to `root`, always `/`-separated.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}
