//! Zip archive extraction and compression
//!
//! Whole-archive operations only. Both directions are blocking; async callers
//! should run them on `tokio::task::spawn_blocking`.

use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use zip::write::{FileOptions, ZipWriter};
use zip::{CompressionMethod, ZipArchive};

use crate::error::ArchiveError;

pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

pub trait WriteSeek: Write + Seek {}
impl<T: Write + Seek> WriteSeek for T {}

pub trait Archiver: Send + Sync {
    /// Unpack `archive` into `output`, overwriting existing files.
    fn extract(&self, archive: &mut dyn ReadSeek, output: &Path) -> Result<(), ArchiveError>;

    /// Pack everything below `directory` into `output`.
    fn compress(&self, directory: &Path, output: &mut dyn WriteSeek) -> Result<(), ArchiveError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiver;

impl ZipArchiver {
    pub fn new() -> Self {
        Self
    }
}

fn require_path(path: &Path, what: &str) -> Result<(), ArchiveError> {
    if path.as_os_str().is_empty() {
        return Err(ArchiveError::InvalidArgument(format!("{} must not be empty", what)));
    }
    Ok(())
}

/// Entry name for `path` relative to `root`, always `/`-separated.
fn entry_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

/// A path below the directory being compressed.
struct Entry {
    path: PathBuf,
    is_dir: bool,
}

/// Walk `dir` depth-first without following directory symlinks.
///
/// Symlinks to files are archived with the target's content; symlinks to
/// directories are skipped.
fn collect_entries(dir: &Path, entries: &mut Vec<Entry>) -> io::Result<()> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();

        if file_type.is_symlink() && path.is_dir() {
            tracing::debug!(path = %path.display(), "Skipping symlinked directory");
            continue;
        }
        children.push(Entry {
            path,
            is_dir: file_type.is_dir(),
        });
    }
    children.sort_by(|a, b| a.path.cmp(&b.path));

    for child in children {
        let recurse = child.is_dir;
        let path = child.path.clone();
        entries.push(child);
        if recurse {
            collect_entries(&path, entries)?;
        }
    }
    Ok(())
}

impl Archiver for ZipArchiver {
    fn extract(&self, archive: &mut dyn ReadSeek, output: &Path) -> Result<(), ArchiveError> {
        require_path(output, "output path")?;
        let start = Instant::now();
        let mut zip = ZipArchive::new(archive)?;
        fs::create_dir_all(output)?;

        for index in 0..zip.len() {
            let mut entry = zip.by_index(index)?;
            // Reject names that would escape the output directory
            let relative = entry
                .enclosed_name()
                .map(Path::to_path_buf)
                .ok_or_else(|| ArchiveError::UnsafeEntry(entry.name().to_string()))?;
            let target = output.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&target)?;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = File::create(&target)?;
            io::copy(&mut entry, &mut file)?;
        }

        tracing::info!(
            output = %output.display(),
            entries = zip.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Archive extracted"
        );
        Ok(())
    }

    fn compress(&self, directory: &Path, output: &mut dyn WriteSeek) -> Result<(), ArchiveError> {
        require_path(directory, "directory path")?;
        if !directory.is_dir() {
            return Err(ArchiveError::InvalidArgument(format!(
                "{} is not a directory",
                directory.display()
            )));
        }
        let start = Instant::now();

        let mut paths = Vec::new();
        collect_entries(directory, &mut paths)?;

        let mut zip = ZipWriter::new(output);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &paths {
            let name = entry_name(directory, &entry.path).ok_or_else(|| {
                ArchiveError::UnsafeEntry(entry.path.display().to_string())
            })?;

            if entry.is_dir {
                zip.add_directory(name, options)?;
            } else {
                zip.start_file(name, options)?;
                let mut file = File::open(&entry.path)?;
                io::copy(&mut file, &mut zip)?;
            }
        }

        zip.finish()?;

        tracing::info!(
            directory = %directory.display(),
            entries = paths.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Archive created"
        );
        Ok(())
    }
}
