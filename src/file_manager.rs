//! # File Management Module
//!
//! Questo modulo gestisce tutte le operazioni sui file e la discovery delle immagini.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva e lazy delle immagini (depth-first, ordine per nome)
//! - Esclusione di directory e file tramite la whitelist
//! - Determinazione formato file da estensione (case-insensitive)
//! - Fingerprint SHA-256 letto a blocchi
//! - Scrittura sicura dei file compressi (temp file + rename)
//! - Formattazione human-readable delle dimensioni
//!
//! ## Formati supportati:
//! - **Immagini**: PNG, JPG, JPEG, WebP
//!
//! ## Operazioni sui file:
//! - `ImageWalker::walk()`: Produce i candidati sotto una directory
//! - `FileManager::fingerprint()`: Hash e dimensione di un file
//! - `FileManager::write_atomically()`: Sostituzione senza finestre di scrittura parziale
//!
//! ## Esempio:
//! ```ignore
//! let walker = ImageWalker::new(Allowlist::new(&config.whitelist)?);
//! for candidate in walker.walk(&root) {
//!     let fingerprint = FileManager::fingerprint(&candidate.path).await?;
//! }
//! ```

use crate::allowlist::Allowlist;
use anyhow::Result;
use image::ImageFormat;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Read buffer used while hashing
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// An image found under the root that passed every filter
#[derive(Debug, Clone, PartialEq)]
pub struct FileCandidate {
    pub path: PathBuf,
    /// Path relative to the walked root
    pub relative_path: PathBuf,
    pub format: ImageFormat,
}

/// Content hash and byte size of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFingerprint {
    pub hash: String,
    pub size: u64,
}

/// Depth-first image discovery with whitelist pruning
pub struct ImageWalker {
    allowlist: Allowlist,
    excluded_dirs: Vec<PathBuf>,
}

impl ImageWalker {
    pub fn new(allowlist: Allowlist) -> Self {
        Self {
            allowlist,
            excluded_dirs: Vec::new(),
        }
    }

    /// Never descend into `dir` (used for the mirrored output tree)
    pub fn exclude_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded_dirs.push(dir.into());
        self
    }

    /// Lazily yield every image under `root`
    pub fn walk<'a>(&'a self, root: &Path) -> impl Iterator<Item = FileCandidate> + 'a {
        let root = root.to_path_buf();
        let base = root.clone();

        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| self.should_descend(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(move |entry| self.to_candidate(&base, entry))
    }

    fn should_descend(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let path = entry.path();
        if self.excluded_dirs.iter().any(|dir| dir == path) {
            debug!("Skipping output directory: {}", path.display());
            return false;
        }
        if self.allowlist.matches_dir(path) {
            debug!("Skipping whitelisted directory: {}", path.display());
            return false;
        }
        true
    }

    fn to_candidate(&self, root: &Path, entry: DirEntry) -> Option<FileCandidate> {
        let name = entry.file_name().to_string_lossy();
        if self.allowlist.matches_file_name(&name) {
            debug!("Skipping whitelisted file: {}", entry.path().display());
            return None;
        }

        let format = FileManager::image_format(entry.path())?;
        let relative_path = entry
            .path()
            .strip_prefix(root)
            .unwrap_or_else(|_| Path::new(entry.file_name()))
            .to_path_buf();

        Some(FileCandidate {
            path: entry.into_path(),
            relative_path,
            format,
        })
    }
}

/// Manages file operations
pub struct FileManager;

impl FileManager {
    /// Recognized image format for a path, by extension
    pub fn image_format(path: &Path) -> Option<ImageFormat> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ImageFormat::from_extension(&ext)? {
            format @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP) => Some(format),
            _ => None,
        }
    }

    /// SHA-256 and size of a file, read in fixed-size chunks
    pub async fn fingerprint(path: &Path) -> Result<FileFingerprint> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; HASH_CHUNK_SIZE];
        let mut size = 0u64;

        loop {
            let read = file.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
            size += read as u64;
        }

        Ok(FileFingerprint {
            hash: hex::encode(hasher.finalize()),
            size,
        })
    }

    /// SHA-256 of an in-memory buffer
    pub fn hash_bytes(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    /// Write `data` to `target` through a sibling temp file and a rename
    pub fn write_atomically(target: &Path, data: &[u8]) -> Result<()> {
        let parent = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        let mut file = tempfile::Builder::new()
            .prefix(".compress-")
            .suffix(".tmp")
            .tempfile_in(parent)?;
        file.write_all(data)?;
        Self::match_permissions(file.as_file(), target)?;
        file.as_file().sync_all()?;
        file.persist(target)
            .map_err(|e| anyhow::anyhow!("Failed to replace {}: {}", target.display(), e.error))?;
        Ok(())
    }

    /// Give a replacement file the mode of the file it will replace.
    /// Temp files start as 0600, so a brand new target gets 0644 instead.
    pub fn match_permissions(file: &std::fs::File, target: &Path) -> std::io::Result<()> {
        match std::fs::metadata(target) {
            Ok(metadata) => file.set_permissions(metadata.permissions()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::set_default_permissions(file),
            Err(e) => Err(e),
        }
    }

    #[cfg(unix)]
    fn set_default_permissions(file: &std::fs::File) -> std::io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o644))
    }

    #[cfg(not(unix))]
    fn set_default_permissions(_file: &std::fs::File) -> std::io::Result<()> {
        Ok(())
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Percentage reduction, `None` for an empty original
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> Option<f64> {
        if original_size == 0 {
            None
        } else {
            Some(((original_size as f64 - new_size as f64) / original_size as f64) * 100.0)
        }
    }
}
