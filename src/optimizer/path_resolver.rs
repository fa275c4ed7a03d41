//! # Path Resolution Module
//!
//! Centralizza la logica di calcolo dei path di output.

use crate::file_manager::FileCandidate;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Path di output: l'originale in-place, altrimenti lo stesso path relativo sotto `output_root`
    pub fn get_output_path(candidate: &FileCandidate, output_root: Option<&Path>) -> PathBuf {
        match output_root {
            Some(output_root) => {
                let result = output_root.join(&candidate.relative_path);
                debug!("Resolved output path: {} -> {}", candidate.path.display(), result.display());
                result
            }
            None => candidate.path.clone(),
        }
    }

    /// Rende assoluto un path relativo alla working directory
    pub fn absolutize(path: &Path) -> Result<PathBuf> {
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(std::env::current_dir()?.join(path))
        }
    }

    /// Forma canonica di un path che può non esistere ancora: canonicalizza
    /// l'antenato esistente più vicino e riattacca i componenti mancanti
    pub fn resolve(path: &Path) -> Result<PathBuf> {
        let absolute = Self::absolutize(path)?;
        let mut existing = absolute.as_path();
        let mut missing = Vec::new();

        while !existing.exists() {
            match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name.to_os_string());
                    existing = parent;
                }
                _ => break,
            }
        }

        let mut resolved = existing.canonicalize().unwrap_or_else(|_| existing.to_path_buf());
        for name in missing.iter().rev() {
            resolved.push(name);
        }
        debug!("Resolved {} -> {}", path.display(), resolved.display());
        Ok(resolved)
    }
}
