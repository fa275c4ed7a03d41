//! # Progress Tracking Module
//!
//! Unifica spinner, log per file, eventi JSON e statistiche del run.

use crate::{
    file_manager::{FileCandidate, FileManager},
    json_output::JsonMessage,
    optimizer::task_optimizer::FileOutcome,
    progress::{ProgressManager, RunStats},
};
use tracing::info;

/// Tracker per un singolo run sequenziale
pub struct ProgressTracker {
    json_output: bool,
    stats: RunStats,
    progress_manager: ProgressManager,
}

impl ProgressTracker {
    pub fn new(json_output: bool) -> Self {
        Self {
            json_output,
            stats: RunStats::new(),
            progress_manager: ProgressManager::new(!json_output),
        }
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Aggiorna statistiche, log e progress per un file completato
    pub fn handle_file_completion(&mut self, candidate: &FileCandidate, outcome: &FileOutcome) {
        let path = &candidate.path;

        match outcome {
            FileOutcome::Compressed { original_size, compressed_size, output_path } => {
                self.stats.add_compressed(*original_size, *compressed_size);
                if !self.json_output {
                    let reduction = FileManager::calculate_reduction(*original_size, *compressed_size).unwrap_or(0.0);
                    info!(
                        "Compressed: {}, original size: {} bytes, compressed size: {} bytes, reduction: {:.2}%",
                        path.display(),
                        original_size,
                        compressed_size,
                        reduction
                    );
                    if output_path != path {
                        info!("  -> {}", output_path.display());
                    }
                }
            }
            FileOutcome::AlreadyCompressed => {
                self.stats.add_already_compressed();
                if !self.json_output {
                    info!("Already compressed, skipping: {}", path.display());
                }
            }
            FileOutcome::TooSmall { size } => {
                self.stats.add_too_small();
                if !self.json_output {
                    info!("Skipping (file too small): {}, size: {} bytes", path.display(), size);
                }
            }
            FileOutcome::WouldCompress { size } => {
                self.stats.add_pending();
                if !self.json_output {
                    info!("Dry run: would compress {} ({})", path.display(), FileManager::format_size(*size));
                }
            }
            FileOutcome::Failed { .. } => {
                // already logged by the worker
                self.stats.add_error();
            }
        }

        if self.json_output {
            JsonMessage::file_complete(path, outcome).emit();
        }

        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy();
        self.progress_manager.update(&name);
    }

    /// Finalizza spinner e stampa statistiche finali
    pub fn finish(&self, ledger_entries: usize, credentials_exhausted: bool, duration: f64) {
        self.progress_manager.finish(&self.stats.format_summary());

        if self.json_output {
            JsonMessage::complete(&self.stats, ledger_entries, credentials_exhausted, duration).emit();
            return;
        }

        info!("=== Compression Complete ===");
        info!("Files seen this run: {}", self.stats.files_seen);
        info!("Files compressed this run: {}", self.stats.files_compressed);
        info!("Already compressed: {}", self.stats.already_compressed);
        info!("Too small: {}", self.stats.too_small);
        info!("Errors this run: {}", self.stats.errors);
        info!("Bytes saved this run: {}", FileManager::format_size(self.stats.total_bytes_saved));
        info!("Average reduction this run: {:.2}%", self.stats.overall_reduction_percent());
        info!("Ledger entries: {}", ledger_entries);
        info!("Finished in {:.1}s", duration);
    }
}
