//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il feedback visivo e le statistiche del run.
//!
//! ## Responsabilità:
//! - Spinner con `indicatif` che mostra il file corrente (il walk è lazy, il totale non è noto)
//! - Tracking statistiche di compressione per categoria di esito
//! - Report finale con byte risparmiati formattati
//!
//! ## Statistiche tracciate:
//! - **files_seen**: Candidati esaminati
//! - **files_compressed**: File compressi e scritti
//! - **already_compressed**: Hash già presente nel ledger
//! - **too_small**: Sotto la soglia minima (o vuoti)
//! - **pending**: Da comprimere ma non inviati (dry run)
//! - **errors**: Fallimenti locali al file (formato, rete, scrittura)
//! - **total_original_size / total_bytes_saved**: Solo sui file compressi

use crate::file_manager::FileManager;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while the tree is walked
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self { bar: ProgressBar::hidden() };
        }

        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {pos} files {msg}") {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Count one more file and show its name
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Statistics for a single run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunStats {
    pub files_seen: usize,
    pub files_compressed: usize,
    pub already_compressed: usize,
    pub too_small: usize,
    pub pending: usize,
    pub errors: usize,
    pub total_original_size: u64,
    pub total_bytes_saved: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_compressed(&mut self, original_size: u64, new_size: u64) {
        self.files_seen += 1;
        self.files_compressed += 1;
        self.total_original_size += original_size;
        self.total_bytes_saved += original_size.saturating_sub(new_size);
    }

    pub fn add_already_compressed(&mut self) {
        self.files_seen += 1;
        self.already_compressed += 1;
    }

    pub fn add_too_small(&mut self) {
        self.files_seen += 1;
        self.too_small += 1;
    }

    pub fn add_pending(&mut self) {
        self.files_seen += 1;
        self.pending += 1;
    }

    pub fn add_error(&mut self) {
        self.files_seen += 1;
        self.errors += 1;
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        if self.total_original_size > 0 {
            (self.total_bytes_saved as f64 / self.total_original_size as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Seen: {} files | Compressed: {} | Already compressed: {} | Too small: {} | Pending: {} | Errors: {} | Total saved: {} ({:.2}%)",
            self.files_seen,
            self.files_compressed,
            self.already_compressed,
            self.too_small,
            self.pending,
            self.errors,
            FileManager::format_size(self.total_bytes_saved),
            self.overall_reduction_percent()
        )
    }
}
