//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON (una riga per evento su stdout).
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio del run (root, modalità output, ledger caricato)
//! - `file_complete`: Esito di un singolo file
//! - `credential_rotated`: Passaggio alla API key successiva
//! - `complete`: Fine del run con statistiche e stato del ledger
//! - `error`: Errore fatale

use crate::optimizer::task_optimizer::FileOutcome;
use crate::progress::RunStats;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum JsonMessage {
    #[serde(rename = "start")]
    Start {
        root: PathBuf,
        output_dir: Option<PathBuf>,
        ledger_file: PathBuf,
        ledger_entries: usize,
        api_keys: usize,
        min_image_size: u64,
        dry_run: bool,
    },

    #[serde(rename = "file_complete")]
    FileComplete {
        path: PathBuf,
        /// Where the compressed bytes were written (the original path when in place)
        output_path: Option<PathBuf>,
        status: FileStatus,
        original_size: Option<u64>,
        compressed_size: Option<u64>,
        reduction_percent: Option<f64>,
        error: Option<String>,
    },

    #[serde(rename = "credential_rotated")]
    CredentialRotated {
        position: usize,
        total: usize,
    },

    #[serde(rename = "complete")]
    Complete {
        files_seen: usize,
        files_compressed: usize,
        already_compressed: usize,
        too_small: usize,
        pending: usize,
        errors: usize,
        total_bytes_saved: u64,
        average_reduction: f64,
        ledger_entries: usize,
        credentials_exhausted: bool,
        duration_seconds: f64,
    },

    #[serde(rename = "error")]
    Error {
        message: String,
    },
}

/// Esito sintetico di un file
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Compressed,
    AlreadyCompressed,
    TooSmall,
    WouldCompress,
    Failed,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    /// Crea un messaggio di completamento file
    pub fn file_complete(path: &Path, outcome: &FileOutcome) -> Self {
        let output_path = match outcome {
            FileOutcome::Compressed { output_path, .. } => Some(output_path.clone()),
            _ => None,
        };

        let (status, original_size, compressed_size, error) = match outcome {
            FileOutcome::Compressed { original_size, compressed_size, .. } => {
                (FileStatus::Compressed, Some(*original_size), Some(*compressed_size), None)
            }
            FileOutcome::AlreadyCompressed => (FileStatus::AlreadyCompressed, None, None, None),
            FileOutcome::TooSmall { size } => (FileStatus::TooSmall, Some(*size), None, None),
            FileOutcome::WouldCompress { size } => (FileStatus::WouldCompress, Some(*size), None, None),
            FileOutcome::Failed { reason } => (FileStatus::Failed, None, None, Some(reason.clone())),
        };

        let reduction_percent = match (original_size, compressed_size) {
            (Some(original), Some(compressed)) => {
                crate::file_manager::FileManager::calculate_reduction(original, compressed)
                    .map(|r| (r * 100.0).round() / 100.0)
            }
            _ => None,
        };

        Self::FileComplete {
            path: path.to_path_buf(),
            output_path,
            status,
            original_size,
            compressed_size,
            reduction_percent,
            error,
        }
    }

    /// Crea un messaggio di completamento generale
    pub fn complete(
        stats: &RunStats,
        ledger_entries: usize,
        credentials_exhausted: bool,
        duration_seconds: f64,
    ) -> Self {
        Self::Complete {
            files_seen: stats.files_seen,
            files_compressed: stats.files_compressed,
            already_compressed: stats.already_compressed,
            too_small: stats.too_small,
            pending: stats.pending,
            errors: stats.errors,
            total_bytes_saved: stats.total_bytes_saved,
            average_reduction: stats.overall_reduction_percent(),
            ledger_entries,
            credentials_exhausted,
            duration_seconds,
        }
    }

    /// Crea un messaggio di errore
    pub fn error(message: String) -> Self {
        Self::Error { message }
    }
}
