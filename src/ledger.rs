//! # Ledger Module
//!
//! Questo modulo gestisce il ledger degli hash già compressi per evitare ricompressioni.
//!
//! ## Responsabilità:
//! - Carica l'insieme di hash SHA-256 registrati dai run precedenti
//! - Accumula gli hash confermati del run corrente in uno snapshot temporaneo
//! - Sostituisce atomicamente il ledger durevole a fine run (temp file + rename)
//!
//! ## Strutture dati:
//! - `LedgerStore`: Possiede il path del ledger durevole
//! - `LedgerSnapshot`: File temporaneo nella stessa directory, uno hash per riga
//!
//! ## Formato file:
//! ```text
//! 3a7bd3e2360a3d29eea436fcfb7e44c735d117c42d1c1835420b6b9942dd4f1b
//! 9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08
//! ```
//!
//! ## Garanzie:
//! - Il ledger durevole è sempre o quello del run precedente o quello nuovo, mai un misto
//! - Uno snapshot scartato senza commit non tocca il ledger durevole
//! - Un ledger mancante equivale a un insieme vuoto

use crate::error::CompressError;
use crate::file_manager::FileManager;
use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Durable ledger of content hashes that no longer need compression
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every recorded hash. A missing ledger is an empty set.
    pub async fn load(&self) -> Result<HashSet<String>, CompressError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No ledger at {}, starting empty", self.path.display());
                return Ok(HashSet::new());
            }
            Err(e) => {
                return Err(CompressError::Ledger(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_ascii_lowercase)
            .collect())
    }

    /// Open a fresh temporary file next to the ledger for this run's hashes
    pub fn begin_snapshot(&self) -> Result<LedgerSnapshot, CompressError> {
        let dir = self.directory();
        std::fs::create_dir_all(&dir).map_err(|e| {
            CompressError::Ledger(format!("Failed to create {}: {}", dir.display(), e))
        })?;

        let file = tempfile::Builder::new()
            .prefix(".ledger-")
            .suffix(".tmp")
            .tempfile_in(&dir)
            .map_err(|e| {
                CompressError::Ledger(format!("Failed to open snapshot in {}: {}", dir.display(), e))
            })?;

        debug!("Opened ledger snapshot {}", file.path().display());

        Ok(LedgerSnapshot {
            writer: BufWriter::new(file),
            recorded: HashSet::new(),
        })
    }

    /// Atomically replace the durable ledger with the snapshot contents
    pub fn commit(&self, snapshot: LedgerSnapshot) -> Result<(), CompressError> {
        let count = snapshot.recorded.len();
        let file = snapshot
            .writer
            .into_inner()
            .map_err(|e| CompressError::Ledger(format!("Failed to flush snapshot: {}", e.error())))?;

        if let Err(e) = FileManager::match_permissions(file.as_file(), &self.path) {
            discard(file);
            return Err(CompressError::Ledger(format!("Failed to set snapshot permissions: {}", e)));
        }

        if let Err(e) = file.as_file().sync_all() {
            discard(file);
            return Err(CompressError::Ledger(format!("Failed to sync snapshot: {}", e)));
        }

        match file.persist(&self.path) {
            Ok(_) => {
                debug!("Committed {} hashes to {}", count, self.path.display());
                Ok(())
            }
            Err(e) => {
                let reason = e.error.to_string();
                discard(e.file);
                Err(CompressError::Ledger(format!(
                    "Failed to replace {}: {}",
                    self.path.display(),
                    reason
                )))
            }
        }
    }

    fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// Best-effort removal of a snapshot that will never be committed
fn discard(file: NamedTempFile) {
    let path = file.path().to_path_buf();
    if let Err(e) = file.close() {
        warn!("Failed to remove ledger snapshot {}: {}", path.display(), e);
    }
}

/// In-progress ledger for the current run
pub struct LedgerSnapshot {
    writer: BufWriter<NamedTempFile>,
    recorded: HashSet<String>,
}

impl LedgerSnapshot {
    /// Append a hash, once per snapshot
    pub fn record(&mut self, hash: &str) -> Result<(), CompressError> {
        if self.recorded.contains(hash) {
            return Ok(());
        }
        writeln!(self.writer, "{}", hash)
            .map_err(|e| CompressError::Ledger(format!("Failed to write snapshot: {}", e)))?;
        self.recorded.insert(hash.to_string());
        Ok(())
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.recorded.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.recorded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorded.is_empty()
    }

    /// Temporary file backing this snapshot
    pub fn path(&self) -> &Path {
        self.writer.get_ref().path()
    }
}
