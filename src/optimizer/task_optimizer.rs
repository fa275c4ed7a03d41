//! # Task Optimizer Module
//!
//! Worker per la compressione di singoli file.
//! Separato dall'orchestratore principale per maggiore modularità.
//!
//! ## Pipeline per file:
//! 1. Hash SHA-256 del contenuto (a blocchi)
//! 2. Hash già nel ledger: skip, ma l'hash viene ri-registrato nello snapshot
//! 3. Sotto `min_image_size` (o vuoto): skip, nessuna registrazione
//! 4. Chiamata remota con la key attiva, una sola rotazione + retry su quota esaurita
//! 5. Scrittura in-place o nell'albero di output, registrazione hash originale e compresso

use crate::{
    config::Config,
    credentials::{redact, CredentialPool},
    error::CompressError,
    file_manager::{FileCandidate, FileManager},
    json_output::JsonMessage,
    ledger::LedgerSnapshot,
    optimizer::path_resolver::PathResolver,
    tinify::{CompressOutcome, Compressor},
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What happened to a single candidate
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Compressed {
        original_size: u64,
        compressed_size: u64,
        output_path: PathBuf,
    },
    AlreadyCompressed,
    TooSmall { size: u64 },
    WouldCompress { size: u64 },
    Failed { reason: String },
}

/// Worker per elaborazione singoli file
pub struct TaskOptimizer<C: Compressor> {
    config: Config,
    compressor: C,
    credentials: CredentialPool,
    output_root: Option<PathBuf>,
}

impl<C: Compressor> TaskOptimizer<C> {
    /// `output_root` is `None` for in-place replacement
    pub fn new(config: Config, compressor: C, output_root: Option<PathBuf>) -> Self {
        let credentials = CredentialPool::new(config.api_keys.clone());
        Self {
            config,
            compressor,
            credentials,
            output_root,
        }
    }

    pub fn credentials(&self) -> &CredentialPool {
        &self.credentials
    }

    pub fn compressor(&self) -> &C {
        &self.compressor
    }

    /// Processa un singolo candidato.
    ///
    /// Only ledger write failures and credential exhaustion come back as `Err`;
    /// every other problem is local to the file and reported as `FileOutcome::Failed`.
    pub async fn process_candidate(
        &mut self,
        candidate: &FileCandidate,
        ledger: &HashSet<String>,
        snapshot: &mut LedgerSnapshot,
    ) -> Result<FileOutcome, CompressError> {
        let path = &candidate.path;

        let fingerprint = match FileManager::fingerprint(path).await {
            Ok(fingerprint) => fingerprint,
            Err(e) => return Ok(Self::failed(path, format!("Failed to read file: {}", e))),
        };

        if ledger.contains(&fingerprint.hash) {
            snapshot.record(&fingerprint.hash)?;
            return Ok(FileOutcome::AlreadyCompressed);
        }

        if fingerprint.size == 0 || fingerprint.size < self.config.min_image_size {
            return Ok(FileOutcome::TooSmall { size: fingerprint.size });
        }

        if self.config.dry_run {
            return Ok(FileOutcome::WouldCompress { size: fingerprint.size });
        }

        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) => return Ok(Self::failed(path, format!("Failed to read file: {}", e))),
        };

        debug!("Compressing {:?} image: {}", candidate.format, path.display());
        let compressed = match self.compress_with_rotation(path, &data).await? {
            CompressOutcome::Success(bytes) => bytes,
            CompressOutcome::QuotaExceeded(reason) | CompressOutcome::Failure(reason) => {
                return Ok(Self::failed(path, reason));
            }
        };

        let output_path = PathResolver::get_output_path(candidate, self.output_root.as_deref());
        if let Err(e) = FileManager::write_atomically(&output_path, &compressed) {
            return Ok(Self::failed(path, format!("Failed to write {}: {}", output_path.display(), e)));
        }

        snapshot.record(&fingerprint.hash)?;
        snapshot.record(&FileManager::hash_bytes(&compressed))?;

        Ok(FileOutcome::Compressed {
            original_size: fingerprint.size,
            compressed_size: compressed.len() as u64,
            output_path,
        })
    }

    /// One call, plus exactly one retry with the next key on quota exhaustion
    async fn compress_with_rotation(
        &mut self,
        path: &Path,
        data: &[u8],
    ) -> Result<CompressOutcome, CompressError> {
        let key = self.active_key()?;
        match self.compressor.compress(data, &key).await {
            CompressOutcome::QuotaExceeded(reason) => {
                warn!("API key {} reached its limit ({}), switching to the next key", redact(&key), reason);
                self.rotate()?;

                let key = self.active_key()?;
                debug!("Retrying {} with API key {}", path.display(), redact(&key));
                match self.compressor.compress(data, &key).await {
                    CompressOutcome::QuotaExceeded(reason) => {
                        warn!("API key {} reached its limit on retry ({})", redact(&key), reason);
                        self.rotate()?;
                        Ok(CompressOutcome::Failure(format!("Quota exceeded on retry: {}", reason)))
                    }
                    outcome => Ok(outcome),
                }
            }
            outcome => Ok(outcome),
        }
    }

    fn active_key(&self) -> Result<String, CompressError> {
        self.credentials
            .current()
            .map(str::to_string)
            .ok_or(CompressError::CredentialsExhausted(self.credentials.len()))
    }

    fn rotate(&mut self) -> Result<(), CompressError> {
        if !self.credentials.advance() {
            return Err(CompressError::CredentialsExhausted(self.credentials.len()));
        }

        if self.config.json_output {
            JsonMessage::CredentialRotated {
                position: self.credentials.position(),
                total: self.credentials.len(),
            }
            .emit();
        } else {
            info!(
                "Switched to API key {}/{}",
                self.credentials.position() + 1,
                self.credentials.len()
            );
        }
        Ok(())
    }

    fn failed(path: &Path, reason: String) -> FileOutcome {
        warn!("Skipping image: {}, error: {}", path.display(), reason);
        FileOutcome::Failed { reason }
    }
}
