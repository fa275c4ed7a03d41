//! # Image Optimizer Main Orchestrator
//!
//! Orchestratore principale che collega walker, ledger e worker.
//!
//! ## Flusso:
//! 1. Carica il ledger del run precedente
//! 2. Apre uno snapshot temporaneo accanto al ledger
//! 3. Cammina l'albero e processa un file alla volta
//! 4. Se le API key finiscono: stop, ma lo snapshot viene comunque committato
//! 5. Commit atomico dello snapshot (saltato in dry run)

use crate::{
    allowlist::Allowlist,
    config::Config,
    error::CompressError,
    file_manager::ImageWalker,
    json_output::JsonMessage,
    ledger::{LedgerSnapshot, LedgerStore},
    optimizer::{
        path_resolver::PathResolver, progress_tracker::ProgressTracker,
        task_optimizer::TaskOptimizer,
    },
    progress::RunStats,
    tinify::Compressor,
};
use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

/// Outcome of a whole run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: RunStats,
    /// Hashes in the ledger after this run (0 in dry run)
    pub ledger_entries: usize,
    pub credentials_exhausted: bool,
}

/// Orchestratore principale
pub struct ImageOptimizer<C: Compressor> {
    config: Config,
    root: PathBuf,
    output_root: Option<PathBuf>,
    ledger: LedgerStore,
    walker: ImageWalker,
    task_optimizer: TaskOptimizer<C>,
}

impl<C: Compressor> ImageOptimizer<C> {
    /// Crea nuova istanza dell'ottimizzatore
    pub fn new(config: Config, compressor: C) -> Result<Self> {
        let root = config
            .root
            .canonicalize()
            .map_err(|_| CompressError::InvalidRoot(config.root.clone()))?;
        if !root.is_dir() {
            return Err(CompressError::InvalidRoot(config.root.clone()).into());
        }
        config.validate()?;

        let output_root = if config.replace_original {
            None
        } else {
            Some(PathResolver::resolve(&config.output_path(&root))?)
        };

        let mut walker = ImageWalker::new(Allowlist::new(&config.whitelist)?);
        if let Some(ref output_root) = output_root {
            walker = walker.exclude_dir(output_root.clone());
        }

        let ledger = LedgerStore::new(PathResolver::absolutize(&config.ledger_path(&root))?);
        let task_optimizer = TaskOptimizer::new(config.clone(), compressor, output_root.clone());

        Ok(Self {
            config,
            root,
            output_root,
            ledger,
            walker,
            task_optimizer,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn compressor(&self) -> &C {
        self.task_optimizer.compressor()
    }

    /// Esegue il processo di compressione
    pub async fn run(&mut self) -> Result<RunSummary> {
        let start_time = Instant::now();
        let known = self.ledger.load().await?;

        self.emit_start_message(known.len());

        if let Some(ref output_root) = self.output_root {
            if !self.config.dry_run {
                tokio::fs::create_dir_all(output_root).await?;
            }
        }

        let mut snapshot = self.ledger.begin_snapshot()?;
        let mut tracker = ProgressTracker::new(self.config.json_output);
        let mut credentials_exhausted = false;

        for candidate in self.walker.walk(&self.root) {
            match self
                .task_optimizer
                .process_candidate(&candidate, &known, &mut snapshot)
                .await
            {
                Ok(outcome) => tracker.handle_file_completion(&candidate, &outcome),
                Err(CompressError::CredentialsExhausted(total)) => {
                    error!(
                        "All {} API keys have reached their usage limit, stopping at {}",
                        total,
                        candidate.path.display()
                    );
                    credentials_exhausted = true;
                    break;
                }
                Err(e) => {
                    self.emit_error(&e.to_string());
                    return Err(e.into());
                }
            }
        }

        if credentials_exhausted {
            Self::carry_forward(&known, &mut snapshot)?;
        }

        let ledger_entries = if self.config.dry_run {
            info!("Dry run: ledger {} left untouched", self.ledger.path().display());
            drop(snapshot);
            0
        } else {
            let entries = snapshot.len();
            if let Err(e) = self.ledger.commit(snapshot) {
                self.emit_error(&e.to_string());
                return Err(e.into());
            }
            entries
        };

        tracker.finish(ledger_entries, credentials_exhausted, start_time.elapsed().as_secs_f64());

        Ok(RunSummary {
            stats: tracker.stats().clone(),
            ledger_entries,
            credentials_exhausted,
        })
    }

    /// Keep earlier hashes of files the aborted run never reached
    fn carry_forward(known: &HashSet<String>, snapshot: &mut LedgerSnapshot) -> Result<(), CompressError> {
        let mut remaining: Vec<&String> = known.iter().filter(|hash| !snapshot.contains(hash)).collect();
        remaining.sort();
        if !remaining.is_empty() {
            warn!("Run aborted early, keeping {} earlier ledger entries", remaining.len());
        }
        for hash in remaining {
            snapshot.record(hash)?;
        }
        Ok(())
    }

    fn emit_start_message(&self, ledger_entries: usize) {
        if self.config.json_output {
            JsonMessage::Start {
                root: self.root.clone(),
                output_dir: self.output_root.clone(),
                ledger_file: self.ledger.path().to_path_buf(),
                ledger_entries,
                api_keys: self.config.api_keys.len(),
                min_image_size: self.config.min_image_size,
                dry_run: self.config.dry_run,
            }
            .emit();
            return;
        }

        info!("Starting image compression in: {}", self.root.display());
        match self.output_root {
            Some(ref output_root) => info!("Output directory: {}", output_root.display()),
            None => info!("Mode: Replace files in place"),
        }
        info!("Ledger: {} ({} entries)", self.ledger.path().display(), ledger_entries);
        info!("Minimum image size: {} bytes", self.config.min_image_size);
        if !self.config.whitelist.is_empty() {
            info!("Whitelist: {} patterns", self.config.whitelist.len());
        }
        if self.config.dry_run {
            info!("Dry run mode: No files will be modified");
        }
    }

    fn emit_error(&self, message: &str) {
        if self.config.json_output {
            JsonMessage::error(message.to_string()).emit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LEDGER_FILE_NAME;
    use crate::file_manager::FileManager;
    use crate::optimizer::test_support::{image_bytes, ScriptedCompressor};
    use tempfile::TempDir;

    const KB: usize = 1024;

    fn write(root: &Path, relative: &str, content: &[u8]) -> PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    fn config(root: &Path, keys: &[&str]) -> Config {
        Config {
            root: root.to_path_buf(),
            api_keys: keys.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        }
    }

    fn ledger_lines(root: &Path) -> Vec<String> {
        std::fs::read_to_string(root.join(LEDGER_FILE_NAME))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_mixed_directory_scenario() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let a = image_bytes(1, 30 * KB);
        let b = image_bytes(2, 10 * KB);
        let c = image_bytes(3, 30 * KB);
        write(root, "a.png", &a);
        write(root, "b.jpg", &b);
        write(root, "c.png", &c);
        let c_hash = FileManager::hash_bytes(&c);
        std::fs::write(root.join(LEDGER_FILE_NAME), format!("{}\n", c_hash)).unwrap();

        let mut optimizer = ImageOptimizer::new(config(root, &["k1"]), ScriptedCompressor::new()).unwrap();
        let summary = optimizer.run().await.unwrap();

        assert_eq!(optimizer.compressor().call_count(), 1);
        assert_eq!(summary.stats.files_compressed, 1);
        assert_eq!(summary.stats.too_small, 1);
        assert_eq!(summary.stats.already_compressed, 1);

        let lines = ledger_lines(root);
        assert!(lines.contains(&FileManager::hash_bytes(&a)));
        assert!(lines.contains(&c_hash));
        assert!(!lines.contains(&FileManager::hash_bytes(&b)));
        assert_eq!(std::fs::read(root.join("a.png")).unwrap().len(), 10 * KB);
        assert_eq!(std::fs::read(root.join("b.jpg")).unwrap(), b);
    }

    #[tokio::test]
    async fn test_second_run_in_place_makes_no_calls() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "a.png", &image_bytes(1, 30 * KB));
        write(root, "nested/b.webp", &image_bytes(2, 60 * KB));

        let mut first = ImageOptimizer::new(config(root, &["k1"]), ScriptedCompressor::new()).unwrap();
        first.run().await.unwrap();
        assert_eq!(first.compressor().call_count(), 2);

        let mut second = ImageOptimizer::new(config(root, &["k1"]), ScriptedCompressor::new()).unwrap();
        let summary = second.run().await.unwrap();
        assert_eq!(second.compressor().call_count(), 0);
        assert_eq!(summary.stats.already_compressed, 2);
    }

    #[tokio::test]
    async fn test_second_run_mirrored_makes_no_calls() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let original = image_bytes(1, 30 * KB);
        write(root, "album/a.png", &original);

        let mut cfg = config(root, &["k1"]);
        cfg.replace_original = false;

        let mut first = ImageOptimizer::new(cfg.clone(), ScriptedCompressor::new()).unwrap();
        first.run().await.unwrap();
        let mirrored = first.root().join("compress").join("album").join("a.png");
        assert_eq!(std::fs::read(&mirrored).unwrap().len(), 10 * KB);
        assert_eq!(std::fs::read(root.join("album/a.png")).unwrap(), original);

        let mut second = ImageOptimizer::new(cfg, ScriptedCompressor::new()).unwrap();
        second.run().await.unwrap();
        assert_eq!(second.compressor().call_count(), 0);
    }

    #[tokio::test]
    async fn test_whitelisted_files_never_reach_service() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "icon_pot_anim_01.png", &image_bytes(1, 30 * KB));
        write(root, "sprites/hero.png", &image_bytes(2, 30 * KB));
        write(root, "photo.jpg", &image_bytes(3, 30 * KB));

        let mut cfg = config(root, &["k1"]);
        cfg.whitelist = vec!["^icon_pot_anim_.*$".to_string(), ".*/sprites$".to_string()];

        let mut optimizer = ImageOptimizer::new(cfg, ScriptedCompressor::new()).unwrap();
        let summary = optimizer.run().await.unwrap();

        assert_eq!(optimizer.compressor().call_count(), 1);
        assert_eq!(summary.stats.files_seen, 1);
        assert_eq!(std::fs::read(root.join("icon_pot_anim_01.png")).unwrap().len(), 30 * KB);
    }

    #[tokio::test]
    async fn test_exhausted_keys_abort_but_commit() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let a = image_bytes(1, 30 * KB);
        let b = image_bytes(2, 30 * KB);
        let z = image_bytes(3, 30 * KB);
        write(root, "a.png", &a);
        write(root, "b.png", &b);
        write(root, "z.png", &z);
        let z_hash = FileManager::hash_bytes(&z);
        std::fs::write(root.join(LEDGER_FILE_NAME), format!("{}\n", z_hash)).unwrap();

        let compressor = ScriptedCompressor::new().with_budget("k1", 1).with_budget("k2", 0);
        let mut optimizer = ImageOptimizer::new(config(root, &["k1", "k2"]), compressor).unwrap();
        let summary = optimizer.run().await.unwrap();

        assert!(summary.credentials_exhausted);
        assert_eq!(optimizer.compressor().calls(), vec!["k1", "k1", "k2"]);
        assert_eq!(summary.stats.files_compressed, 1);

        let lines = ledger_lines(root);
        assert!(lines.contains(&FileManager::hash_bytes(&a)));
        assert!(!lines.contains(&FileManager::hash_bytes(&b)));
        assert!(lines.contains(&z_hash));
        assert_eq!(std::fs::read(root.join("b.png")).unwrap(), b);
    }

    #[tokio::test]
    async fn test_complete_run_drops_stale_entries() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let stale = "0".repeat(64);
        std::fs::write(root.join(LEDGER_FILE_NAME), format!("{}\n", stale)).unwrap();
        write(root, "a.png", &image_bytes(1, 30 * KB));

        let mut optimizer = ImageOptimizer::new(config(root, &["k1"]), ScriptedCompressor::new()).unwrap();
        optimizer.run().await.unwrap();

        assert!(!ledger_lines(root).contains(&stale));
    }

    #[tokio::test]
    async fn test_dry_run_leaves_everything_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let a = image_bytes(1, 30 * KB);
        write(root, "a.png", &a);

        let mut cfg = config(root, &[]);
        cfg.dry_run = true;
        cfg.replace_original = false;

        let mut optimizer = ImageOptimizer::new(cfg, ScriptedCompressor::new()).unwrap();
        let summary = optimizer.run().await.unwrap();

        assert_eq!(summary.stats.pending, 1);
        assert_eq!(optimizer.compressor().call_count(), 0);
        assert!(!root.join(LEDGER_FILE_NAME).exists());
        assert!(!root.join("compress").exists());
        assert_eq!(std::fs::read(root.join("a.png")).unwrap(), a);
    }

    #[tokio::test]
    async fn test_unwritable_ledger_fails_run() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let a = image_bytes(1, 30 * KB);
        write(root, "a.png", &a);
        let ledger_dir = root.join("state");
        std::fs::create_dir(&ledger_dir).unwrap();

        let mut cfg = config(root, &["k1"]);
        cfg.ledger_file = Some(ledger_dir.clone());

        let mut optimizer = ImageOptimizer::new(cfg, ScriptedCompressor::new()).unwrap();
        let err = optimizer.run().await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<CompressError>(),
            Some(CompressError::Ledger(_))
        ));
        assert!(ledger_dir.is_dir());
        assert_eq!(std::fs::read(root.join("a.png")).unwrap(), a);
        let leftovers = std::fs::read_dir(root)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".ledger-"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_output_dir_with_dot_dot_is_still_pruned() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("photos");
        write(&root, "a.png", &image_bytes(1, 30 * KB));
        std::fs::create_dir_all(root.join("out")).unwrap();

        let mut cfg = config(&root, &["k1"]);
        cfg.replace_original = false;
        cfg.output_dir = Some(root.join("out").join("..").join("out"));

        let mut first = ImageOptimizer::new(cfg.clone(), ScriptedCompressor::new()).unwrap();
        let summary = first.run().await.unwrap();
        assert_eq!(summary.stats.files_seen, 1);

        let mut second = ImageOptimizer::new(cfg, ScriptedCompressor::new()).unwrap();
        let summary = second.run().await.unwrap();
        assert_eq!(summary.stats.files_seen, 1);
        assert_eq!(second.compressor().call_count(), 0);
    }

    #[test]
    fn test_invalid_root_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let cfg = config(&temp_dir.path().join("missing"), &["k1"]);
        let err = ImageOptimizer::new(cfg, ScriptedCompressor::new()).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<CompressError>(),
            Some(CompressError::InvalidRoot(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut optimizer =
            ImageOptimizer::new(config(temp_dir.path(), &["k1"]), ScriptedCompressor::new()).unwrap();
        let summary = optimizer.run().await.unwrap();

        assert_eq!(summary.stats.files_seen, 0);
        assert_eq!(summary.ledger_entries, 0);
        assert!(temp_dir.path().join(LEDGER_FILE_NAME).exists());
    }
}
