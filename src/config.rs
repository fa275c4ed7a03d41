//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di compressione
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `root`: Directory da comprimere ricorsivamente (default: ".")
//! - `api_keys`: Lista ordinata di API key Tinify (almeno una)
//! - `min_image_size`: Sotto questa dimensione (byte) non si comprime (default: 20 KB)
//! - `replace_original`: Sovrascrive l'originale o scrive in `compress/` (default: true)
//! - `whitelist`: Regex ancorate su nomi file e path di directory da escludere
//! - `output_dir`: Directory di output alternativa a `<root>/compress`
//! - `ledger_file`: Path del ledger (default: `<root>/compressed_files_sha256.txt`)
//! - `api_endpoint`: Base URL del servizio (default: "https://api.tinify.com")
//! - `dry_run`: Nessuna chiamata remota, nessuna scrittura (default: false)
//! - `json_output`: Eventi JSON su stdout invece dei log (default: false)
//!
//! ## Esempio:
//! ```ignore
//! let config = Config {
//!     root: PathBuf::from("/photos"),
//!     api_keys: vec!["key-1".to_string(), "key-2".to_string()],
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default ledger file name, created inside the root directory
pub const LEDGER_FILE_NAME: &str = "compressed_files_sha256.txt";

/// Default name of the mirrored output folder under the root
pub const OUTPUT_DIR_NAME: &str = "compress";

/// Configuration for image compression
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory scanned recursively for images
    pub root: PathBuf,
    /// Ordered API keys, rotated when one hits its quota
    pub api_keys: Vec<String>,
    /// Files smaller than this many bytes are never compressed
    pub min_image_size: u64,
    /// Overwrite originals in place instead of mirroring into an output tree
    pub replace_original: bool,
    /// Anchored regexes matched against file names and directory paths
    pub whitelist: Vec<String>,
    /// Output directory for mirrored mode (None = `<root>/compress`)
    pub output_dir: Option<PathBuf>,
    /// Ledger location (None = `<root>/compressed_files_sha256.txt`)
    pub ledger_file: Option<PathBuf>,
    /// Base URL of the compression service
    pub api_endpoint: String,
    /// Dry run - don't call the service or touch any file
    pub dry_run: bool,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            api_keys: Vec::new(),
            min_image_size: 20 * 1024,
            replace_original: true,
            whitelist: Vec::new(),
            output_dir: None,
            ledger_file: None,
            api_endpoint: "https://api.tinify.com".to_string(),
            dry_run: false,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.api_keys.is_empty() && !self.dry_run {
            return Err(anyhow::anyhow!("At least one API key is required"));
        }

        if self.api_keys.iter().any(|key| key.trim().is_empty()) {
            return Err(anyhow::anyhow!("API keys must not be blank"));
        }

        if self.api_endpoint.trim().is_empty() {
            return Err(anyhow::anyhow!("API endpoint must not be empty"));
        }

        for pattern in &self.whitelist {
            regex::Regex::new(pattern)
                .map_err(|e| anyhow::anyhow!("Invalid whitelist pattern '{}': {}", pattern, e))?;
        }

        if !self.root.exists() {
            return Err(anyhow::anyhow!("Root directory does not exist: {}", self.root.display()));
        }
        if !self.root.is_dir() {
            return Err(anyhow::anyhow!("Root path is not a directory: {}", self.root.display()));
        }

        if let Some(ref output_dir) = self.output_dir {
            if output_dir.exists() && !output_dir.is_dir() {
                return Err(anyhow::anyhow!("Output path is not a directory: {}", output_dir.display()));
            }
        }

        Ok(())
    }

    /// Ledger path, falling back to the default file inside `root`
    pub fn ledger_path(&self, root: &Path) -> PathBuf {
        self.ledger_file
            .clone()
            .unwrap_or_else(|| root.join(LEDGER_FILE_NAME))
    }

    /// Mirrored output directory, falling back to `<root>/compress`
    pub fn output_path(&self, root: &Path) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| root.join(OUTPUT_DIR_NAME))
    }

    /// Per-user config file, if the platform has a config directory
    pub fn default_location() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("space-image-compressor").join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
