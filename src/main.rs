//! # Space Image Compressor - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione (file JSON + override da CLI)
//! - Creazione del client remoto e avvio dell'optimizer
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose, `RUST_LOG` vince)
//! 3. Carica il file di configurazione e applica gli override
//! 4. Valida la directory radice (errore unico, nessun walk)
//! 5. Esegue il run e committa il ledger
//!
//! ## Esempio di utilizzo:
//! ```bash
//! image-compressor ~/Pictures --key KEY1 --key KEY2 --whitelist '^icon_pot_anim_.*$'
//! TINIFY_KEYS=KEY1,KEY2 image-compressor ~/Pictures --mirror --min-size 30720
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use space_image_compressor::json_output::JsonMessage;
use space_image_compressor::{CompressError, Config, ImageOptimizer, TinifyClient};

#[derive(Parser)]
#[command(name = "image-compressor")]
#[command(about = "Compress images through Tinify without ever compressing the same content twice")]
struct Args {
    /// Directory containing images to compress
    root: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tinify API key (repeat for fallbacks, tried in order)
    #[arg(short, long = "key", env = "TINIFY_KEYS", value_delimiter = ',')]
    keys: Vec<String>,

    /// Skip images smaller than this many bytes
    #[arg(long)]
    min_size: Option<u64>,

    /// Write compressed copies into a mirrored tree instead of replacing originals
    #[arg(long)]
    mirror: bool,

    /// Output directory for --mirror (default: <root>/compress)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Anchored regex for file names or directory paths to leave alone (repeatable)
    #[arg(short, long)]
    whitelist: Vec<String>,

    /// Ledger file location (default: <root>/compressed_files_sha256.txt)
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Base URL of the compression service
    #[arg(long)]
    endpoint: Option<String>,

    /// Dry run - don't call the service or modify files
    #[arg(long)]
    dry_run: bool,

    /// Emit newline-delimited JSON events on stdout
    #[arg(long)]
    json: bool,

    /// Write the effective configuration to this file and exit
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// CLI flags win over file values
    fn apply(self, mut config: Config) -> Config {
        if let Some(root) = self.root {
            config.root = root;
        }
        if !self.keys.is_empty() {
            config.api_keys = self.keys;
        }
        if let Some(min_size) = self.min_size {
            config.min_image_size = min_size;
        }
        if self.mirror {
            config.replace_original = false;
        }
        if self.output.is_some() {
            config.output_dir = self.output;
        }
        if !self.whitelist.is_empty() {
            config.whitelist = self.whitelist;
        }
        if self.ledger.is_some() {
            config.ledger_file = self.ledger;
        }
        if let Some(endpoint) = self.endpoint {
            config.api_endpoint = endpoint;
        }
        config.dry_run |= self.dry_run;
        config.json_output |= self.json;
        config
    }
}

async fn load_config(explicit: Option<&PathBuf>) -> Result<Config> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(anyhow::anyhow!("Config file does not exist: {}", path.display()));
            }
            Config::from_file(path).await
        }
        None => match Config::default_location() {
            Some(path) => Config::from_file(&path).await,
            None => Ok(Config::default()),
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let save_config = args.save_config.clone();
    let file_config = load_config(args.config.as_ref()).await?;
    let config = args.apply(file_config);

    if let Some(path) = save_config {
        config.save_to_file(&path).await?;
        info!("Configuration saved to {}", path.display());
        return Ok(());
    }

    if !config.root.is_dir() {
        let err = CompressError::InvalidRoot(config.root.clone());
        if config.json_output {
            JsonMessage::error(err.to_string()).emit();
        }
        return Err(err.into());
    }

    let key_count = config.api_keys.len();
    let client = TinifyClient::new(&config.api_endpoint)?;
    let mut optimizer = ImageOptimizer::new(config, client)?;
    let summary = optimizer.run().await?;

    if summary.credentials_exhausted {
        return Err(CompressError::CredentialsExhausted(key_count).into());
    }

    Ok(())
}
