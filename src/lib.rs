//! # Space Image Compressor Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom
//! - `ledger`: Ledger degli hash già compressi, commit atomico
//! - `allowlist`: Regex di esclusione per file e directory
//! - `file_manager`: Discovery immagini, hashing, scrittura sicura
//! - `credentials`: Pool di API key con rotazione
//! - `tinify`: Client del servizio di compressione remoto
//! - `optimizer`: Orchestratore principale del processo
//! - `progress`: Progress tracking e statistiche
//! - `json_output`: Eventi JSON per uso programmatico
//!
//! ## Utilizzo:
//! ```ignore
//! use space_image_compressor::{Config, ImageOptimizer, TinifyClient};
//!
//! let config = Config::from_file(&path).await?;
//! let client = TinifyClient::new(&config.api_endpoint)?;
//! let mut optimizer = ImageOptimizer::new(config, client)?;
//! let summary = optimizer.run().await?;
//! ```

pub mod allowlist;
pub mod config;
pub mod credentials;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod ledger;
pub mod optimizer;
pub mod progress;
pub mod tinify;

pub use config::Config;
pub use credentials::CredentialPool;
pub use error::CompressError;
pub use ledger::{LedgerSnapshot, LedgerStore};
pub use optimizer::{ImageOptimizer, RunSummary};
pub use tinify::{CompressOutcome, Compressor, TinifyClient};
