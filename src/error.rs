//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `CompressError` enum per categorizzare gli errori fatali del run
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Ledger`: Errori di scrittura/commit del ledger (fatali, nessun commit)
//! - `InvalidPattern`: Regex della whitelist non valida
//! - `InvalidRoot`: Directory radice inesistente o non directory
//! - `CredentialsExhausted`: Tutte le API key hanno raggiunto il limite
//! - `Http`: Errori di costruzione del client HTTP
//!
//! Gli errori per singolo file (formato non supportato, rete) NON passano da qui:
//! vengono loggati e il file viene saltato.
//!
//! ## Esempio:
//! ```ignore
//! if !root.is_dir() {
//!     return Err(CompressError::InvalidRoot(root.to_path_buf()));
//! }
//! ```

use std::path::PathBuf;

/// Custom error types for image compression
#[derive(thiserror::Error, Debug)]
pub enum CompressError {
    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Invalid whitelist pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Not a valid directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    #[error("All {0} API keys have reached their usage limit")]
    CredentialsExhausted(usize),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
