//! # Optimizer Module
//!
//! Modulo che separa le responsabilità in sottomoduli:
//! - `image_optimizer`: Orchestratore principale
//! - `task_optimizer`: Worker per singoli file
//! - `progress_tracker`: Gestione progress unificata
//! - `path_resolver`: Logica di calcolo path centralizzata

pub mod image_optimizer;
pub mod task_optimizer;
pub mod progress_tracker;
pub mod path_resolver;

#[cfg(test)]
pub(crate) mod test_support;

pub use image_optimizer::{ImageOptimizer, RunSummary};
pub use task_optimizer::{FileOutcome, TaskOptimizer};
pub use progress_tracker::ProgressTracker;
pub use path_resolver::PathResolver;
