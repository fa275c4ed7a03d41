//! In-memory compressor for exercising the invoker and the orchestrator.

use crate::tinify::{CompressOutcome, Compressor};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Deterministic fake image content of `len` bytes
pub fn image_bytes(seed: u8, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

/// Keeps the first third of the input. Content starting with `BAD` is rejected,
/// and a key with a budget reports quota exhaustion once the budget is spent.
#[derive(Default)]
pub struct ScriptedCompressor {
    budgets: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedCompressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `successes` calls with `key` before it reports quota exhaustion
    pub fn with_budget(self, key: &str, successes: usize) -> Self {
        self.budgets.lock().unwrap().insert(key.to_string(), successes);
        self
    }

    /// Credentials used, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Compressor for ScriptedCompressor {
    async fn compress(&self, data: &[u8], credential: &str) -> CompressOutcome {
        self.calls.lock().unwrap().push(credential.to_string());

        if let Some(remaining) = self.budgets.lock().unwrap().get_mut(credential) {
            if *remaining == 0 {
                return CompressOutcome::QuotaExceeded("Your monthly limit has been exceeded".to_string());
            }
            *remaining -= 1;
        }

        if data.starts_with(b"BAD") {
            return CompressOutcome::Failure("Unsupported media type".to_string());
        }

        CompressOutcome::Success(data[..data.len() / 3].to_vec())
    }
}
