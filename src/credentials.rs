//! Ordered pool of API keys with a forward-only cursor.

/// API keys for the compression service, one active at a time
#[derive(Debug, Clone)]
pub struct CredentialPool {
    keys: Vec<String>,
    cursor: usize,
}

impl CredentialPool {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys, cursor: 0 }
    }

    /// Active key, `None` once the pool is exhausted
    pub fn current(&self) -> Option<&str> {
        self.keys.get(self.cursor).map(String::as_str)
    }

    /// Move to the next key. Returns `false` when none is left.
    pub fn advance(&mut self) -> bool {
        if self.cursor < self.keys.len() {
            self.cursor += 1;
        }
        self.current().is_some()
    }

    pub fn is_exhausted(&self) -> bool {
        self.current().is_none()
    }

    /// Zero-based index of the active key
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Short form of a key for logs, never the full secret
pub fn redact(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    format!("{}…", visible)
}
