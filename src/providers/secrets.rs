//! Secret file access for vendor providers
//!
//! Credentials live in a flat dotenv-format file (`key=value` lines) outside
//! the repository. The file is re-read for every batch, so rotating a key
//! takes effect without restarting the engine.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::ProviderError;

/// Parsed contents of one secret file
#[derive(Debug, Clone)]
pub struct SecretStore {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl SecretStore {
    /// Load and parse a dotenv-format secret file
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::SecretFile`] when the file cannot be read
    /// or a line cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, ProviderError> {
        let iter = dotenv::from_path_iter(path).map_err(|err| ProviderError::SecretFile {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

        let mut values = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|err| ProviderError::SecretFile {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
            values.insert(key, value);
        }

        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    /// Look up an optional credential
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Fetch a required credential; empty values count as missing
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::MissingCredential`] naming the absent key.
    pub fn require(&self, key: &'static str) -> Result<String, ProviderError> {
        self.values
            .get(key)
            .filter(|value| !value.is_empty())
            .cloned()
            .ok_or(ProviderError::MissingCredential {
                path: self.path.clone(),
                key,
            })
    }
}
