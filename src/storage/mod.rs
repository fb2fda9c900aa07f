use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, OpenOptions};

use crate::model::PasswordRecord;

pub const DEFAULT_VAULT_PATH: &str = "./data/vault";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to prepare vault file {path}: {source}")]
    Prepare {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read vault file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed vault line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// Line-oriented password store: `id,service_name,password_text` per line.
#[derive(Clone, Debug)]
pub struct VaultStore {
    path: PathBuf,
}

impl VaultStore {
    /// Opens the vault, creating an empty file (and its directory) if needed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let prepare_err = |source| StorageError::Prepare {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(prepare_err)?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(prepare_err)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read_all(&self) -> Result<Vec<PasswordRecord>, StorageError> {
        let contents = fs::read_to_string(&self.path)
            .await
            .map_err(|source| StorageError::Read {
                path: self.path.display().to_string(),
                source,
            })?;
        parse_vault(&contents)
    }
}

pub fn parse_vault(contents: &str) -> Result<Vec<PasswordRecord>, StorageError> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| parse_line(line, idx + 1))
        .collect()
}

/// The password is everything after the second comma, so it may itself
/// contain commas.
pub fn parse_line(line: &str, number: usize) -> Result<PasswordRecord, StorageError> {
    let mut fields = line.splitn(3, ',');
    let (Some(id), Some(service_name), Some(password_text)) =
        (fields.next(), fields.next(), fields.next())
    else {
        return Err(StorageError::Malformed {
            line: number,
            reason: "expected id,service_name,password_text".to_string(),
        });
    };
    let id = id.trim().parse::<u64>().map_err(|_| StorageError::Malformed {
        line: number,
        reason: format!("invalid id '{}'", id.trim()),
    })?;
    Ok(PasswordRecord::new(id, service_name, password_text))
}
