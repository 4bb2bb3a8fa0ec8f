//! Token storage for the Otters API.
//!
//! This module holds the access/refresh token pair issued by the backend
//! after a Google credential exchange. The pair can live purely in memory or
//! be backed by a JSON file so it survives process restarts. The file format
//! carries both tokens in one document, so a partial pair is never persisted.

use std::env;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};

use crate::error::{Error, Result};

/// Environment variable overriding the default token file location.
const TOKEN_FILE_ENV: &str = "OTTERS_TOKEN_FILE";

/// An access/refresh token pair issued by the Otters backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived token attached to authenticated requests.
    pub access_token: String,
    /// Long-lived token used to obtain a fresh access token.
    pub refresh_token: String,
}

impl TokenPair {
    /// Creates a new token pair.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct TokenFile {
    version: u8,
    access_token: String,
    refresh_token: String,
}

impl TokenFile {
    fn new(pair: &TokenPair) -> Self {
        Self {
            version: 1,
            access_token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
        }
    }

    fn into_pair(self) -> TokenPair {
        TokenPair {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
        }
    }
}

/// Process-wide holder of the current token pair.
///
/// One store instance is shared between the gateway (which only reads) and
/// the authentication flow (which writes on login/refresh and clears on
/// logout). Reads never fail; an empty store simply yields `None`.
#[derive(Debug)]
pub struct TokenStore {
    path: Option<PathBuf>,
    tokens: Mutex<Option<TokenPair>>,
}

impl TokenStore {
    /// Creates a store with no backing file.
    ///
    /// Tokens set on an in-memory store do not survive the process.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            tokens: Mutex::new(None),
        }
    }

    /// Opens a store backed by the given file, loading any persisted pair.
    ///
    /// A missing file is not an error; the store starts empty. An unreadable
    /// or malformed file is surfaced explicitly so callers can decide whether
    /// to fall back to an in-memory store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tokens = if path.exists() {
            let file = File::open(&path)
                .map_err(|err| Error::io("failed to open token file", err))?;
            let reader = BufReader::new(file);
            let parsed: TokenFile = from_reader(reader).map_err(|err| {
                Error::serialization("failed to parse token file", Some(Box::new(err)))
            })?;
            Some(parsed.into_pair())
        } else {
            None
        };
        Ok(Self {
            path: Some(path),
            tokens: Mutex::new(tokens),
        })
    }

    /// Resolves the default token file location.
    ///
    /// Honors `OTTERS_TOKEN_FILE`, then falls back to
    /// `$HOME/.otters/tokens.json`.
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = env::var(TOKEN_FILE_ENV) {
            return Some(PathBuf::from(path));
        }
        env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join(".otters").join("tokens.json"))
    }

    /// Returns the current token pair, if any.
    pub fn get(&self) -> Option<TokenPair> {
        self.lock().clone()
    }

    /// Returns the current access token, if any.
    pub fn access_token(&self) -> Option<String> {
        self.lock().as_ref().map(|pair| pair.access_token.clone())
    }

    /// Returns the current refresh token, if any.
    pub fn refresh_token(&self) -> Option<String> {
        self.lock().as_ref().map(|pair| pair.refresh_token.clone())
    }

    /// Replaces the stored pair and persists it if the store has a backing
    /// file.
    pub fn set(&self, pair: TokenPair) -> Result<()> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|err| Error::io("failed to create token directory", err))?;
            }
            let file = File::create(path)
                .map_err(|err| Error::io("failed to create token file", err))?;
            let writer = BufWriter::new(file);
            to_writer_pretty(writer, &TokenFile::new(&pair)).map_err(|err| {
                Error::serialization("failed to serialize token file", Some(Box::new(err)))
            })?;
        }
        *self.lock() = Some(pair);
        Ok(())
    }

    /// Removes the stored pair and deletes the backing file. Idempotent.
    pub fn clear(&self) -> Result<()> {
        if let Some(path) = &self.path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(Error::io("failed to remove token file", err)),
            }
        }
        *self.lock() = None;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Option<TokenPair>> {
        self.tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
