use log::info;
use rusqlite::{Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::edit::ConversionParams;
use super::history::{ColorHistory, HISTORY_KEY};

/// Settings key for the last used conversion parameters
pub const PARAMS_KEY: &str = "image-conversor-params";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("settings database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed value for {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// The Library manages the small SQLite settings database.
/// It stores JSON values under fixed keys (recent colors, last parameters).
pub struct Library {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl Library {
    /// Open or create the settings database at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(db_path)?;
        info!("📁 Settings database at: {}", db_path.display());

        let library = Library {
            conn,
            db_path: Some(db_path.to_path_buf()),
        };
        library.init_schema()?;
        Ok(library)
    }

    /// A throwaway database that lives only as long as this value
    pub fn open_in_memory() -> Result<Self> {
        let library = Library {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Create the settings table if it doesn't exist.
    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL,
                updated_at      INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Get the path to the database file (None for in-memory stores)
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Raw stored string for a key
    pub fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, value, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    /// Read a JSON value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key)? {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|source| StoreError::Json {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Write a JSON value
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value).map_err(|source| StoreError::Json {
            key: key.to_string(),
            source,
        })?;
        self.set_raw(key, &json)
    }

    // ========== Typed accessors ==========

    pub fn load_history(&self) -> Result<ColorHistory> {
        let colors: Vec<String> = self.get(HISTORY_KEY)?.unwrap_or_default();
        Ok(ColorHistory::from_colors(colors))
    }

    pub fn save_history(&self, history: &ColorHistory) -> Result<()> {
        self.set(HISTORY_KEY, history.colors())
    }

    pub fn load_params(&self) -> Result<ConversionParams> {
        match self.get_raw(PARAMS_KEY)? {
            Some(json) => {
                ConversionParams::from_json(&json).map_err(|source| StoreError::Json {
                    key: PARAMS_KEY.to_string(),
                    source,
                })
            }
            None => Ok(ConversionParams::default()),
        }
    }

    pub fn save_params(&self, params: &ConversionParams) -> Result<()> {
        let json = params.to_json().map_err(|source| StoreError::Json {
            key: PARAMS_KEY.to_string(),
            source,
        })?;
        self.set_raw(PARAMS_KEY, &json)
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}
