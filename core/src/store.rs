/// SQLite-backed key/value settings: last known transaction count and theme.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::state::Theme;

pub const TRANSACTION_COUNT_KEY: &str = "transactionCount";
pub const THEME_KEY: &str = "theme";

pub struct SettingsStore {
    conn: Connection,
}

/// Default DB location: platform data directory + `flashet/settings.db`
/// (Linux: `~/.local/share`, macOS: `~/Library/Application Support`)
fn default_db_path() -> Result<PathBuf> {
    Ok(crate::data_dir()?.join("settings.db"))
}

impl SettingsStore {
    /// Open (or create) the settings store in the default data directory.
    pub fn open() -> Result<Self> {
        Self::open_at(&default_db_path()?)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create data directory")?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
            }
        }
        let conn = Connection::open(path).context("Failed to open settings database")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS settings (
                key   TEXT PRIMARY KEY,
                value TEXT
            );",
            )
            .context("Failed to initialize settings schema")?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .map(Option::flatten)
            .with_context(|| format!("Failed to read setting '{key}'"))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .with_context(|| format!("Failed to write setting '{key}'"))?;
        Ok(())
    }

    /// Last known contract transaction count. Unparseable values read as absent.
    pub fn transaction_count(&self) -> Result<Option<u64>> {
        Ok(self
            .get(TRANSACTION_COUNT_KEY)?
            .and_then(|v| v.trim().parse().ok()))
    }

    pub fn set_transaction_count(&self, count: u64) -> Result<()> {
        self.set(TRANSACTION_COUNT_KEY, &count.to_string())
    }

    /// Stored theme, dark when unset or unrecognized.
    pub fn theme(&self) -> Result<Theme> {
        Ok(self
            .get(THEME_KEY)?
            .and_then(|v| v.parse().ok())
            .unwrap_or_default())
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        self.set(THEME_KEY, theme.as_str())
    }
}
