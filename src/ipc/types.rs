use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::db;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// The sidecar holds at most one open workspace at a time.
#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
}

impl AppState {
    pub fn open_workspace(&mut self, path: PathBuf) -> anyhow::Result<()> {
        let conn = db::open_db(&path)?;
        self.db = Some(conn);
        self.workspace = Some(path);
        Ok(())
    }

    /// Closes the connection but remembers the path so it can be reopened.
    pub fn release_db(&mut self) -> Option<PathBuf> {
        self.db = None;
        self.workspace.clone()
    }
}
