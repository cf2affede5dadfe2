use std::path::{Path, PathBuf};

use anyhow::Context;
use rusqlite::Connection;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db;
use crate::model::{UserData, UserProfile};

pub const SESSION_SETTING_KEY: &str = "session.user";

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub user: Option<UserProfile>,
    /// Roster and event log of `user`; empty when nobody is signed in.
    pub data: UserData,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        AppState {
            config,
            workspace: None,
            db: None,
            user: None,
            data: UserData::default(),
        }
    }

    /// Opens (or creates) the workspace database and restores the stored session.
    pub fn open_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        let conn = db::open_db(path)?;
        self.db = None;
        self.user = None;
        self.data = UserData::default();

        let stored = match db::settings_get_json(&conn, SESSION_SETTING_KEY) {
            Ok(v) => v,
            Err(e) => {
                warn!("ignoring stored session: {e:#}");
                None
            }
        };
        self.workspace = Some(path.to_path_buf());
        self.db = Some(conn);
        info!(workspace = %path.to_string_lossy(), "workspace opened");

        // The workspace is open from here on; a session that cannot be
        // restored leaves it signed out.
        if let Some(v) = stored {
            match serde_json::from_value::<UserProfile>(v) {
                Ok(profile) => {
                    if let Err(e) = self.activate(profile) {
                        warn!("stored session not restored: {e:#}");
                    }
                }
                Err(e) => warn!("ignoring stored session: {e}"),
            }
        }
        Ok(())
    }

    /// Makes `profile` the current identity and loads its data.
    pub fn activate(&mut self, profile: UserProfile) -> anyhow::Result<()> {
        let conn = self.db.as_ref().context("no workspace selected")?;
        let data = db::user_data_load(conn, &profile.storage_key())?.unwrap_or_default();
        db::settings_set_json(conn, SESSION_SETTING_KEY, &serde_json::to_value(&profile)?)?;
        info!(
            user = %profile.id,
            guest = profile.is_guest(),
            students = data.students.len(),
            records = data.records.len(),
            "session started"
        );
        self.user = Some(profile);
        self.data = data;
        Ok(())
    }

    /// Forgets the current identity. Its stored data is kept.
    pub fn sign_out(&mut self) -> anyhow::Result<()> {
        if let Some(conn) = self.db.as_ref() {
            db::settings_delete(conn, SESSION_SETTING_KEY)?;
        }
        if let Some(user) = self.user.take() {
            info!(user = %user.id, "session ended");
        }
        self.data = UserData::default();
        Ok(())
    }

    /// Writes the whole data blob for the current identity.
    ///
    /// Fire-and-forget: a failed write is logged, never reported to the caller.
    pub fn persist(&self) {
        let (Some(conn), Some(user)) = (self.db.as_ref(), self.user.as_ref()) else {
            return;
        };
        if let Err(e) = db::user_data_save(conn, &user.storage_key(), &self.data) {
            error!(user = %user.id, "failed to persist data: {e:#}");
        }
    }

    pub fn report_dir(&self) -> Option<PathBuf> {
        self.config
            .report_dir
            .clone()
            .or_else(|| self.workspace.clone())
    }
}
