use crate::model::UserData;
use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "simas.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    // One blob per identity; always overwritten whole.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS user_data(
            user_key TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row("SELECT value_json FROM settings WHERE key = ?", [key], |r| {
            r.get(0)
        })
        .optional()?;
    match raw {
        Some(s) => Ok(Some(
            serde_json::from_str(&s).with_context(|| format!("setting {key} is invalid JSON"))?,
        )),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

pub fn settings_delete(conn: &Connection, key: &str) -> anyhow::Result<()> {
    conn.execute("DELETE FROM settings WHERE key = ?", [key])?;
    Ok(())
}

pub fn user_data_load(conn: &Connection, user_key: &str) -> anyhow::Result<Option<UserData>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT payload FROM user_data WHERE user_key = ?",
            [user_key],
            |r| r.get(0),
        )
        .optional()?;
    let Some(raw) = raw else {
        return Ok(None);
    };
    let data = serde_json::from_str(&raw)
        .with_context(|| format!("stored data for {user_key} is invalid JSON"))?;
    Ok(Some(data))
}

pub fn user_data_save(conn: &Connection, user_key: &str, data: &UserData) -> anyhow::Result<()> {
    let payload = serde_json::to_string(data).context("failed to serialize user data")?;
    conn.execute(
        "INSERT INTO user_data(user_key, payload, updated_at) VALUES(?, ?, ?)
         ON CONFLICT(user_key) DO UPDATE SET
           payload = excluded.payload,
           updated_at = excluded.updated_at",
        (user_key, &payload, chrono::Utc::now().to_rfc3339()),
    )?;
    Ok(())
}

pub fn user_data_delete(conn: &Connection, user_key: &str) -> anyhow::Result<()> {
    conn.execute("DELETE FROM user_data WHERE user_key = ?", [user_key])?;
    Ok(())
}
