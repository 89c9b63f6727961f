use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "classassist.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Raw stored text for `key`. Callers decide how to treat unparsable values.
pub fn settings_get_raw(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let raw = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(raw)
}

pub fn settings_get_json(
    conn: &Connection,
    key: &str,
) -> anyhow::Result<Option<serde_json::Value>> {
    match settings_get_raw(conn, key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    let raw = serde_json::to_string(value)?;
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, raw),
    )?;
    Ok(())
}

pub fn settings_delete(conn: &Connection, key: &str) -> anyhow::Result<()> {
    conn.execute("DELETE FROM settings WHERE key = ?", [key])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().expect("open memory db");
        init_schema(&conn).expect("schema");
        conn
    }

    #[test]
    fn settings_roundtrip_and_overwrite() {
        let conn = memory_db();
        assert!(settings_get_json(&conn, "k").expect("get").is_none());

        settings_set_json(&conn, "k", &json!({ "a": 1 })).expect("set");
        settings_set_json(&conn, "k", &json!({ "a": 2 })).expect("overwrite");
        assert_eq!(
            settings_get_json(&conn, "k").expect("get"),
            Some(json!({ "a": 2 }))
        );

        settings_delete(&conn, "k").expect("delete");
        assert!(settings_get_raw(&conn, "k").expect("get").is_none());
    }

    #[test]
    fn open_db_creates_workspace_file() {
        let dir = std::env::temp_dir().join(format!("classassist-db-{}", uuid::Uuid::new_v4()));
        let conn = open_db(&dir).expect("open");
        drop(conn);
        assert!(dir.join(DB_FILE_NAME).is_file());
        let _ = std::fs::remove_dir_all(dir);
    }
}
