/// Key-value table
pub const CREATE_KV_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS kv_store (
        key   TEXT PRIMARY KEY,
        value JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

/// Read one key
pub const SELECT_VALUE: &str = "SELECT value FROM kv_store WHERE key = $1";

/// Insert or overwrite one key
pub const UPSERT_VALUE: &str = r#"
    INSERT INTO kv_store (key, value, updated_at)
    VALUES ($1, $2, now())
    ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
"#;

/// Delete one key
pub const DELETE_VALUE: &str = "DELETE FROM kv_store WHERE key = $1";
