//! Session store database schema.

/// SQL to create the session-state tables.
pub const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    id           TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    start_prompt TEXT NOT NULL,
    summary      TEXT,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES sessions (id),
    role       TEXT NOT NULL,
    content    TEXT NOT NULL,
    timestamp  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_session_time
    ON messages (session_id, timestamp, id);

CREATE TABLE IF NOT EXISTS entries (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES sessions (id),
    kind       TEXT NOT NULL,
    title      TEXT NOT NULL,
    content    TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (session_id, kind, title)
);

CREATE TABLE IF NOT EXISTS change_log (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id     TEXT NOT NULL REFERENCES sessions (id),
    message_id     INTEGER NOT NULL REFERENCES messages (id),
    entry_id       INTEGER NOT NULL,
    op             TEXT NOT NULL,
    previous_state TEXT,
    created_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_change_log_session_message
    ON change_log (session_id, message_id);
";
