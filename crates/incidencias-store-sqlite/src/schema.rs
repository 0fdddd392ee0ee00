//! SQL schema for the Incidencias SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS users (
    user_id     TEXT PRIMARY KEY,
    username    TEXT NOT NULL UNIQUE,
    password    TEXT NOT NULL,          -- argon2/bcrypt string, or legacy plaintext
    name        TEXT NOT NULL,
    role        TEXT NOT NULL DEFAULT 'user',   -- 'admin' | 'user'
    created_at  TEXT NOT NULL
);

-- user_id is a weak reference: no foreign key, joined on read.
CREATE TABLE IF NOT EXISTS incidents (
    code             TEXT NOT NULL UNIQUE,
    name             TEXT NOT NULL,
    kind             TEXT NOT NULL,
    status           TEXT NOT NULL,
    location         TEXT NOT NULL DEFAULT '',
    description      TEXT,
    reported_by      TEXT NOT NULL DEFAULT '',
    lat              REAL,
    lng              REAL,
    image_url        TEXT,
    timestamp        TEXT NOT NULL,   -- ISO 8601 UTC
    occurrence_time  TEXT NOT NULL,   -- ISO 8601 UTC
    user_id          TEXT,
    created_at       TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

CREATE INDEX IF NOT EXISTS incidents_created_idx ON incidents(created_at);
CREATE INDEX IF NOT EXISTS incidents_user_idx    ON incidents(user_id);

PRAGMA user_version = 1;
";
