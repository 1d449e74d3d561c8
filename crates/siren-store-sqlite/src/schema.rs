//! SQL schema for the Siren SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS riders (
    rider_id    TEXT PRIMARY KEY,
    first_name  TEXT NOT NULL,
    last_name   TEXT NOT NULL,
    mobile      TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS drivers (
    driver_id       TEXT PRIMARY KEY,
    first_name      TEXT NOT NULL,
    last_name       TEXT NOT NULL,
    mobile          TEXT NOT NULL UNIQUE,
    vehicle_number  TEXT NOT NULL UNIQUE,
    available       INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL
);

-- One row per (owner_kind, owner_id); reports overwrite in place.
CREATE TABLE IF NOT EXISTS locations (
    owner_kind  TEXT NOT NULL CHECK (owner_kind IN ('rider', 'driver')),
    owner_id    TEXT NOT NULL,
    latitude    REAL NOT NULL,
    longitude   REAL NOT NULL,
    landmark    TEXT,
    updated_at  TEXT NOT NULL,
    PRIMARY KEY (owner_kind, owner_id)
);

-- At most one assignment per rider. Rows are overwritten on re-dispatch,
-- never deleted.
CREATE TABLE IF NOT EXISTS assignments (
    assignment_id  TEXT PRIMARY KEY,
    rider_id       TEXT NOT NULL UNIQUE REFERENCES riders(rider_id),
    driver_id      TEXT NOT NULL REFERENCES drivers(driver_id),
    status         TEXT NOT NULL CHECK (status IN ('pending', 'accepted', 'denied')),
    assigned_at    TEXT NOT NULL,
    responded_at   TEXT
);

CREATE TABLE IF NOT EXISTS media_sessions (
    media_session_id  TEXT PRIMARY KEY,
    rider_id          TEXT NOT NULL UNIQUE REFERENCES riders(rider_id),
    contact_mobile    TEXT,
    created_at        TEXT NOT NULL
);

-- Bytes live in the media vault; rows only carry the content hash.
CREATE TABLE IF NOT EXISTS media_artifacts (
    artifact_id       TEXT PRIMARY KEY,
    media_session_id  TEXT NOT NULL REFERENCES media_sessions(media_session_id),
    kind              TEXT NOT NULL CHECK (kind IN ('image', 'audio')),
    file_name         TEXT NOT NULL,
    media_type        TEXT NOT NULL,
    content_hash      TEXT NOT NULL,
    byte_len          INTEGER NOT NULL,
    recorded_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS drivers_available_idx ON drivers(available);
CREATE INDEX IF NOT EXISTS assignments_driver_idx ON assignments(driver_id);
CREATE INDEX IF NOT EXISTS media_artifacts_session_idx ON media_artifacts(media_session_id);

PRAGMA user_version = 1;
";
