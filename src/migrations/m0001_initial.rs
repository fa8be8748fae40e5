use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0001_initial_schema")
        // businesses - one row per fingerprint
        .operation(RunSql::portable().for_backend(
            "sqlite",
            r#"CREATE TABLE IF NOT EXISTS businesses (
    id TEXT PRIMARY KEY NOT NULL,
    fingerprint TEXT NOT NULL UNIQUE,
    normalized_name TEXT NOT NULL,
    original_name TEXT NOT NULL,
    street TEXT,
    city TEXT,
    postal_code TEXT,
    province TEXT,
    phone TEXT,
    website TEXT,
    latitude REAL,
    longitude REAL,
    distance_km REAL,
    place_types TEXT NOT NULL DEFAULT '[]',
    status TEXT NOT NULL DEFAULT 'discovered',
    manual_override INTEGER NOT NULL DEFAULT 0,
    override_reason TEXT,
    override_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#,
        ))
        // observations - append-only evidence ledger
        .operation(RunSql::portable().for_backend(
            "sqlite",
            r#"CREATE TABLE IF NOT EXISTS observations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    business_id TEXT NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
    source_url TEXT NOT NULL,
    field TEXT NOT NULL,
    value TEXT,
    confidence REAL NOT NULL CHECK (confidence >= 0.0 AND confidence <= 1.0),
    observed_at TEXT NOT NULL,
    http_status INTEGER,
    error TEXT
)"#,
        ))
        // validations - one row per gate per pipeline run
        .operation(RunSql::portable().for_backend(
            "sqlite",
            r#"CREATE TABLE IF NOT EXISTS validations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    business_id TEXT NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
    rule_id TEXT NOT NULL,
    passed INTEGER NOT NULL,
    action TEXT NOT NULL,
    reason TEXT NOT NULL,
    evidence_ids TEXT NOT NULL DEFAULT '[]',
    validation_version INTEGER NOT NULL,
    validated_at TEXT NOT NULL,
    UNIQUE (business_id, rule_id, validation_version)
)"#,
        ))
        // exclusions - audit trail for EXCLUDED businesses
        .operation(RunSql::portable().for_backend(
            "sqlite",
            r#"CREATE TABLE IF NOT EXISTS exclusions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    business_id TEXT NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
    rule_id TEXT NOT NULL,
    reason TEXT NOT NULL,
    evidence_ids TEXT NOT NULL DEFAULT '[]',
    validation_version INTEGER NOT NULL,
    excluded_at TEXT NOT NULL
)"#,
        ))
        // exports - business to export artifact links
        .operation(RunSql::portable().for_backend(
            "sqlite",
            r#"CREATE TABLE IF NOT EXISTS exports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    business_id TEXT NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
    export_file TEXT NOT NULL,
    exported_at TEXT NOT NULL
)"#,
        ))
        // storage_meta
        .operation(RunSql::portable().for_backend(
            "sqlite",
            r#"CREATE TABLE IF NOT EXISTS storage_meta (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
)"#,
        ))
        .operation(RunSql::portable().for_backend(
            "sqlite",
            "INSERT OR IGNORE INTO storage_meta (key, value) VALUES ('format_version', '1')",
        ))
}
