//! SQLite schema definition.

/// Complete database schema for onco-companion.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Symptom Journal
-- ============================================================================

CREATE TABLE IF NOT EXISTS symptom_entries (
    entry_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    severity INTEGER CHECK (severity IS NULL OR severity BETWEEN 1 AND 5),
    note TEXT,
    source TEXT NOT NULL DEFAULT 'manual',       -- 'manual' | 'triage'
    is_urgent INTEGER NOT NULL DEFAULT 0,
    recorded_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_symptom_entries_recorded_at ON symptom_entries(recorded_at);

-- ============================================================================
-- Drug Catalog (bundled oncology product list)
-- ============================================================================

CREATE TABLE IF NOT EXISTS drug_catalog (
    barcode TEXT,
    name TEXT NOT NULL,
    name_folded TEXT NOT NULL,                  -- lowercase form for substring search
    active_ingredient TEXT,
    dose_amount TEXT
);

-- ============================================================================
-- Medication Log
-- ============================================================================

CREATE TABLE IF NOT EXISTS medication_entries (
    entry_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    dose TEXT NOT NULL,
    time TEXT NOT NULL,
    active_ingredient TEXT,
    recorded_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
