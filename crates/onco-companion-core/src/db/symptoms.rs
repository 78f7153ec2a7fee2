//! Symptom journal database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{SymptomEntry, SymptomSource};
use onco_companion_llm::TriageResponse;

const SELECT_COLUMNS: &str =
    "SELECT entry_id, name, severity, note, source, is_urgent, recorded_at FROM symptom_entries";

impl Database {
    /// Insert a new symptom entry.
    pub fn insert_symptom(&self, entry: &SymptomEntry) -> DbResult<()> {
        entry.validate().map_err(DbError::Constraint)?;

        self.conn.execute(
            r#"
            INSERT INTO symptom_entries (
                entry_id, name, severity, note, source, is_urgent, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                entry.entry_id,
                entry.name,
                entry.severity,
                entry.note,
                entry.source.as_str(),
                entry.is_urgent,
                entry.recorded_at,
            ],
        )?;
        Ok(())
    }

    /// Journal the symptom a triage reply identified, if any.
    pub fn record_from_triage(
        &self,
        response: &TriageResponse,
        patient_text: &str,
    ) -> DbResult<Option<SymptomEntry>> {
        let Some(name) = &response.identified_symptom else {
            return Ok(None);
        };
        let entry = SymptomEntry::from_triage(name.clone(), response.is_urgent, patient_text);
        self.insert_symptom(&entry)?;
        Ok(Some(entry))
    }

    /// Get a symptom entry by ID.
    pub fn get_symptom(&self, entry_id: &str) -> DbResult<Option<SymptomEntry>> {
        self.conn
            .query_row(
                &format!("{} WHERE entry_id = ?", SELECT_COLUMNS),
                [entry_id],
                |row| SymptomRow::from_row(row),
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List entries, newest first.
    pub fn list_symptoms(&self, limit: usize) -> DbResult<Vec<SymptomEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} ORDER BY recorded_at DESC, rowid DESC LIMIT ?",
            SELECT_COLUMNS
        ))?;

        let rows = stmt.query_map([limit as i64], |row| SymptomRow::from_row(row))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.try_into()?);
        }
        Ok(entries)
    }

    /// List only entries triage flagged as urgent, newest first.
    pub fn list_urgent_symptoms(&self) -> DbResult<Vec<SymptomEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE is_urgent = 1 ORDER BY recorded_at DESC, rowid DESC",
            SELECT_COLUMNS
        ))?;

        let rows = stmt.query_map([], |row| SymptomRow::from_row(row))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.try_into()?);
        }
        Ok(entries)
    }

    /// Delete an entry. Returns false when nothing matched.
    pub fn delete_symptom(&self, entry_id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM symptom_entries WHERE entry_id = ?", [entry_id])?;
        Ok(rows_affected > 0)
    }
}

/// Internal row representation.
struct SymptomRow {
    entry_id: String,
    name: String,
    severity: Option<u8>,
    note: Option<String>,
    source: String,
    is_urgent: bool,
    recorded_at: String,
}

impl SymptomRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            entry_id: row.get(0)?,
            name: row.get(1)?,
            severity: row.get(2)?,
            note: row.get(3)?,
            source: row.get(4)?,
            is_urgent: row.get(5)?,
            recorded_at: row.get(6)?,
        })
    }
}

impl TryFrom<SymptomRow> for SymptomEntry {
    type Error = DbError;

    fn try_from(row: SymptomRow) -> Result<Self, Self::Error> {
        Ok(SymptomEntry {
            entry_id: row.entry_id,
            name: row.name,
            severity: row.severity,
            note: row.note,
            source: string_to_source(&row.source)?,
            is_urgent: row.is_urgent,
            recorded_at: row.recorded_at,
        })
    }
}

fn string_to_source(s: &str) -> DbResult<SymptomSource> {
    SymptomSource::parse(s).ok_or_else(|| DbError::Constraint(format!("Unknown symptom source: {}", s)))
}
