//! Drug catalog and medication log database operations.

use rusqlite::{params, OptionalExtension, Row};
use serde_json::Value;

use super::{Database, DbError, DbResult};
use crate::models::{fold_for_search, DrugCatalogItem, MedicationEntry};

const SELECT_MEDICATION_COLUMNS: &str =
    "SELECT entry_id, name, dose, time, active_ingredient, recorded_at FROM medication_entries";

impl Database {
    // =========================================================================
    // Drug Catalog
    // =========================================================================

    /// Replace the drug catalog with the records of a JSON array export.
    ///
    /// Returns the number of products stored; records without a product
    /// name are skipped.
    pub fn import_drug_catalog(&self, json: &str) -> DbResult<usize> {
        let records: Vec<Value> = match serde_json::from_str(json)? {
            Value::Array(records) => records,
            _ => return Err(DbError::Constraint("drug catalog must be a JSON array".into())),
        };

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM drug_catalog", [])?;

        let mut imported = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO drug_catalog (barcode, name, name_folded, active_ingredient, dose_amount)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for item in records.iter().filter_map(DrugCatalogItem::from_catalog_record) {
                stmt.execute(params![
                    item.barcode,
                    item.name,
                    fold_for_search(&item.name),
                    item.active_ingredient,
                    item.dose_amount,
                ])?;
                imported += 1;
            }
        }
        tx.commit()?;

        tracing::info!(imported, skipped = records.len() - imported, "Drug catalog imported");
        Ok(imported)
    }

    /// Case-insensitive substring search over product names, in catalog order.
    ///
    /// A blank query matches nothing.
    pub fn search_drug_catalog(&self, query: &str, limit: usize) -> DbResult<Vec<DrugCatalogItem>> {
        let folded = fold_for_search(query);
        if folded.is_empty() {
            return Ok(Vec::new());
        }
        let pattern = format!("%{}%", escape_like(&folded));

        let mut stmt = self.conn.prepare(
            r#"
            SELECT barcode, name, active_ingredient, dose_amount
            FROM drug_catalog
            WHERE name_folded LIKE ?1 ESCAPE '\'
            ORDER BY rowid
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![pattern, limit as i64], |row| {
            Ok(DrugCatalogItem {
                barcode: row.get(0)?,
                name: row.get(1)?,
                active_ingredient: row.get(2)?,
                dose_amount: row.get(3)?,
            })
        })?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    // =========================================================================
    // Medication Log
    // =========================================================================

    /// Insert a medication entry.
    pub fn insert_medication(&self, entry: &MedicationEntry) -> DbResult<()> {
        entry.validate().map_err(DbError::Constraint)?;

        self.conn.execute(
            r#"
            INSERT INTO medication_entries (
                entry_id, name, dose, time, active_ingredient, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                entry.entry_id,
                entry.name,
                entry.dose,
                entry.time,
                entry.active_ingredient,
                entry.recorded_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_medication(&self, entry_id: &str) -> DbResult<Option<MedicationEntry>> {
        Ok(self
            .conn
            .query_row(
                &format!("{} WHERE entry_id = ?", SELECT_MEDICATION_COLUMNS),
                [entry_id],
                medication_from_row,
            )
            .optional()?)
    }

    /// List medications in the order they were added.
    pub fn list_medications(&self) -> DbResult<Vec<MedicationEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} ORDER BY recorded_at ASC, rowid ASC",
            SELECT_MEDICATION_COLUMNS
        ))?;

        let rows = stmt.query_map([], medication_from_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Delete a medication. Returns false when nothing matched.
    pub fn delete_medication(&self, entry_id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM medication_entries WHERE entry_id = ?", [entry_id])?;
        Ok(rows_affected > 0)
    }
}

fn medication_from_row(row: &Row<'_>) -> rusqlite::Result<MedicationEntry> {
    Ok(MedicationEntry {
        entry_id: row.get(0)?,
        name: row.get(1)?,
        dose: row.get(2)?,
        time: row.get(3)?,
        active_ingredient: row.get(4)?,
        recorded_at: row.get(5)?,
    })
}

/// Escape LIKE wildcards so the query is matched literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
