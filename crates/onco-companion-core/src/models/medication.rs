//! Medication log and drug catalog models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A product in the bundled oncology drug catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrugCatalogItem {
    /// Barcode, when the source record has one
    pub barcode: Option<String>,
    /// Product name (e.g., "TAXOTERE 80 MG/4 ML")
    pub name: String,
    /// Active ingredient (e.g., "DOSETAKSEL")
    pub active_ingredient: Option<String>,
    /// Suggested dose amount
    pub dose_amount: Option<String>,
}

impl DrugCatalogItem {
    pub fn new(name: String) -> Self {
        Self {
            barcode: None,
            name,
            active_ingredient: None,
            dose_amount: None,
        }
    }

    /// Read one record of the catalog JSON export.
    ///
    /// Keys are the Turkish column headers of the export (`ÜRÜN ADI`,
    /// `ETKEN MADDE`, `DOZ MİKTARI`, `BARKOD`). Records without a product
    /// name are skipped.
    pub fn from_catalog_record(record: &Value) -> Option<Self> {
        let name = record_text(record, "ÜRÜN ADI")?;
        Some(Self {
            barcode: record_text(record, "BARKOD"),
            name,
            active_ingredient: record_text(record, "ETKEN MADDE"),
            dose_amount: record_text(record, "DOZ MİKTARI"),
        })
    }
}

/// Field as trimmed text; numbers are accepted (barcodes often are).
fn record_text(record: &Value, key: &str) -> Option<String> {
    let text = match record.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(text).filter(|t| !t.is_empty())
}

/// Lowercase form used for catalog search.
///
/// Dotted capital I lowercases to `i` plus a combining dot; the dot is
/// dropped so "İFOSFAMİD" and "ifosfamid" match.
pub fn fold_for_search(text: &str) -> String {
    text.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| *c != '\u{0307}')
        .collect()
}

/// A medication the patient takes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationEntry {
    /// Local UUID
    pub entry_id: String,
    pub name: String,
    /// Dose as entered (e.g., "500mg", "1 tablet")
    pub dose: String,
    /// Time of day as entered (e.g., "08:00")
    pub time: String,
    pub active_ingredient: Option<String>,
    pub recorded_at: String,
}

impl MedicationEntry {
    pub fn new(name: String, dose: String, time: String) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            name,
            dose,
            time,
            active_ingredient: None,
            recorded_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Entry for a catalog product; the catalog's active ingredient is carried over.
    pub fn from_catalog(item: &DrugCatalogItem, dose: String, time: String) -> Self {
        Self {
            active_ingredient: item.active_ingredient.clone(),
            ..Self::new(item.name.clone(), dose, time)
        }
    }

    /// Name, dose and time are all required.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [("name", &self.name), ("dose", &self.dose), ("time", &self.time)] {
            if value.trim().is_empty() {
                return Err(format!("medication {} cannot be empty", field));
            }
        }
        Ok(())
    }
}
