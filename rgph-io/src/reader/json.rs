//! Lecture JSON
//!
//! Deux formes sont acceptées:
//! - un tableau d'objets (export tabulaire: une clé par colonne)
//! - l'objet structuré indexé par code de zone
//!   (`{"01": {"name": "...", "population": "430668", ...}, ...}`)

use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value};

use crate::{Cell, Dataset, TabularError};

/// Lit un tableau d'objets; les en-têtes sont l'union des clés,
/// dans l'ordre de première apparition.
pub fn read_json_records(bytes: &[u8]) -> Result<Dataset, TabularError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let records = match value {
        Value::Array(items) => items,
        Value::Object(_) => {
            return Err(TabularError::JsonLayout(
                "expected an array of records, found an object".into(),
            ))
        }
        _ => return Err(TabularError::JsonLayout("expected an array of records".into())),
    };

    let mut headers: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut objects: Vec<Map<String, Value>> = Vec::with_capacity(records.len());

    for (idx, item) in records.into_iter().enumerate() {
        let Value::Object(obj) = item else {
            return Err(TabularError::JsonLayout(format!("record {} is not an object", idx)));
        };
        for key in obj.keys() {
            if seen.insert(key.clone()) {
                headers.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let mut dataset = Dataset::new(headers);
    for obj in objects {
        let row = dataset
            .headers
            .iter()
            .map(|h| obj.get(h).map(json_to_cell).unwrap_or(Cell::Empty))
            .collect();
        dataset.push_row(row);
    }

    Ok(dataset)
}

/// Entrée du format structuré: code de zone et valeurs brutes
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredEntry {
    pub code: String,
    pub values: BTreeMap<String, Cell>,
}

impl StructuredEntry {
    pub fn get(&self, key: &str) -> &Cell {
        self.values.get(key).unwrap_or(&Cell::Empty)
    }
}

/// Lit l'objet structuré indexé par code. La clé `Code` (reliquat de la
/// ligne d'en-tête du classeur source) est ignorée.
pub fn read_structured(bytes: &[u8]) -> Result<Vec<StructuredEntry>, TabularError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let Value::Object(root) = value else {
        return Err(TabularError::JsonLayout(
            "expected an object keyed by zone code".into(),
        ));
    };

    let mut entries = Vec::with_capacity(root.len());
    for (code, item) in root {
        if code.eq_ignore_ascii_case("code") {
            continue;
        }
        let Value::Object(obj) = item else {
            return Err(TabularError::JsonLayout(format!("entry {} is not an object", code)));
        };
        entries.push(StructuredEntry {
            code: code.trim().to_string(),
            values: obj
                .iter()
                .map(|(k, v)| (k.clone(), json_to_cell(v)))
                .collect(),
        });
    }

    Ok(entries)
}

fn json_to_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::Bool(b) => Cell::Bool(*b),
        Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "" | "nan" | "null" | "none" => Cell::Empty,
            _ => Cell::Text(s.clone()),
        },
        other => Cell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_union_of_keys() {
        let data = br#"[
            {"Region Code": "MR01", "Total Population": 430668},
            {"Region Code": "MR02", "Single Rate": "39.4", "Total Population": null}
        ]"#;
        let ds = read_json_records(data).unwrap();
        assert_eq!(ds.headers, vec!["Region Code", "Total Population", "Single Rate"]);
        assert_eq!(ds.cell(0, 1), &Cell::Number(430668.0));
        assert_eq!(ds.cell(0, 2), &Cell::Empty);
        assert_eq!(ds.cell(1, 1), &Cell::Empty);
        assert_eq!(ds.cell(1, 2).as_number(), Some(39.4));
    }

    #[test]
    fn test_records_keep_source_column_order() {
        let data = br#"[{"niveau_donnee": "region", "Total Population": 1, "Country Code": "MR"}]"#;
        let ds = read_json_records(data).unwrap();
        assert_eq!(ds.headers, vec!["niveau_donnee", "Total Population", "Country Code"]);
    }

    #[test]
    fn test_records_layout_errors() {
        assert!(matches!(
            read_json_records(br#"{"a": 1}"#),
            Err(TabularError::JsonLayout(_))
        ));
        assert!(matches!(
            read_json_records(br#"[1, 2]"#),
            Err(TabularError::JsonLayout(_))
        ));
        assert!(matches!(read_json_records(b"[{"), Err(TabularError::Json(_))));
    }

    #[test]
    fn test_structured() {
        let data = br#"{
            "Code": {"name": "Nom"},
            "01": {"name": "Hodh Chargui", "population": "430668", "male": 0.49},
            "011": {"name": "Amourj", "population": 70000, "male": "nan"}
        }"#;
        let entries = read_structured(data).unwrap();
        assert_eq!(entries.len(), 2);
        let region = entries.iter().find(|e| e.code == "01").unwrap();
        assert_eq!(region.get("population").as_number(), Some(430668.0));
        assert_eq!(region.get("male").as_number(), Some(0.49));
        let dept = entries.iter().find(|e| e.code == "011").unwrap();
        assert_eq!(dept.get("male"), &Cell::Empty);
        assert_eq!(dept.get("missing"), &Cell::Empty);
    }
}
