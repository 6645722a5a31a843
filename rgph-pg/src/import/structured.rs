//! Import du JSON structuré de l'office statistique
//!
//! Objet indexé par code de zone sans préfixe pays: 2 chiffres pour une
//! région, 3 pour un département, 5 pour une commune. Les taux sont des
//! fractions (0-1).

use std::sync::OnceLock;

use regex::Regex;

use rgph_io::boundaries::DEFAULT_COUNTRY_CODE;
use rgph_io::{Cell, StructuredEntry};

use crate::config::DefaultsConfig;
use crate::import::batch::ImportBatch;
use crate::import::columns::ValueKind;
use crate::import::directory::ZoneDirectory;
use crate::import::row::{build_education, build_stats, cast_count, ImportRecord, RowError};
use crate::models::ZoneLevel;

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(?:MR)?(\d{2}|\d{3}|\d{5})$").expect("Valid regex"))
}

/// Niveau et code complet (`MR` + chiffres) d'une clé
pub fn parse_code(raw: &str) -> Result<(ZoneLevel, String), RowError> {
    let raw = raw.trim();
    let digits = code_pattern()
        .captures(raw)
        .and_then(|c| c.get(1))
        .ok_or_else(|| RowError::InvalidCode(raw.to_string()))?
        .as_str();

    let level = match digits.len() {
        2 => ZoneLevel::Region,
        3 => ZoneLevel::Department,
        _ => ZoneLevel::Commune,
    };
    Ok((level, format!("{}{}", DEFAULT_COUNTRY_CODE, digits)))
}

/// Fraction (0-1) convertie en pourcentage
fn fraction(cell: &Cell, field: &'static str) -> Result<Option<f64>, RowError> {
    if cell.is_blank() {
        return Ok(None);
    }
    cell.as_number()
        .map(|n| Some(n * 100.0))
        .ok_or_else(|| RowError::InvalidValue {
            field,
            value: cell.to_string(),
        })
}

pub fn build_entry(
    entry: &StructuredEntry,
    directory: &ZoneDirectory,
    defaults: &DefaultsConfig,
) -> Result<ImportRecord, RowError> {
    let (level, code) = parse_code(&entry.code)?;
    let zone = directory.chain(level, &code)?;

    let stats = build_stats(defaults, |field| {
        let cell = entry.get(field.structured_key());
        match field.kind() {
            ValueKind::Count => Ok(cast_count(cell, field.structured_key())?.map(|v| v as f64)),
            ValueKind::Rate => fraction(cell, field.structured_key()),
        }
    })?;
    let education = build_education(|field| {
        fraction(entry.get(field.structured_key()), field.structured_key())
    })?;

    Ok(ImportRecord {
        zone,
        level,
        code,
        stats,
        education,
    })
}

/// Convertit les entrées structurées en lot
pub fn build_structured_batch(
    entries: &[StructuredEntry],
    directory: &ZoneDirectory,
    defaults: &DefaultsConfig,
) -> ImportBatch {
    let mut batch = ImportBatch::new(entries.len());

    for (i, entry) in entries.iter().enumerate() {
        match build_entry(entry, directory, defaults) {
            Ok(record) => batch.push(i + 1, record),
            Err(error) => batch.fail(i + 1, Some(entry.code.clone()), error),
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::directory::ZoneEntry;
    use rgph_io::read_structured;

    fn directory() -> ZoneDirectory {
        let mut dir = ZoneDirectory::default();
        dir.insert(ZoneLevel::Country, ZoneEntry::new(1, None, "MR", "Mauritania"));
        dir.insert(ZoneLevel::Region, ZoneEntry::new(10, Some(1), "MR01", "Hodh Chargui"));
        dir.insert(ZoneLevel::Department, ZoneEntry::new(100, Some(10), "MR011", "Amourj"));
        dir.insert(ZoneLevel::Commune, ZoneEntry::new(1000, Some(100), "MR01101", "Adel Bagrou"));
        dir
    }

    #[test]
    fn test_parse_code() {
        assert_eq!(parse_code("01").unwrap(), (ZoneLevel::Region, "MR01".into()));
        assert_eq!(parse_code("011").unwrap(), (ZoneLevel::Department, "MR011".into()));
        assert_eq!(parse_code("MR01101").unwrap(), (ZoneLevel::Commune, "MR01101".into()));
        assert!(parse_code("0110").is_err());
        assert!(parse_code("1a").is_err());
    }

    #[test]
    fn test_structured_batch() {
        let json = br#"{
            "Code": {"population": "Population"},
            "011": {
                "population": "25 000", "male": 0.49, "female": 0.51,
                "population_10_plus": 18000, "single_rate": 0.394, "married_rate": 0.523,
                "divorced_rate": 0.031, "widowed_rate": 0.052, "school_enrollment_rate": 0.65,
                "illiteracy_rate_10_plus": 0.35, "population_15_plus": 15000,
                "illiteracy_rate_15_plus": 0.38, "primary": 0.4
            },
            "099": {"population": 10}
        }"#;
        let entries = read_structured(json).unwrap();
        let defaults = DefaultsConfig::from_preset("standard").unwrap();
        let batch = build_structured_batch(&entries, &directory(), &defaults);

        assert_eq!(batch.rows_read, 2);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.failures.len(), 1);

        let record = batch.records().next().unwrap();
        assert_eq!(record.level, ZoneLevel::Department);
        assert_eq!(record.zone.country, Some(1));
        assert_eq!(record.zone.region, Some(10));
        assert_eq!(record.zone.department, Some(100));
        assert_eq!(record.stats.total_population, 25000);
        assert_eq!(record.stats.male_percentage, 49.0);
        assert_eq!(record.stats.single_rate, 39.4);
        assert_eq!(record.education.as_ref().unwrap().primary, 40.0);
    }

    #[test]
    fn test_structured_batch_region_and_commune() {
        let json = br#"{
            "01": {
                "population": 430668, "male": 0.491, "female": 0.509,
                "population_10_plus": 300000, "single_rate": 0.39, "married_rate": 0.52,
                "divorced_rate": 0.03, "widowed_rate": 0.06, "school_enrollment_rate": 0.61,
                "illiteracy_rate_10_plus": 0.35, "population_15_plus": 280000,
                "illiteracy_rate_15_plus": 0.38
            },
            "01101": {
                "population": "48 000", "male": "0.49", "female": "0.51",
                "population_10_plus": 33000, "single_rate": 0.41, "married_rate": 0.5,
                "divorced_rate": 0.04, "widowed_rate": 0.05, "school_enrollment_rate": 0.55,
                "illiteracy_rate_10_plus": 0.4, "population_15_plus": 30000,
                "illiteracy_rate_15_plus": 0.43
            }
        }"#;
        let entries = read_structured(json).unwrap();
        let defaults = DefaultsConfig::from_preset("standard").unwrap();
        let batch = build_structured_batch(&entries, &directory(), &defaults);

        assert_eq!(batch.rows_read, 2);
        assert!(batch.failures.is_empty());
        assert_eq!(batch.len(), 2);

        let levels: Vec<ZoneLevel> = batch.records().map(|r| r.level).collect();
        assert!(levels.contains(&ZoneLevel::Region));
        assert!(levels.contains(&ZoneLevel::Commune));

        let commune = batch
            .records()
            .find(|r| r.level == ZoneLevel::Commune)
            .unwrap();
        assert_eq!(commune.zone.department, Some(100));
        assert_eq!(commune.zone.commune, Some(1000));
        assert_eq!(commune.stats.total_population, 48000);
        assert!(commune.education.is_none());
    }
}
