//! Configuration du système
//!
//! - valeurs par défaut appliquées à l'import (presets `strict`, `standard`,
//!   `estimates` ou fichier JSON)
//! - table de correction des noms administratifs
//! - configuration du serveur HTTP (variables d'environnement)

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::import::columns::DemographicField;

/// Nom du preset de valeurs par défaut utilisé sans option explicite
pub const DEFAULT_PRESET: &str = "standard";

/// Schéma PostgreSQL par défaut
pub const DEFAULT_SCHEMA: &str = "rgph";

/// Valeur de repli d'un champ absent ou vide
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldDefault {
    /// Valeur fixe
    Value(f64),
    /// Fraction de la population totale de la ligne (effectifs)
    ShareOfPopulation(f64),
}

impl FieldDefault {
    /// Valeur effective pour une ligne
    pub fn resolve(self, total_population: Option<i64>) -> Option<f64> {
        match self {
            FieldDefault::Value(v) => Some(v),
            FieldDefault::ShareOfPopulation(share) => {
                total_population.map(|pop| (pop as f64 * share).floor())
            }
        }
    }
}

/// Valeurs par défaut de l'import
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<DemographicField, FieldDefault>,
}

impl DefaultsConfig {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read defaults file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse defaults JSON")
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "strict" => Self::load_embedded(include_str!("presets/defaults_strict.json")),
            "standard" => Self::load_embedded(include_str!("presets/defaults_standard.json")),
            "estimates" => Self::load_embedded(include_str!("presets/defaults_estimates.json")),
            _ => anyhow::bail!(
                "Unknown defaults preset: {}. Use: strict, standard, estimates",
                preset
            ),
        }
    }

    /// Preset nommé ou chemin vers un fichier JSON
    pub fn from_arg(arg: &str) -> Result<Self> {
        let path = Path::new(arg);
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::load(path)
        } else {
            Self::from_preset(arg)
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse embedded defaults")
    }

    /// Valeur de repli d'un champ pour une ligne
    pub fn default_for(&self, field: DemographicField, total_population: Option<i64>) -> Option<f64> {
        self.fields
            .get(&field)
            .and_then(|d| d.resolve(total_population))
    }
}

/// Table de correction des noms (code → nom canonique)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NameCorrections {
    #[serde(default)]
    pub regions: BTreeMap<String, String>,
    #[serde(default)]
    pub departments: BTreeMap<String, String>,
    #[serde(default)]
    pub communes: BTreeMap<String, String>,
}

impl NameCorrections {
    /// Table embarquée
    pub fn embedded() -> Result<Self> {
        serde_json::from_str(include_str!("presets/names.json"))
            .context("Failed to parse embedded name corrections")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read corrections file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse corrections JSON")
    }

    pub fn len(&self) -> usize {
        self.regions.len() + self.departments.len() + self.communes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Configuration du serveur HTTP
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Jeton exigé sur les routes d'administration (si défini)
    pub admin_token: Option<String>,
    pub schema: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8000,
            admin_token: None,
            schema: DEFAULT_SCHEMA.into(),
        }
    }
}

impl ServerConfig {
    /// Charge la configuration depuis les variables d'environnement
    pub fn from_env() -> Self {
        Self {
            bind: std::env::var("RGPH_BIND").unwrap_or_else(|_| "127.0.0.1".into()),
            port: std::env::var("RGPH_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            admin_token: std::env::var("RGPH_ADMIN_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            schema: std::env::var("RGPH_SCHEMA").unwrap_or_else(|_| DEFAULT_SCHEMA.into()),
        }
    }
}

/// Valide un nom de schéma (interpolé dans le SQL)
pub fn validate_schema_name(schema: &str) -> Result<()> {
    let valid = !schema.is_empty()
        && schema.len() <= 63
        && schema
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && schema
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid {
        anyhow::bail!(
            "Invalid schema name: {}. Use lowercase letters, digits and underscores",
            schema
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_parse() {
        let strict = DefaultsConfig::from_preset("strict").unwrap();
        assert!(strict.fields.is_empty());

        let standard = DefaultsConfig::from_preset("standard").unwrap();
        assert_eq!(
            standard.default_for(DemographicField::UrbanPercentage, None),
            Some(0.0)
        );
        assert_eq!(standard.default_for(DemographicField::SingleRate, None), None);

        let estimates = DefaultsConfig::from_preset("estimates").unwrap();
        assert_eq!(
            estimates.default_for(DemographicField::Population10Plus, Some(1000)),
            Some(750.0)
        );
        assert_eq!(
            estimates.default_for(DemographicField::Population15Plus, None),
            None
        );
        assert_eq!(
            estimates.default_for(DemographicField::WidowedRate, Some(10)),
            Some(5.2)
        );

        assert!(DefaultsConfig::from_preset("lenient").is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let json = r#"{"fields": {"population_20_plus": {"value": 1}}}"#;
        assert!(serde_json::from_str::<DefaultsConfig>(json).is_err());
    }

    #[test]
    fn test_embedded_corrections() {
        let names = NameCorrections::embedded().unwrap();
        assert_eq!(names.regions.len(), 15);
        assert_eq!(names.regions["MR08"], "Dakhlet Nouadhibou");
        assert_eq!(names.departments["MR017"], "N'Beiket Lehwach");
        assert_eq!(names.departments["MR153"], "Riyad");
        assert_eq!(names.communes["MR06203"], "M'Balal");
    }

    #[test]
    fn test_schema_name_validation() {
        assert!(validate_schema_name("rgph").is_ok());
        assert!(validate_schema_name("rgph_2023").is_ok());
        assert!(validate_schema_name("").is_err());
        assert!(validate_schema_name("1rgph").is_err());
        assert!(validate_schema_name("rgph; DROP TABLE x").is_err());
    }
}
