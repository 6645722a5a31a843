//! Modèle de données: hiérarchie administrative, recensements, statistiques

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use rgph_io::normalize_header;

/// Niveau administratif d'une zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneLevel {
    Country,
    Region,
    Department,
    Commune,
}

impl ZoneLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ZoneLevel::Country => "country",
            ZoneLevel::Region => "region",
            ZoneLevel::Department => "department",
            ZoneLevel::Commune => "commune",
        }
    }

    /// Libellé français ("Région", "Département"...)
    pub fn label(self) -> &'static str {
        match self {
            ZoneLevel::Country => "Pays",
            ZoneLevel::Region => "Région",
            ZoneLevel::Department => "Département",
            ZoneLevel::Commune => "Commune",
        }
    }

    /// Valeur de la colonne `niveau_donnee`
    pub fn marker(self) -> &'static str {
        match self {
            ZoneLevel::Country => "pays",
            ZoneLevel::Region => "region",
            ZoneLevel::Department => "departement",
            ZoneLevel::Commune => "commune",
        }
    }

    /// Interprète la colonne `niveau_donnee` d'un fichier d'import.
    /// Seuls les niveaux région, département et commune sont importables.
    pub fn from_marker(raw: &str) -> Option<ZoneLevel> {
        match normalize_header(raw).as_str() {
            "region" => Some(ZoneLevel::Region),
            "departement" | "department" => Some(ZoneLevel::Department),
            "commune" => Some(ZoneLevel::Commune),
            _ => None,
        }
    }
}

impl fmt::Display for ZoneLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZoneLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_header(s).as_str() {
            "country" | "pays" => Ok(ZoneLevel::Country),
            "region" => Ok(ZoneLevel::Region),
            "department" | "departement" => Ok(ZoneLevel::Department),
            "commune" => Ok(ZoneLevel::Commune),
            _ => Err(format!(
                "Invalid zone type: {}. Use: region, department, commune",
                s
            )),
        }
    }
}

/// Identité d'une zone: chaîne des références (les niveaux absents sont `None`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ZoneKey {
    pub country: Option<i32>,
    pub region: Option<i32>,
    pub department: Option<i32>,
    pub commune: Option<i32>,
}

impl ZoneKey {
    /// Niveau de la zone: la référence la plus précise non nulle
    pub fn level(&self) -> Option<ZoneLevel> {
        if self.commune.is_some() {
            Some(ZoneLevel::Commune)
        } else if self.department.is_some() {
            Some(ZoneLevel::Department)
        } else if self.region.is_some() {
            Some(ZoneLevel::Region)
        } else if self.country.is_some() {
            Some(ZoneLevel::Country)
        } else {
            None
        }
    }

    /// Identifiant de la zone à son propre niveau
    pub fn zone_id(&self) -> Option<i32> {
        self.commune
            .or(self.department)
            .or(self.region)
            .or(self.country)
    }
}

impl fmt::Display for ZoneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.level(), self.zone_id()) {
            (Some(level), Some(id)) => write!(f, "{}#{}", level, id),
            _ => f.write_str("<no zone>"),
        }
    }
}

/// Pays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    #[serde(default)]
    pub id: i32,
    pub name: String,
    pub code: String,
    #[serde(default = "empty_object")]
    pub geo_json: Value,
}

/// Région (ADM1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    #[serde(default)]
    pub id: i32,
    pub country: i32,
    pub adm0_en: String,
    pub adm0_pcode: String,
    pub adm1_en: String,
    pub adm1_pcode: String,
    pub geo_json: Value,
    pub date: NaiveDate,
    pub valid_on: NaiveDate,
    #[serde(default)]
    pub valid_to: Option<NaiveDate>,
    pub area_sqkm: f64,
}

/// Département (ADM2)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    #[serde(default)]
    pub id: i32,
    pub region: i32,
    pub adm2_en: String,
    pub adm2_pcode: String,
    pub geo_json: Value,
    pub date: NaiveDate,
    pub valid_on: NaiveDate,
    #[serde(default)]
    pub valid_to: Option<NaiveDate>,
    pub area_sqkm: f64,
}

/// Commune (ADM3)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commune {
    #[serde(default)]
    pub id: i32,
    pub department: i32,
    pub adm3_en: String,
    pub adm3_pcode: String,
    #[serde(default)]
    pub adm3_ref: Option<String>,
    pub real_name: String,
    pub geo_json: Value,
    pub date: NaiveDate,
    pub valid_on: NaiveDate,
    #[serde(default)]
    pub valid_to: Option<NaiveDate>,
    pub area_sqkm: f64,
}

/// Recensement (ou projection)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Census {
    #[serde(default)]
    pub id: i32,
    pub year: i32,
    #[serde(default)]
    pub is_projection: bool,
}

/// Statistiques démographiques d'une zone.
///
/// Les taux sont des pourcentages (0-100, deux décimales).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemographicStats {
    pub total_population: i64,
    pub male_percentage: f64,
    pub female_percentage: f64,
    #[serde(default)]
    pub urban_percentage: f64,
    #[serde(default)]
    pub rural_percentage: f64,
    pub population_10_plus: i64,
    pub single_rate: f64,
    pub married_rate: f64,
    pub divorced_rate: f64,
    pub widowed_rate: f64,
    pub school_enrollment_rate: f64,
    pub illiteracy_rate_10_plus: f64,
    pub population_15_plus: i64,
    pub illiteracy_rate_15_plus: f64,
}

impl DemographicStats {
    /// Taux nommés, dans l'ordre des colonnes
    pub fn rates(&self) -> [(&'static str, f64); 11] {
        [
            ("male_percentage", self.male_percentage),
            ("female_percentage", self.female_percentage),
            ("urban_percentage", self.urban_percentage),
            ("rural_percentage", self.rural_percentage),
            ("single_rate", self.single_rate),
            ("married_rate", self.married_rate),
            ("divorced_rate", self.divorced_rate),
            ("widowed_rate", self.widowed_rate),
            ("school_enrollment_rate", self.school_enrollment_rate),
            ("illiteracy_rate_10_plus", self.illiteracy_rate_10_plus),
            ("illiteracy_rate_15_plus", self.illiteracy_rate_15_plus),
        ]
    }

    /// Vérifie les bornes (effectifs positifs, taux dans [0, 100])
    pub fn validate(&self) -> Result<(), String> {
        for (name, count) in [
            ("total_population", self.total_population),
            ("population_10_plus", self.population_10_plus),
            ("population_15_plus", self.population_15_plus),
        ] {
            if count < 0 {
                return Err(format!("{} must be >= 0 (got {})", name, count));
            }
        }
        for (name, rate) in self.rates() {
            check_rate(name, rate)?;
        }
        Ok(())
    }
}

/// Répartition par niveau d'instruction (pourcentages)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationShares {
    pub no_education: f64,
    pub preschool: f64,
    pub primary: f64,
    pub middle_school: f64,
    pub high_school: f64,
    pub university: f64,
}

impl EducationShares {
    pub fn values(&self) -> [f64; 6] {
        [
            self.no_education,
            self.preschool,
            self.primary,
            self.middle_school,
            self.high_school,
            self.university,
        ]
    }

    pub fn validate(&self) -> Result<(), String> {
        const NAMES: [&str; 6] = [
            "no_education",
            "preschool",
            "primary",
            "middle_school",
            "high_school",
            "university",
        ];
        for (name, value) in NAMES.iter().zip(self.values()) {
            check_rate(name, value)?;
        }
        Ok(())
    }
}

fn check_rate(name: &str, value: f64) -> Result<(), String> {
    if !(0.0..=100.0).contains(&value) {
        return Err(format!("{} must be within [0, 100] (got {})", name, value));
    }
    Ok(())
}

/// Ligne de données démographiques, telle qu'exposée par l'API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicData {
    #[serde(default)]
    pub id: i32,
    pub census: i32,
    #[serde(default)]
    pub country: Option<i32>,
    #[serde(default)]
    pub region: Option<i32>,
    #[serde(default)]
    pub department: Option<i32>,
    #[serde(default)]
    pub commune: Option<i32>,
    #[serde(flatten)]
    pub stats: DemographicStats,
    #[serde(default)]
    pub education: Option<EducationShares>,
}

impl DemographicData {
    pub fn zone(&self) -> ZoneKey {
        ZoneKey {
            country: self.country,
            region: self.region,
            department: self.department,
            commune: self.commune,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.zone().level().is_none() {
            return Err("at least one of country, region, department, commune is required".into());
        }
        self.stats.validate()?;
        if let Some(education) = &self.education {
            education.validate()?;
        }
        Ok(())
    }
}

/// Trace d'un import validé
#[derive(Debug, Clone, Serialize)]
pub struct ImportRun {
    pub id: i32,
    pub census: i32,
    pub source: String,
    pub checksum: String,
    pub rows_read: i32,
    pub rows_imported: i32,
    pub rows_skipped: i32,
    pub imported_at: DateTime<Utc>,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_level_markers() {
        assert_eq!(ZoneLevel::from_marker("Region"), Some(ZoneLevel::Region));
        assert_eq!(ZoneLevel::from_marker(" Département "), Some(ZoneLevel::Department));
        assert_eq!(ZoneLevel::from_marker("department"), Some(ZoneLevel::Department));
        assert_eq!(ZoneLevel::from_marker("commune"), Some(ZoneLevel::Commune));
        assert_eq!(ZoneLevel::from_marker("pays"), None);
        assert_eq!(ZoneLevel::from_marker(""), None);
        assert!("wilaya".parse::<ZoneLevel>().is_err());
        assert_eq!("Commune".parse::<ZoneLevel>(), Ok(ZoneLevel::Commune));
    }

    #[test]
    fn test_zone_key_level() {
        let key = ZoneKey {
            country: Some(1),
            region: Some(3),
            department: Some(12),
            commune: None,
        };
        assert_eq!(key.level(), Some(ZoneLevel::Department));
        assert_eq!(key.zone_id(), Some(12));
        assert_eq!(key.to_string(), "department#12");
        assert_eq!(ZoneKey::default().level(), None);
    }

    #[test]
    fn test_demographic_json_shape() {
        let json = serde_json::json!({
            "census": 2,
            "region": 5,
            "total_population": 430668,
            "male_percentage": 48.9,
            "female_percentage": 51.1,
            "population_10_plus": 300000,
            "single_rate": 39.4,
            "married_rate": 52.3,
            "divorced_rate": 3.1,
            "widowed_rate": 5.2,
            "school_enrollment_rate": 65.0,
            "illiteracy_rate_10_plus": 35.0,
            "population_15_plus": 280000,
            "illiteracy_rate_15_plus": 38.0
        });
        let data: DemographicData = serde_json::from_value(json).unwrap();
        assert_eq!(data.id, 0);
        assert_eq!(data.stats.urban_percentage, 0.0);
        assert_eq!(data.zone().level(), Some(ZoneLevel::Region));
        assert!(data.validate().is_ok());

        let out = serde_json::to_value(&data).unwrap();
        assert_eq!(out["total_population"], 430668);
        assert_eq!(out["region"], 5);
        assert!(out["education"].is_null());
    }

    #[test]
    fn test_validate_bounds() {
        let mut data = DemographicData {
            id: 0,
            census: 1,
            country: None,
            region: None,
            department: None,
            commune: None,
            stats: DemographicStats::default(),
            education: None,
        };
        assert!(data.validate().is_err());

        data.commune = Some(4);
        data.stats.single_rate = 100.5;
        assert!(data.validate().unwrap_err().contains("single_rate"));

        data.stats.single_rate = 40.0;
        data.education = Some(EducationShares {
            university: -1.0,
            ..Default::default()
        });
        assert!(data.validate().unwrap_err().contains("university"));
    }
}
