//! Catalogue des colonnes d'import
//!
//! Chaque champ connaît son en-tête de modèle ("Total Population"), sa
//! description, et les alias acceptés (en-têtes français des exports).
//! La correspondance avec un fichier est résolue une seule fois
//! ([`ColumnMap::resolve`]).

use serde::{Deserialize, Serialize};

use rgph_io::{Cell, Dataset, HeaderIndex};

/// Colonnes d'identification de la zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneColumn {
    CountryCode,
    CountryName,
    RegionCode,
    RegionName,
    DepartmentCode,
    DepartmentName,
    CommuneCode,
    CommuneName,
    Level,
}

impl ZoneColumn {
    pub const ALL: [ZoneColumn; 9] = [
        ZoneColumn::CountryCode,
        ZoneColumn::CountryName,
        ZoneColumn::RegionCode,
        ZoneColumn::RegionName,
        ZoneColumn::DepartmentCode,
        ZoneColumn::DepartmentName,
        ZoneColumn::CommuneCode,
        ZoneColumn::CommuneName,
        ZoneColumn::Level,
    ];

    pub fn header(self) -> &'static str {
        match self {
            ZoneColumn::CountryCode => "Country Code",
            ZoneColumn::CountryName => "Country Name",
            ZoneColumn::RegionCode => "Region Code",
            ZoneColumn::RegionName => "Region Name",
            ZoneColumn::DepartmentCode => "Department Code",
            ZoneColumn::DepartmentName => "Department Name",
            ZoneColumn::CommuneCode => "Commune Code",
            ZoneColumn::CommuneName => "Commune Name",
            ZoneColumn::Level => "niveau_donnee",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ZoneColumn::CountryCode => "Code du pays (obligatoire)",
            ZoneColumn::CountryName => "Nom du pays (obligatoire)",
            ZoneColumn::RegionCode => "Code de la région (obligatoire)",
            ZoneColumn::RegionName => "Nom de la région (obligatoire)",
            ZoneColumn::DepartmentCode => "Code du département (optionnel)",
            ZoneColumn::DepartmentName => "Nom du département (optionnel)",
            ZoneColumn::CommuneCode => "Code de la commune (optionnel)",
            ZoneColumn::CommuneName => "Nom de la commune (optionnel)",
            ZoneColumn::Level => {
                "Niveau de la donnée (region/departement/commune) - obligatoire"
            }
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            ZoneColumn::CountryCode => &["Code Pays"],
            ZoneColumn::CountryName => &["Nom Pays"],
            ZoneColumn::RegionCode => &["Code Région"],
            ZoneColumn::RegionName => &["Nom Région"],
            ZoneColumn::DepartmentCode => &["Code Département"],
            ZoneColumn::DepartmentName => &["Nom Département"],
            ZoneColumn::CommuneCode => &["Code Commune"],
            ZoneColumn::CommuneName => &["Nom Commune"],
            ZoneColumn::Level => &["Niveau", "Niveau Donnée"],
        }
    }
}

/// Nature d'une valeur numérique
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Effectif entier positif
    Count,
    /// Pourcentage dans [0, 100]
    Rate,
}

/// Champs statistiques de `demographic_data`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemographicField {
    TotalPopulation,
    MalePercentage,
    FemalePercentage,
    UrbanPercentage,
    RuralPercentage,
    #[serde(rename = "population_10_plus")]
    Population10Plus,
    SingleRate,
    MarriedRate,
    DivorcedRate,
    WidowedRate,
    SchoolEnrollmentRate,
    #[serde(rename = "illiteracy_rate_10_plus")]
    IlliteracyRate10Plus,
    #[serde(rename = "population_15_plus")]
    Population15Plus,
    #[serde(rename = "illiteracy_rate_15_plus")]
    IlliteracyRate15Plus,
}

impl DemographicField {
    pub const ALL: [DemographicField; 14] = [
        DemographicField::TotalPopulation,
        DemographicField::MalePercentage,
        DemographicField::FemalePercentage,
        DemographicField::UrbanPercentage,
        DemographicField::RuralPercentage,
        DemographicField::Population10Plus,
        DemographicField::SingleRate,
        DemographicField::MarriedRate,
        DemographicField::DivorcedRate,
        DemographicField::WidowedRate,
        DemographicField::SchoolEnrollmentRate,
        DemographicField::IlliteracyRate10Plus,
        DemographicField::Population15Plus,
        DemographicField::IlliteracyRate15Plus,
    ];

    /// Nom de la colonne en base
    pub fn column(self) -> &'static str {
        match self {
            DemographicField::TotalPopulation => "total_population",
            DemographicField::MalePercentage => "male_percentage",
            DemographicField::FemalePercentage => "female_percentage",
            DemographicField::UrbanPercentage => "urban_percentage",
            DemographicField::RuralPercentage => "rural_percentage",
            DemographicField::Population10Plus => "population_10_plus",
            DemographicField::SingleRate => "single_rate",
            DemographicField::MarriedRate => "married_rate",
            DemographicField::DivorcedRate => "divorced_rate",
            DemographicField::WidowedRate => "widowed_rate",
            DemographicField::SchoolEnrollmentRate => "school_enrollment_rate",
            DemographicField::IlliteracyRate10Plus => "illiteracy_rate_10_plus",
            DemographicField::Population15Plus => "population_15_plus",
            DemographicField::IlliteracyRate15Plus => "illiteracy_rate_15_plus",
        }
    }

    /// En-tête du modèle d'import
    pub fn header(self) -> &'static str {
        match self {
            DemographicField::TotalPopulation => "Total Population",
            DemographicField::MalePercentage => "Male Population",
            DemographicField::FemalePercentage => "Female Population",
            DemographicField::UrbanPercentage => "Urban Population",
            DemographicField::RuralPercentage => "Rural Population",
            DemographicField::Population10Plus => "Population 10+",
            DemographicField::SingleRate => "Single Rate",
            DemographicField::MarriedRate => "Married Rate",
            DemographicField::DivorcedRate => "Divorced Rate",
            DemographicField::WidowedRate => "Widowed Rate",
            DemographicField::SchoolEnrollmentRate => "School Enrollment Rate",
            DemographicField::IlliteracyRate10Plus => "Illiteracy Rate 10+",
            DemographicField::Population15Plus => "Population 15+",
            DemographicField::IlliteracyRate15Plus => "Illiteracy Rate 15+",
        }
    }

    /// En-tête des exports (français)
    pub fn export_header(self) -> &'static str {
        match self {
            DemographicField::TotalPopulation => "Population Totale",
            DemographicField::MalePercentage => "Pourcentage Hommes",
            DemographicField::FemalePercentage => "Pourcentage Femmes",
            DemographicField::UrbanPercentage => "Pourcentage Urbain",
            DemographicField::RuralPercentage => "Pourcentage Rural",
            DemographicField::Population10Plus => "Population 10+",
            DemographicField::SingleRate => "Taux Célibataire",
            DemographicField::MarriedRate => "Taux Marié",
            DemographicField::DivorcedRate => "Taux Divorcé",
            DemographicField::WidowedRate => "Taux Veuf",
            DemographicField::SchoolEnrollmentRate => "Taux Scolarisation",
            DemographicField::IlliteracyRate10Plus => "Taux d'Analphabétisme (10+)",
            DemographicField::Population15Plus => "Population 15+",
            DemographicField::IlliteracyRate15Plus => "Taux d'Analphabétisme (15+)",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            DemographicField::TotalPopulation => "Population totale (nombre entier)",
            DemographicField::MalePercentage => "Pourcentage de population masculine (0-100)",
            DemographicField::FemalePercentage => "Pourcentage de population féminine (0-100)",
            DemographicField::UrbanPercentage => "Pourcentage de population urbaine (0-100)",
            DemographicField::RuralPercentage => "Pourcentage de population rurale (0-100)",
            DemographicField::Population10Plus => "Population de 10 ans et plus (nombre entier)",
            DemographicField::SingleRate => "Taux de célibataires (0-100)",
            DemographicField::MarriedRate => "Taux de mariés (0-100)",
            DemographicField::DivorcedRate => "Taux de divorcés (0-100)",
            DemographicField::WidowedRate => "Taux de veufs/veuves (0-100)",
            DemographicField::SchoolEnrollmentRate => "Taux de scolarisation (0-100)",
            DemographicField::IlliteracyRate10Plus => "Taux d'analphabétisme 10+ (0-100)",
            DemographicField::Population15Plus => "Population de 15 ans et plus (nombre entier)",
            DemographicField::IlliteracyRate15Plus => "Taux d'analphabétisme 15+ (0-100)",
        }
    }

    /// Clé dans le JSON structuré de l'office statistique
    pub fn structured_key(self) -> &'static str {
        match self {
            DemographicField::TotalPopulation => "population",
            DemographicField::MalePercentage => "male",
            DemographicField::FemalePercentage => "female",
            DemographicField::UrbanPercentage => "urban",
            DemographicField::RuralPercentage => "rural",
            other => other.column(),
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            DemographicField::TotalPopulation
            | DemographicField::Population10Plus
            | DemographicField::Population15Plus => ValueKind::Count,
            _ => ValueKind::Rate,
        }
    }
}

/// Niveaux d'instruction (sous-enregistrement optionnel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EducationField {
    NoEducation,
    Preschool,
    Primary,
    MiddleSchool,
    HighSchool,
    University,
}

impl EducationField {
    pub const ALL: [EducationField; 6] = [
        EducationField::NoEducation,
        EducationField::Preschool,
        EducationField::Primary,
        EducationField::MiddleSchool,
        EducationField::HighSchool,
        EducationField::University,
    ];

    pub fn header(self) -> &'static str {
        match self {
            EducationField::NoEducation => "No Education",
            EducationField::Preschool => "Preschool",
            EducationField::Primary => "Primary",
            EducationField::MiddleSchool => "Middle School",
            EducationField::HighSchool => "High School",
            EducationField::University => "University",
        }
    }

    pub fn export_header(self) -> &'static str {
        match self {
            EducationField::NoEducation => "Aucun niveau",
            EducationField::Preschool => "Préscolaire",
            EducationField::Primary => "Primaire",
            EducationField::MiddleSchool => "Collège",
            EducationField::HighSchool => "Lycée",
            EducationField::University => "Université",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            EducationField::NoEducation => "Pourcentage sans éducation (0-100)",
            EducationField::Preschool => "Pourcentage préscolaire (0-100)",
            EducationField::Primary => "Pourcentage primaire (0-100)",
            EducationField::MiddleSchool => "Pourcentage collège (0-100)",
            EducationField::HighSchool => "Pourcentage lycée (0-100)",
            EducationField::University => "Pourcentage université (0-100)",
        }
    }

    /// Clé dans le JSON structuré
    pub fn structured_key(self) -> &'static str {
        match self {
            EducationField::NoEducation => "no_education",
            EducationField::Preschool => "preschool",
            EducationField::Primary => "primary",
            EducationField::MiddleSchool => "middle_school",
            EducationField::HighSchool => "high_school",
            EducationField::University => "university",
        }
    }
}

/// En-têtes et descriptions du modèle d'import, dans l'ordre des colonnes
pub fn template_columns() -> Vec<(&'static str, &'static str)> {
    ZoneColumn::ALL
        .iter()
        .map(|c| (c.header(), c.description()))
        .chain(
            DemographicField::ALL
                .iter()
                .map(|f| (f.header(), f.description())),
        )
        .chain(
            EducationField::ALL
                .iter()
                .map(|f| (f.header(), f.description())),
        )
        .collect()
}

/// Bloc d'instructions placé sous les lignes du modèle d'import
pub const TEMPLATE_INSTRUCTIONS: [&str; 4] = [
    "INSTRUCTIONS :",
    "- Remplir les colonnes de données pour chaque ligne selon le niveau indiqué dans 'niveau_donnee'.",
    "- Ne pas modifier les colonnes administratives ni 'niveau_donnee'.",
    "- Vous pouvez ajouter d'autres lignes si besoin, mais respectez les valeurs possibles pour 'niveau_donnee' : region, departement, commune.",
];

fn is_template_text(text: &str) -> bool {
    TEMPLATE_INSTRUCTIONS.contains(&text)
        || template_columns().iter().any(|(_, description)| *description == text)
}

/// Vrai si la ligne ne contient que des descriptions de colonnes ou des
/// instructions du modèle d'import (modèle rempli puis réimporté)
pub fn is_template_annotation(dataset: &Dataset, row: usize) -> bool {
    let mut texts = dataset
        .rows
        .get(row)
        .into_iter()
        .flatten()
        .filter_map(Cell::as_text)
        .peekable();
    texts.peek().is_some() && texts.all(|text| is_template_text(&text))
}

/// Correspondance champ → index de colonne pour un fichier donné
#[derive(Debug, Clone)]
pub struct ColumnMap {
    zone: [Option<usize>; 9],
    demographic: [Option<usize>; 14],
    education: [Option<usize>; 6],
}

impl ColumnMap {
    /// Résout toutes les colonnes une fois pour le fichier
    pub fn resolve(dataset: &Dataset) -> Self {
        let index = dataset.header_index();
        Self {
            zone: ZoneColumn::ALL.map(|c| find(&index, c.header(), c.aliases())),
            demographic: DemographicField::ALL
                .map(|f| find(&index, f.header(), &[f.export_header(), f.column()])),
            education: EducationField::ALL
                .map(|f| find(&index, f.header(), &[f.export_header()])),
        }
    }

    pub fn zone(&self, column: ZoneColumn) -> Option<usize> {
        self.zone[column as usize]
    }

    pub fn demographic(&self, field: DemographicField) -> Option<usize> {
        self.demographic[field as usize]
    }

    pub fn education(&self, field: EducationField) -> Option<usize> {
        self.education[field as usize]
    }

    /// Vrai si au moins une colonne d'éducation est présente
    pub fn has_education(&self) -> bool {
        self.education.iter().any(Option::is_some)
    }

    /// Champs statistiques sans colonne dans le fichier
    pub fn missing_demographic(&self) -> Vec<DemographicField> {
        DemographicField::ALL
            .into_iter()
            .filter(|f| self.demographic(*f).is_none())
            .collect()
    }
}

fn find(index: &HeaderIndex, header: &str, aliases: &[&str]) -> Option<usize> {
    index.find(header).or_else(|| index.find_any(aliases))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_columns_order() {
        let columns = template_columns();
        assert_eq!(columns.len(), 29);
        assert_eq!(columns[0].0, "Country Code");
        assert_eq!(columns[8].0, "niveau_donnee");
        assert_eq!(columns[9].0, "Total Population");
        assert_eq!(columns[22].0, "Illiteracy Rate 15+");
        assert_eq!(columns[28].0, "University");
    }

    #[test]
    fn test_field_serde_names() {
        for field in DemographicField::ALL {
            let json = serde_json::to_value(field).unwrap();
            assert_eq!(json, field.column());
        }
        let field: DemographicField = serde_json::from_str("\"population_10_plus\"").unwrap();
        assert_eq!(field, DemographicField::Population10Plus);
    }

    #[test]
    fn test_resolve_mixed_headers() {
        let dataset = Dataset::new(vec![
            "country code".into(),
            "Code Région".into(),
            "NIVEAU_DONNEE".into(),
            "Population Totale".into(),
            "Illiteracy rate (10+)".into(),
            "Taux d’Analphabétisme 15+".into(),
            "Primaire".into(),
        ]);
        let map = ColumnMap::resolve(&dataset);

        assert_eq!(map.zone(ZoneColumn::CountryCode), Some(0));
        assert_eq!(map.zone(ZoneColumn::RegionCode), Some(1));
        assert_eq!(map.zone(ZoneColumn::Level), Some(2));
        assert_eq!(map.zone(ZoneColumn::CommuneCode), None);
        assert_eq!(map.demographic(DemographicField::TotalPopulation), Some(3));
        assert_eq!(map.demographic(DemographicField::IlliteracyRate10Plus), Some(4));
        assert_eq!(map.demographic(DemographicField::IlliteracyRate15Plus), Some(5));
        assert_eq!(map.education(EducationField::Primary), Some(6));
        assert!(map.has_education());
        assert!(map
            .missing_demographic()
            .contains(&DemographicField::UrbanPercentage));
    }
}
