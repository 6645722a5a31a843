//! Validation et conversion d'une ligne d'import en enregistrement

use thiserror::Error;

use rgph_io::{Cell, Dataset};

use crate::config::DefaultsConfig;
use crate::import::columns::{ColumnMap, DemographicField, EducationField, ValueKind, ZoneColumn};
use crate::import::directory::ZoneDirectory;
use crate::models::{DemographicStats, EducationShares, ZoneKey, ZoneLevel};

/// Erreur de ligne: la ligne est ignorée et comptée
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("Unknown data level {0:?}. Use: region, departement, commune")]
    UnknownLevel(String),

    #[error("Missing {0}")]
    MissingReference(&'static str),

    #[error("{} code {code} not found", .level.label())]
    UnknownCode { level: ZoneLevel, code: String },

    #[error("{} {code} does not belong to {parent}", .level.label())]
    HierarchyMismatch {
        level: ZoneLevel,
        code: String,
        parent: String,
    },

    #[error("Invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Missing value for {0}")]
    MissingValue(&'static str),

    #[error("Invalid zone code {0:?}")]
    InvalidCode(String),
}

impl RowError {
    /// Catégorie de l'erreur dans le rapport
    pub fn kind(&self) -> &'static str {
        match self {
            RowError::MissingReference(_)
            | RowError::UnknownCode { .. }
            | RowError::HierarchyMismatch { .. } => "missing_reference",
            RowError::UnknownLevel(_)
            | RowError::InvalidValue { .. }
            | RowError::MissingValue(_)
            | RowError::InvalidCode(_) => "validation",
        }
    }
}

/// Enregistrement prêt à être inséré
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRecord {
    pub zone: ZoneKey,
    pub level: ZoneLevel,
    /// Code de la zone, pour les messages
    pub code: String,
    pub stats: DemographicStats,
    pub education: Option<EducationShares>,
}

/// Arrondi à deux décimales
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Taux ramené dans [0, 100] avec deux décimales
pub fn clamp_rate(value: f64) -> f64 {
    round2(value.clamp(0.0, 100.0))
}

/// Effectif: entier positif (arrondi). Cellule vide → `None`.
pub fn cast_count(cell: &Cell, field: &'static str) -> Result<Option<i64>, RowError> {
    if cell.is_blank() {
        return Ok(None);
    }
    match cell.as_number() {
        Some(n) if n >= 0.0 && n < i64::MAX as f64 => Ok(Some(n.round() as i64)),
        _ => Err(invalid(field, cell)),
    }
}

/// Taux: décimal borné dans [0, 100]. Cellule vide → `None`.
pub fn cast_rate(cell: &Cell, field: &'static str) -> Result<Option<f64>, RowError> {
    if cell.is_blank() {
        return Ok(None);
    }
    cell.as_number()
        .map(|n| Some(clamp_rate(n)))
        .ok_or_else(|| invalid(field, cell))
}

fn invalid(field: &'static str, cell: &Cell) -> RowError {
    RowError::InvalidValue {
        field,
        value: cell.to_string(),
    }
}

/// Affecte une valeur numérique au champ correspondant
pub fn set_field(stats: &mut DemographicStats, field: DemographicField, value: f64) {
    let count = || value.max(0.0).round() as i64;
    let rate = || clamp_rate(value);
    match field {
        DemographicField::TotalPopulation => stats.total_population = count(),
        DemographicField::MalePercentage => stats.male_percentage = rate(),
        DemographicField::FemalePercentage => stats.female_percentage = rate(),
        DemographicField::UrbanPercentage => stats.urban_percentage = rate(),
        DemographicField::RuralPercentage => stats.rural_percentage = rate(),
        DemographicField::Population10Plus => stats.population_10_plus = count(),
        DemographicField::SingleRate => stats.single_rate = rate(),
        DemographicField::MarriedRate => stats.married_rate = rate(),
        DemographicField::DivorcedRate => stats.divorced_rate = rate(),
        DemographicField::WidowedRate => stats.widowed_rate = rate(),
        DemographicField::SchoolEnrollmentRate => stats.school_enrollment_rate = rate(),
        DemographicField::IlliteracyRate10Plus => stats.illiteracy_rate_10_plus = rate(),
        DemographicField::Population15Plus => stats.population_15_plus = count(),
        DemographicField::IlliteracyRate15Plus => stats.illiteracy_rate_15_plus = rate(),
    }
}

pub fn set_education(shares: &mut EducationShares, field: EducationField, value: f64) {
    let value = clamp_rate(value);
    match field {
        EducationField::NoEducation => shares.no_education = value,
        EducationField::Preschool => shares.preschool = value,
        EducationField::Primary => shares.primary = value,
        EducationField::MiddleSchool => shares.middle_school = value,
        EducationField::HighSchool => shares.high_school = value,
        EducationField::University => shares.university = value,
    }
}

/// Construit les statistiques d'une ligne.
///
/// `read` retourne la valeur déjà convertie (taux en pourcentage) ou `None`
/// si la cellule est absente. Les champs absents reçoivent la valeur par
/// défaut du preset, sinon la ligne est rejetée.
pub fn build_stats<F>(defaults: &DefaultsConfig, mut read: F) -> Result<DemographicStats, RowError>
where
    F: FnMut(DemographicField) -> Result<Option<f64>, RowError>,
{
    let mut stats = DemographicStats::default();

    let total = match read(DemographicField::TotalPopulation)? {
        Some(v) => Some(v),
        None => defaults.default_for(DemographicField::TotalPopulation, None),
    }
    .ok_or(RowError::MissingValue(DemographicField::TotalPopulation.header()))?;
    set_field(&mut stats, DemographicField::TotalPopulation, total);

    for field in DemographicField::ALL.into_iter().skip(1) {
        let value = match read(field)? {
            Some(v) => v,
            None => defaults
                .default_for(field, Some(stats.total_population))
                .ok_or(RowError::MissingValue(field.header()))?,
        };
        set_field(&mut stats, field, value);
    }

    Ok(stats)
}

/// Construit le sous-enregistrement éducation: `None` si aucun niveau n'est
/// renseigné, les niveaux manquants valent 0 sinon.
pub fn build_education<F>(mut read: F) -> Result<Option<EducationShares>, RowError>
where
    F: FnMut(EducationField) -> Result<Option<f64>, RowError>,
{
    let mut shares = EducationShares::default();
    let mut present = false;
    for field in EducationField::ALL {
        if let Some(value) = read(field)? {
            set_education(&mut shares, field, value);
            present = true;
        }
    }
    Ok(present.then_some(shares))
}

/// Convertit la ligne `row` d'un fichier tabulaire
pub fn build_row(
    dataset: &Dataset,
    map: &ColumnMap,
    directory: &ZoneDirectory,
    defaults: &DefaultsConfig,
    row: usize,
) -> Result<ImportRecord, RowError> {
    let text = |column: ZoneColumn| {
        map.zone(column)
            .and_then(|c| dataset.cell(row, c).as_text())
    };

    let marker = text(ZoneColumn::Level).unwrap_or_default();
    let level = ZoneLevel::from_marker(&marker).ok_or(RowError::UnknownLevel(marker))?;

    let country_code =
        text(ZoneColumn::CountryCode).ok_or(RowError::MissingReference("Country Code"))?;
    let region_code =
        text(ZoneColumn::RegionCode).ok_or(RowError::MissingReference("Region Code"))?;

    let country = directory.require(ZoneLevel::Country, &country_code)?;
    let region = directory.require(ZoneLevel::Region, &region_code)?;
    directory.check_parent(region, country)?;

    let mut zone = ZoneKey {
        country: Some(country.id),
        region: Some(region.id),
        department: None,
        commune: None,
    };
    let mut code = region_code;

    if level >= ZoneLevel::Department {
        let department_code = text(ZoneColumn::DepartmentCode)
            .ok_or(RowError::MissingReference("Department Code"))?;
        let department = directory.require(ZoneLevel::Department, &department_code)?;
        directory.check_parent(department, region)?;
        zone.department = Some(department.id);
        code = department_code;

        if level == ZoneLevel::Commune {
            let commune_code = text(ZoneColumn::CommuneCode)
                .ok_or(RowError::MissingReference("Commune Code"))?;
            let commune = directory.require(ZoneLevel::Commune, &commune_code)?;
            directory.check_parent(commune, department)?;
            zone.commune = Some(commune.id);
            code = commune_code;
        }
    }

    let stats = build_stats(defaults, |field| {
        let Some(column) = map.demographic(field) else {
            return Ok(None);
        };
        let cell = dataset.cell(row, column);
        match field.kind() {
            ValueKind::Count => Ok(cast_count(cell, field.header())?.map(|v| v as f64)),
            ValueKind::Rate => cast_rate(cell, field.header()),
        }
    })?;

    let education = if map.has_education() {
        build_education(|field| match map.education(field) {
            Some(column) => cast_rate(dataset.cell(row, column), field.header()),
            None => Ok(None),
        })?
    } else {
        None
    };

    Ok(ImportRecord {
        zone,
        level,
        code,
        stats,
        education,
    })
}
