//! Export des données démographiques d'un recensement

use std::collections::HashMap;

use deadpool_postgres::GenericClient;
use tracing::{debug, info};

use rgph_io::{Cell, Sheet};

use crate::export::{ExportError, WorkbookExport};
use crate::import::columns::{DemographicField, EducationField};
use crate::import::directory::{ZoneDirectory, ZoneEntry};
use crate::models::{Census, DemographicData, DemographicStats, ZoneLevel};
use crate::store;

/// Indicateurs exportés (les parts urbaine et rurale ne le sont pas)
pub const EXPORT_FIELDS: [DemographicField; 12] = [
    DemographicField::TotalPopulation,
    DemographicField::MalePercentage,
    DemographicField::FemalePercentage,
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

const FULL_EXPORT_WIDTH: f64 = 20.0;
const FULL_EXPORT_WIDE_COLUMNS: u16 = 14;

/// Largeurs de la feuille d'une zone (colonnes A à N)
const ZONE_EXPORT_WIDTHS: [f64; 14] = [
    25.0, 15.0, 20.0, 20.0, 20.0, 15.0, 15.0, 15.0, 15.0, 15.0, 20.0, 25.0, 15.0, 25.0,
];

const NOT_AVAILABLE: &str = "N/A";

/// Données indexées par (niveau, id de zone)
pub type ZoneData = HashMap<(ZoneLevel, i32), DemographicData>;

pub fn index_by_zone(data: Vec<DemographicData>) -> ZoneData {
    data.into_iter()
        .filter_map(|d| {
            let zone = d.zone();
            Some(((zone.level()?, zone.zone_id()?), d))
        })
        .collect()
}

fn stat_value(stats: &DemographicStats, field: DemographicField) -> Cell {
    match field {
        DemographicField::TotalPopulation => Cell::Number(stats.total_population as f64),
        DemographicField::MalePercentage => Cell::Number(stats.male_percentage),
        DemographicField::FemalePercentage => Cell::Number(stats.female_percentage),
        DemographicField::UrbanPercentage => Cell::Number(stats.urban_percentage),
        DemographicField::RuralPercentage => Cell::Number(stats.rural_percentage),
        DemographicField::Population10Plus => Cell::Number(stats.population_10_plus as f64),
        DemographicField::SingleRate => Cell::Number(stats.single_rate),
        DemographicField::MarriedRate => Cell::Number(stats.married_rate),
        DemographicField::DivorcedRate => Cell::Number(stats.divorced_rate),
        DemographicField::WidowedRate => Cell::Number(stats.widowed_rate),
        DemographicField::SchoolEnrollmentRate => Cell::Number(stats.school_enrollment_rate),
        DemographicField::IlliteracyRate10Plus => Cell::Number(stats.illiteracy_rate_10_plus),
        DemographicField::Population15Plus => Cell::Number(stats.population_15_plus as f64),
        DemographicField::IlliteracyRate15Plus => Cell::Number(stats.illiteracy_rate_15_plus),
    }
}

fn stat_cells(stats: &DemographicStats) -> impl Iterator<Item = Cell> + '_ {
    EXPORT_FIELDS.iter().map(move |f| stat_value(stats, *f))
}

fn education_cells(data: &DemographicData) -> Vec<Cell> {
    match &data.education {
        Some(education) => education.values().into_iter().map(Cell::Number).collect(),
        None => vec![Cell::Empty; EducationField::ALL.len()],
    }
}

/// En-têtes propres à chaque niveau, avant les indicateurs
fn prefix_headers(level: ZoneLevel) -> &'static [&'static str] {
    match level {
        ZoneLevel::Region => &["Nom Région", "Code Région"],
        ZoneLevel::Department => &["Région", "Nom Département", "Code Département"],
        ZoneLevel::Commune => &["Département", "Nom Commune", "Code Commune"],
        ZoneLevel::Country => &["Nom Pays", "Code Pays"],
    }
}

fn sheet_title(level: ZoneLevel) -> &'static str {
    match level {
        ZoneLevel::Country => "Pays",
        ZoneLevel::Region => "Régions",
        ZoneLevel::Department => "Départements",
        ZoneLevel::Commune => "Communes",
    }
}

fn full_headers(level: ZoneLevel) -> Vec<String> {
    prefix_headers(level)
        .iter()
        .copied()
        .chain(EXPORT_FIELDS.iter().map(|f| f.export_header()))
        .chain(EducationField::ALL.iter().map(|f| f.export_header()))
        .map(String::from)
        .collect()
}

fn parent_name<'a>(directory: &'a ZoneDirectory, entry: &ZoneEntry) -> &'a str {
    let parent_level = match entry.level {
        ZoneLevel::Department => ZoneLevel::Region,
        ZoneLevel::Commune => ZoneLevel::Department,
        _ => return "",
    };
    entry
        .parent
        .and_then(|id| directory.get(parent_level, id))
        .map(|p| p.name.as_str())
        .unwrap_or("")
}

/// Feuille d'un niveau: une ligne par zone ayant des données
pub fn level_sheet(level: ZoneLevel, directory: &ZoneDirectory, data: &ZoneData) -> Sheet {
    let mut sheet = Sheet::new(sheet_title(level), full_headers(level));
    sheet.widths = (0..FULL_EXPORT_WIDE_COLUMNS)
        .map(|col| (col, FULL_EXPORT_WIDTH))
        .collect();

    for entry in directory.entries(level) {
        let Some(zone_data) = data.get(&(level, entry.id)) else {
            continue;
        };

        let mut row: Vec<Cell> = Vec::with_capacity(sheet.headers.len());
        if level != ZoneLevel::Region {
            row.push(Cell::from(parent_name(directory, entry)));
        }
        row.push(Cell::from(entry.name.as_str()));
        row.push(Cell::from(entry.code.as_str()));
        row.extend(stat_cells(&zone_data.stats));
        row.extend(education_cells(zone_data));
        sheet.push_row(row);
    }
    sheet
}

/// Trois feuilles: régions, départements, communes
pub fn full_export_sheets(directory: &ZoneDirectory, data: &ZoneData) -> Vec<Sheet> {
    [ZoneLevel::Region, ZoneLevel::Department, ZoneLevel::Commune]
        .into_iter()
        .map(|level| level_sheet(level, directory, data))
        .collect()
}

/// Feuille d'une zone: une seule ligne, `N/A` si aucune donnée
pub fn zone_sheet(level: ZoneLevel, name: &str, data: Option<&DemographicData>) -> Sheet {
    let headers = ["Zone", "Type"]
        .into_iter()
        .chain(EXPORT_FIELDS.iter().map(|f| f.export_header()))
        .map(String::from)
        .collect();
    let mut sheet = Sheet::new(format!("{} {}", level.label(), name), headers);
    sheet.widths = ZONE_EXPORT_WIDTHS
        .iter()
        .enumerate()
        .map(|(col, width)| (col as u16, *width))
        .collect();

    let mut row = vec![Cell::from(name), Cell::from(type_label(level))];
    match data {
        Some(data) => row.extend(stat_cells(&data.stats)),
        None => row.extend(EXPORT_FIELDS.iter().map(|_| Cell::from(NOT_AVAILABLE))),
    }
    sheet.push_row(row);
    sheet
}

/// "Region", "Department", "Commune"
fn type_label(level: ZoneLevel) -> String {
    let raw = level.as_str();
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn full_export_filename(year_label: &str) -> String {
    format!("donnees_mauritanie_{}.xlsx", year_label)
}

pub fn zone_export_filename(level: ZoneLevel, name: &str, year_label: &str) -> String {
    format!(
        "donnees_{}_{}_{}.xlsx",
        level.as_str(),
        name.replace(' ', "_"),
        year_label
    )
}

/// Année affichée dans le nom de fichier: celle demandée, sinon celle du
/// recensement retenu
fn year_label(requested: Option<i32>, census: Option<&Census>) -> String {
    requested
        .or(census.map(|c| c.year))
        .map(|y| y.to_string())
        .unwrap_or_default()
}

/// Charge l'export complet pour une année (le recensement le plus récent par défaut).
///
/// Sans recensement correspondant, les feuilles n'ont que leurs en-têtes.
pub async fn load_full_export<C: GenericClient>(
    client: &C,
    schema: &str,
    year: Option<i32>,
) -> Result<WorkbookExport, ExportError> {
    let census = store::census::resolve(client, schema, year).await?;
    let data = match &census {
        Some(census) => store::demographics::list_for_census(client, schema, census.id).await?,
        None => Vec::new(),
    };
    let directory = ZoneDirectory::load(client, schema).await?;

    let data = index_by_zone(data);
    let export = WorkbookExport {
        filename: full_export_filename(&year_label(year, census.as_ref())),
        sheets: full_export_sheets(&directory, &data),
    };
    info!(
        census_id = census.as_ref().map(|c| c.id),
        rows = export.data_rows(),
        "Full export prepared"
    );
    Ok(export)
}

/// Charge l'export d'une zone
pub async fn load_zone_export<C: GenericClient>(
    client: &C,
    schema: &str,
    level: ZoneLevel,
    zone_id: i32,
    year: Option<i32>,
) -> Result<WorkbookExport, ExportError> {
    if level == ZoneLevel::Country {
        return Err(ExportError::InvalidZoneType);
    }
    let name = store::hierarchy::zone_name(client, schema, level, zone_id)
        .await?
        .ok_or_else(|| ExportError::NotFound(format!("{} {} introuvable", level.label(), zone_id)))?;

    let census = store::census::resolve(client, schema, year).await?;
    let data = match &census {
        Some(census) => store::demographics::list_for_census(client, schema, census.id).await?,
        None => Vec::new(),
    };
    let data = index_by_zone(data);
    let zone_data = data.get(&(level, zone_id));
    debug!(level = %level, zone_id, has_data = zone_data.is_some(), "Zone export prepared");

    Ok(WorkbookExport {
        filename: zone_export_filename(level, &name, &year_label(year, census.as_ref())),
        sheets: vec![zone_sheet(level, &name, zone_data)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EducationShares;

    fn directory() -> ZoneDirectory {
        let mut directory = ZoneDirectory::default();
        directory.insert(ZoneLevel::Country, ZoneEntry::new(1, None, "MR", "Mauritanie"));
        directory.insert(ZoneLevel::Region, ZoneEntry::new(10, Some(1), "MR06", "Trarza"));
        directory.insert(ZoneLevel::Region, ZoneEntry::new(11, Some(1), "MR13", "Nouakchott Ouest"));
        directory.insert(ZoneLevel::Department, ZoneEntry::new(20, Some(10), "MR061", "Rosso"));
        directory.insert(ZoneLevel::Commune, ZoneEntry::new(30, Some(20), "MR06101", "Rosso"));
        directory.insert(ZoneLevel::Commune, ZoneEntry::new(31, Some(20), "MR06102", "Jidrel Mohguen"));
        directory
    }

    fn data(region: Option<i32>, department: Option<i32>, commune: Option<i32>, population: i64) -> DemographicData {
        DemographicData {
            id: 0,
            census: 1,
            country: Some(1),
            region,
            department,
            commune,
            stats: DemographicStats {
                total_population: population,
                male_percentage: 49.1,
                ..Default::default()
            },
            education: None,
        }
    }

    #[test]
    fn test_full_export_rows_only_for_zones_with_data() {
        let mut with_education = data(Some(10), Some(20), Some(30), 48_000);
        with_education.education = Some(EducationShares {
            no_education: 40.0,
            primary: 30.0,
            ..Default::default()
        });
        let data = index_by_zone(vec![
            data(Some(10), None, None, 272_773),
            with_education,
        ]);

        let sheets = full_export_sheets(&directory(), &data);
        assert_eq!(sheets.len(), 3);
        assert_eq!(sheets[0].name, "Régions");
        assert_eq!(sheets[0].data_rows(), 1);
        assert_eq!(sheets[1].data_rows(), 0);
        assert_eq!(sheets[2].data_rows(), 1);

        let region = &sheets[0].rows[0];
        assert_eq!(region[0], Cell::from("Trarza"));
        assert_eq!(region[1], Cell::from("MR06"));
        assert_eq!(region[2], Cell::Number(272_773.0));
        assert!(region[region.len() - 1].is_blank());

        let commune = &sheets[2].rows[0];
        assert_eq!(commune[0], Cell::from("Rosso"));
        assert_eq!(commune[2], Cell::from("MR06101"));
        assert_eq!(commune.len(), sheets[2].headers.len());
        assert_eq!(commune[3 + EXPORT_FIELDS.len()], Cell::Number(40.0));
    }

    #[test]
    fn test_full_export_headers() {
        let headers = full_headers(ZoneLevel::Department);
        assert_eq!(headers.len(), 3 + 12 + 6);
        assert_eq!(headers[0], "Région");
        assert_eq!(headers[3], "Population Totale");
        assert!(!headers.iter().any(|h| h.contains("Urbain")));
        assert_eq!(headers.last().map(String::as_str), Some("Université"));
    }

    #[test]
    fn test_zone_sheet_without_data() {
        let sheet = zone_sheet(ZoneLevel::Commune, "Jidrel Mohguen", None);
        assert_eq!(sheet.name, "Commune Jidrel Mohguen");
        assert_eq!(sheet.rows[0][1], Cell::from("Commune"));
        assert!(sheet.rows[0][2..].iter().all(|c| *c == Cell::from(NOT_AVAILABLE)));
        assert_eq!(sheet.widths.len(), 14);
    }

    #[test]
    fn test_zone_sheet_with_data() {
        let d = data(Some(10), None, None, 272_773);
        let sheet = zone_sheet(ZoneLevel::Region, "Trarza", Some(&d));
        assert_eq!(sheet.rows[0][1], Cell::from("Region"));
        assert_eq!(sheet.rows[0][2], Cell::Number(272_773.0));
        assert_eq!(sheet.rows[0][3], Cell::Number(49.1));
    }

    #[test]
    fn test_filenames() {
        assert_eq!(full_export_filename("2023"), "donnees_mauritanie_2023.xlsx");
        assert_eq!(
            zone_export_filename(ZoneLevel::Region, "Nouakchott Ouest", "2013"),
            "donnees_region_Nouakchott_Ouest_2013.xlsx"
        );
        let census = Census { id: 3, year: 2023, is_projection: false };
        assert_eq!(year_label(None, Some(&census)), "2023");
        assert_eq!(year_label(Some(2013), None), "2013");
        assert_eq!(year_label(None, None), "");
    }
}
