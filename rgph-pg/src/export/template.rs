//! Modèle d'import pré-rempli avec la hiérarchie administrative

use deadpool_postgres::GenericClient;
use tracing::info;

use rgph_io::{Cell, HeaderStyle, Sheet};

use crate::export::{ExportError, WorkbookExport};
use crate::import::columns::{template_columns, ZoneColumn, TEMPLATE_INSTRUCTIONS};
use crate::import::directory::{ZoneDirectory, ZoneEntry};
use crate::models::ZoneLevel;

pub const TEMPLATE_FILENAME: &str = "template_import_donnees_niveaux.xlsx";
pub const TEMPLATE_SHEET: &str = "Données à Remplir";

const TEMPLATE_WIDTH: f64 = 20.0;

fn code_column(level: ZoneLevel) -> ZoneColumn {
    match level {
        ZoneLevel::Country => ZoneColumn::CountryCode,
        ZoneLevel::Region => ZoneColumn::RegionCode,
        ZoneLevel::Department => ZoneColumn::DepartmentCode,
        ZoneLevel::Commune => ZoneColumn::CommuneCode,
    }
}

fn name_column(level: ZoneLevel) -> ZoneColumn {
    match level {
        ZoneLevel::Country => ZoneColumn::CountryName,
        ZoneLevel::Region => ZoneColumn::RegionName,
        ZoneLevel::Department => ZoneColumn::DepartmentName,
        ZoneLevel::Commune => ZoneColumn::CommuneName,
    }
}

fn column_index(column: ZoneColumn) -> usize {
    ZoneColumn::ALL
        .iter()
        .position(|c| *c == column)
        .unwrap_or_default()
}

fn parent_of<'a>(directory: &'a ZoneDirectory, entry: &ZoneEntry) -> Option<&'a ZoneEntry> {
    let level = match entry.level {
        ZoneLevel::Region => ZoneLevel::Country,
        ZoneLevel::Department => ZoneLevel::Region,
        ZoneLevel::Commune => ZoneLevel::Department,
        ZoneLevel::Country => return None,
    };
    directory.get(level, entry.parent?)
}

/// Ligne du modèle: identification de la zone et de ses ancêtres, données vides
fn template_row(directory: &ZoneDirectory, entry: &ZoneEntry, width: usize) -> Vec<Cell> {
    let mut row = vec![Cell::Empty; width];
    let mut current = Some(entry);
    while let Some(zone) = current {
        row[column_index(code_column(zone.level))] = Cell::from(zone.code.as_str());
        row[column_index(name_column(zone.level))] = Cell::from(zone.name.as_str());
        current = parent_of(directory, zone);
    }
    row[column_index(ZoneColumn::Level)] = Cell::from(entry.level.marker());
    row
}

/// Feuille du modèle: régions, puis départements, puis communes
pub fn template_sheet(directory: &ZoneDirectory) -> Sheet {
    let (headers, descriptions): (Vec<String>, Vec<String>) = template_columns()
        .into_iter()
        .map(|(h, d)| (h.to_string(), d.to_string()))
        .unzip();
    let width = headers.len();

    let mut sheet = Sheet::new(TEMPLATE_SHEET, headers);
    sheet.descriptions = descriptions;
    sheet.header_style = HeaderStyle::Banner;
    sheet.column_width = Some(TEMPLATE_WIDTH);
    sheet.footer = TEMPLATE_INSTRUCTIONS.iter().map(|s| s.to_string()).collect();

    for level in [ZoneLevel::Region, ZoneLevel::Department, ZoneLevel::Commune] {
        for entry in directory.entries(level) {
            sheet.push_row(template_row(directory, entry, width));
        }
    }
    sheet
}

pub async fn load_template<C: GenericClient>(
    client: &C,
    schema: &str,
) -> Result<WorkbookExport, ExportError> {
    let directory = ZoneDirectory::load(client, schema).await?;
    let sheet = template_sheet(&directory);
    info!(rows = sheet.data_rows(), "Import template prepared");
    Ok(WorkbookExport {
        filename: TEMPLATE_FILENAME.to_string(),
        sheets: vec![sheet],
    })
}
