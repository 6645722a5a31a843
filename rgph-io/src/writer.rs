//! Écriture de classeurs XLSX
//!
//! Une [`Sheet`] décrit le contenu (en-têtes, lignes, largeurs) sans dépendre
//! de la bibliothèque d'écriture; [`write_workbook`] la matérialise.

use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet};

use crate::{Cell, TabularError};

/// Longueur maximale d'un nom de feuille Excel
const MAX_SHEET_NAME: usize = 31;

/// Style de la ligne d'en-tête
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderStyle {
    /// Gras, taille 12, centré (exports)
    #[default]
    Bold,
    /// Blanc sur fond bleu, centré, retour à la ligne (modèle d'import)
    Banner,
}

/// Feuille à écrire
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    /// Ligne optionnelle de descriptions sous les en-têtes
    pub descriptions: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// Lignes de texte en gras ajoutées après les données, séparées par une ligne vide
    pub footer: Vec<String>,
    /// Largeur par défaut des colonnes
    pub column_width: Option<f64>,
    /// Largeurs spécifiques (index de colonne, largeur)
    pub widths: Vec<(u16, f64)>,
    pub header_style: HeaderStyle,
}

impl Sheet {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            ..Default::default()
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    /// Nombre de lignes de données (hors en-têtes et descriptions)
    pub fn data_rows(&self) -> usize {
        self.rows.len()
    }
}

/// Nettoie un nom de feuille: caractères interdits retirés, 31 caractères max
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let truncated: String = cleaned.chars().take(MAX_SHEET_NAME).collect();
    if truncated.is_empty() {
        "Feuille".to_string()
    } else {
        truncated
    }
}

/// Écrit les feuilles dans un classeur XLSX en mémoire
pub fn write_workbook(sheets: &[Sheet]) -> Result<Vec<u8>, TabularError> {
    let mut workbook = Workbook::new();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        write_sheet(worksheet, sheet)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn header_format(style: HeaderStyle) -> Format {
    match style {
        HeaderStyle::Bold => Format::new()
            .set_bold()
            .set_font_size(12)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter),
        HeaderStyle::Banner => Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(0x366092))
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_text_wrap(),
    }
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet) -> Result<(), TabularError> {
    worksheet.set_name(sanitize_sheet_name(&sheet.name))?;

    let header_fmt = header_format(sheet.header_style);
    for (col, header) in sheet.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_fmt)?;
    }

    let mut row_idx: u32 = 1;

    if !sheet.descriptions.is_empty() {
        let description_fmt = Format::new()
            .set_italic()
            .set_font_color(Color::RGB(0x666666))
            .set_align(FormatAlign::Left)
            .set_align(FormatAlign::VerticalCenter)
            .set_text_wrap();
        for (col, description) in sheet.descriptions.iter().enumerate() {
            worksheet.write_string_with_format(row_idx, col as u16, description, &description_fmt)?;
        }
        row_idx += 1;
    }

    for row in &sheet.rows {
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    worksheet.write_string(row_idx, col, s)?;
                }
                Cell::Number(n) => {
                    worksheet.write_number(row_idx, col, *n)?;
                }
                Cell::Bool(b) => {
                    worksheet.write_boolean(row_idx, col, *b)?;
                }
            }
        }
        row_idx += 1;
    }

    if !sheet.footer.is_empty() {
        let footer_fmt = Format::new().set_bold();
        row_idx += 1;
        for line in &sheet.footer {
            worksheet.write_string_with_format(row_idx, 0, line, &footer_fmt)?;
            row_idx += 1;
        }
    }

    if let Some(width) = sheet.column_width {
        for col in 0..sheet.headers.len() {
            worksheet.set_column_width(col as u16, width)?;
        }
    }
    for &(col, width) in &sheet.widths {
        worksheet.set_column_width(col, width)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("Régions"), "Régions");
        assert_eq!(sanitize_sheet_name("Commune [Nouakchott]/Sud"), "Commune NouakchottSud");
        assert_eq!(sanitize_sheet_name("???"), "Feuille");
        let long = "Département Dakhlet Nouadhibou Extension";
        assert_eq!(sanitize_sheet_name(long).chars().count(), 31);
    }

    #[test]
    fn test_write_workbook_produces_zip() {
        let mut sheet = Sheet::new("Régions", vec!["Nom".into(), "Population".into()]);
        sheet.push_row(vec![Cell::from("Assaba"), Cell::Number(325_897.0)]);
        sheet.push_row(vec![Cell::from("Tagant"), Cell::Empty]);
        sheet.footer = vec!["INSTRUCTIONS :".into()];
        sheet.column_width = Some(20.0);

        let bytes = write_workbook(&[sheet]).unwrap();
        // Un fichier XLSX est une archive ZIP
        assert_eq!(&bytes[..2], b"PK");
    }
}
