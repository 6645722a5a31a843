//! Représentation colonnaire d'un fichier tabulaire

use std::fmt;

use serde::Serialize;

use crate::header::normalize_header;

/// Valeur d'une cellule, indépendante du format source
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Vrai si la cellule est vide ou ne contient que des blancs
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Texte de la cellule (les nombres entiers sont rendus sans décimale)
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            Cell::Number(n) => Some(n.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
        }
    }

    /// Valeur numérique de la cellule.
    ///
    /// Le texte accepte les espaces (y compris insécables) comme séparateurs
    /// de milliers et la virgule comme séparateur décimal.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Text(s) => parse_number(s),
            _ => None,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Number(f64::from(value))
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Empty)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => Ok(()),
        }
    }
}

/// Parse un nombre saisi à la main:
/// - "12 345" → 12345.0
/// - "48,5" → 48.5
/// - "+1895." → 1895.0
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\u{202f}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    let value: f64 = fast_float::parse(cleaned).ok()?;
    value.is_finite().then_some(value)
}

/// Contenu d'un fichier: une ligne d'en-têtes et des lignes de cellules
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Ajoute une ligne, complétée ou tronquée à la largeur des en-têtes
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.headers.len(), Cell::Empty);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Pré-calcule les formes normalisées des en-têtes
    pub fn header_index(&self) -> HeaderIndex {
        HeaderIndex {
            normalized: self.headers.iter().map(|h| normalize_header(h)).collect(),
        }
    }

    /// Cellule d'une ligne, `Cell::Empty` si hors limites
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&Cell::Empty)
    }

    /// Supprime les lignes entièrement vides
    pub fn drop_blank_rows(&mut self) {
        self.rows.retain(|row| !row.iter().all(Cell::is_blank));
    }
}

/// En-têtes normalisés d'un dataset, pour des recherches répétées
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    normalized: Vec<String>,
}

impl HeaderIndex {
    /// Première colonne correspondant au nom attendu
    pub fn find(&self, expected: &str) -> Option<usize> {
        let expected = normalize_header(expected);
        self.normalized.iter().position(|h| *h == expected)
    }

    /// Première colonne correspondant à l'un des alias
    pub fn find_any(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|alias| self.find(alias))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_formats() {
        assert_eq!(parse_number("12 345"), Some(12345.0));
        assert_eq!(parse_number("12\u{a0}345"), Some(12345.0));
        assert_eq!(parse_number("48,5"), Some(48.5));
        assert_eq!(parse_number("+1895."), Some(1895.0));
        assert_eq!(parse_number("-3.25"), Some(-3.25));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(Cell::Number(42.0).as_text().as_deref(), Some("42"));
        assert_eq!(Cell::Number(4.5).as_text().as_deref(), Some("4.5"));
        assert_eq!(Cell::from("  MR01 ").as_text().as_deref(), Some("MR01"));
        assert_eq!(Cell::from("   ").as_text(), None);
        assert!(Cell::Empty.is_blank());
    }

    #[test]
    fn test_dataset_lookup() {
        let mut ds = Dataset::new(vec!["Region Code".into(), "Population 10+".into()]);
        ds.push_row(vec![Cell::from("MR01")]);
        assert_eq!(ds.rows[0].len(), 2);
        assert_eq!(ds.cell(0, 1), &Cell::Empty);
        assert_eq!(ds.cell(5, 0), &Cell::Empty);

        let index = ds.header_index();
        assert_eq!(index.find("region_code"), Some(0));
        assert_eq!(index.find("population 10plus"), Some(1));
        assert_eq!(index.find_any(&["Code Region", "Region Code"]), Some(0));
        assert_eq!(index.find("Commune Code"), None);
    }

    #[test]
    fn test_drop_blank_rows() {
        let mut ds = Dataset::new(vec!["a".into(), "b".into()]);
        ds.push_row(vec![Cell::Empty, Cell::from(" ")]);
        ds.push_row(vec![Cell::Number(1.0), Cell::Empty]);
        ds.drop_blank_rows();
        assert_eq!(ds.len(), 1);
    }
}
