//! Lecture XLS / XLSX via calamine (première feuille uniquement)

use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Range, Reader, Xls, Xlsx};

use crate::{Cell, Dataset, FileFormat, TabularError};

/// Lit la première feuille d'un classeur
pub fn read_workbook(bytes: &[u8], format: FileFormat) -> Result<Dataset, TabularError> {
    let cursor = Cursor::new(bytes.to_vec());

    let range = match format {
        FileFormat::Xlsx => {
            let mut workbook: Xlsx<_> =
                open_workbook_from_rs(cursor).map_err(TabularError::workbook)?;
            first_range(&mut workbook)?
        }
        FileFormat::Xls => {
            let mut workbook: Xls<_> =
                open_workbook_from_rs(cursor).map_err(TabularError::workbook)?;
            first_range(&mut workbook)?
        }
        other => {
            return Err(TabularError::UnsupportedFormat(format!(
                "{} is not a workbook format",
                other
            )))
        }
    };

    range_to_dataset(&range)
}

fn first_range<R>(workbook: &mut R) -> Result<Range<Data>, TabularError>
where
    R: Reader<Cursor<Vec<u8>>>,
    R::Error: std::fmt::Display,
{
    workbook
        .worksheet_range_at(0)
        .ok_or_else(|| TabularError::workbook("no worksheet found"))?
        .map_err(TabularError::workbook)
}

/// Convertit une plage calamine: la première ligne donne les en-têtes
pub fn range_to_dataset(range: &Range<Data>) -> Result<Dataset, TabularError> {
    let mut rows = range.rows();

    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| TabularError::Empty("worksheet".into()))?
        .iter()
        .map(|cell| convert_cell(cell).as_text().unwrap_or_default())
        .collect();

    let mut dataset = Dataset::new(headers);
    for row in rows {
        dataset.push_row(row.iter().map(convert_cell).collect());
    }

    Ok(dataset)
}

fn convert_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::from(s.as_str()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        other => Cell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_to_dataset() {
        let mut range = Range::new((0, 0), (2, 2));
        range.set_value((0, 0), Data::String("Region Code".into()));
        range.set_value((0, 1), Data::String("Total Population".into()));
        range.set_value((0, 2), Data::String("Male Population".into()));
        range.set_value((1, 0), Data::String("MR01".into()));
        range.set_value((1, 1), Data::Int(430_668));
        range.set_value((1, 2), Data::Float(49.2));
        range.set_value((2, 0), Data::String("MR02".into()));

        let ds = range_to_dataset(&range).unwrap();
        assert_eq!(ds.headers.len(), 3);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.cell(0, 1), &Cell::Number(430_668.0));
        assert_eq!(ds.cell(0, 2).as_number(), Some(49.2));
        assert_eq!(ds.cell(1, 1), &Cell::Empty);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(read_workbook(b"not a workbook", FileFormat::Xlsx).is_err());
        assert!(matches!(
            read_workbook(b"a,b", FileFormat::Csv),
            Err(TabularError::UnsupportedFormat(_))
        ));
    }
}
