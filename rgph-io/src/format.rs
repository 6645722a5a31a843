//! Formats de fichiers acceptés à l'import

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::TabularError;

/// Format d'un fichier d'import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Csv,
    Xls,
    Xlsx,
    Json,
}

impl FileFormat {
    pub const ALL: [FileFormat; 4] = [
        FileFormat::Csv,
        FileFormat::Xls,
        FileFormat::Xlsx,
        FileFormat::Json,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Xls => "xls",
            FileFormat::Xlsx => "xlsx",
            FileFormat::Json => "json",
        }
    }

    /// Type MIME, tel qu'envoyé par le formulaire d'administration
    pub fn content_type(self) -> &'static str {
        match self {
            FileFormat::Csv => "text/csv",
            FileFormat::Xls => "application/vnd.ms-excel",
            FileFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            FileFormat::Json => "application/json",
        }
    }

    /// Déduit le format depuis l'extension d'un chemin
    pub fn from_path(path: &Path) -> Result<Self, TabularError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| TabularError::UnsupportedFormat(path.display().to_string()))?;
        ext.parse()
    }
}

impl FromStr for FileFormat {
    type Err = TabularError;

    /// Accepte l'extension (`xlsx`, `.csv`) ou le type MIME
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().trim_start_matches('.').to_ascii_lowercase();
        FileFormat::ALL
            .into_iter()
            .find(|f| value == f.extension() || value == f.content_type())
            .ok_or_else(|| TabularError::UnsupportedFormat(s.to_string()))
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extension() {
        assert_eq!("csv".parse::<FileFormat>().unwrap(), FileFormat::Csv);
        assert_eq!(".XLSX".parse::<FileFormat>().unwrap(), FileFormat::Xlsx);
        assert_eq!(" json ".parse::<FileFormat>().unwrap(), FileFormat::Json);
    }

    #[test]
    fn test_parse_content_type() {
        assert_eq!(
            "application/vnd.ms-excel".parse::<FileFormat>().unwrap(),
            FileFormat::Xls
        );
        assert_eq!(
            FileFormat::Xlsx.content_type().parse::<FileFormat>().unwrap(),
            FileFormat::Xlsx
        );
    }

    #[test]
    fn test_unknown_format() {
        assert!(matches!(
            "ods".parse::<FileFormat>(),
            Err(TabularError::UnsupportedFormat(_))
        ));
        assert!(FileFormat::from_path(Path::new("data")).is_err());
        assert_eq!(
            FileFormat::from_path(Path::new("/tmp/donnees.XLS")).unwrap(),
            FileFormat::Xls
        );
    }
}
