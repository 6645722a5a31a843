//! # rgph-io
//!
//! Lecture et écriture des fichiers du recensement (RGPH) mauritanien.
//!
//! ## Features
//!
//! - Lecture CSV (`,` / `;` / tabulation, UTF-8 ou Windows-1252), XLS, XLSX
//!   et JSON vers un [`Dataset`] colonnaire
//! - Normalisation des en-têtes saisis à la main ([`normalize_header`])
//! - Écriture de classeurs XLSX ([`write_workbook`])
//! - Parsing des limites administratives GeoJSON ([`parse_boundaries`]),
//!   avec reconstruction des départements et régions à partir des communes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rgph_io::{read_path, FileFormat};
//! use std::path::Path;
//!
//! let dataset = read_path(Path::new("donnees_2023.xlsx"), None)?;
//! let index = dataset.header_index();
//! let code = index.find("Region Code");
//! println!("{} lignes, colonne code: {:?}", dataset.len(), code);
//! ```

pub mod boundaries;
pub mod dataset;
pub mod error;
pub mod format;
pub mod header;
pub mod reader;
pub mod writer;

pub use boundaries::{parse_boundaries, AggregateBoundary, BoundarySet, CommuneBoundary, Validity};
pub use dataset::{Cell, Dataset, HeaderIndex};
pub use error::TabularError;
pub use format::FileFormat;
pub use header::normalize_header;
pub use reader::json::{read_structured, StructuredEntry};
pub use reader::{read_bytes, read_path};
pub use writer::{write_workbook, HeaderStyle, Sheet};
