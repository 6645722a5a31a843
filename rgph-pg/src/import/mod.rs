//! Pipeline d'import des données démographiques
//!
//! fichier → [`ParsedSource`] → [`ImportBatch`] (une entrée par zone) →
//! remplacement des données du recensement dans une transaction.

pub mod batch;
pub mod boundaries;
pub mod columns;
pub mod directory;
pub mod pipeline;
pub mod row;
pub mod structured;

pub use batch::{build_batch, ImportBatch};
pub use boundaries::run_boundary_import;
pub use directory::ZoneDirectory;
pub use pipeline::{checksum, run_import, ImportRequest, ParsedSource, SourceKind};
pub use row::{ImportRecord, RowError};
