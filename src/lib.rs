//! schetovod — row-to-document pipeline. Turns a transport-services
//! spreadsheet (one header row + data rows) into paired invoice/act
//! documents rendered from HTML templates, exported as a ZIP of per-row
//! PDF pairs or as two combined multi-page PDFs.
//!
//! Data flows strictly downstream: ingest → alias → (stored row set) →
//! enrich per export run → substitute → batch export. The spreadsheet
//! decoder and the HTML-to-PDF engine live outside this crate; the decoder
//! hands over an [`ingest::Sheet`] grid and the renderer plugs in behind
//! [`render::PdfRenderer`].

pub mod enrich;
pub mod error;
pub mod export;
pub mod ingest;
pub mod layout;
pub mod render;
pub mod row;
pub mod session;
pub mod template;

pub use error::{LoadError, TemplateError};
pub use export::{ExportMode, ExportOptions, ExportOutput, ExportProgress};
pub use ingest::Sheet;
pub use render::{PageFormat, PageOptions, PdfRenderer};
pub use row::{CellValue, Row};
pub use session::Session;
pub use template::{Template, TemplateKind};
