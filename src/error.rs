//! Structured error types for the user-facing failure kinds. Pipeline and
//! I/O plumbing uses `anyhow` with context, as elsewhere in the crate.

use std::path::PathBuf;

/// Input-validation failures raised while ingesting the first sheet.
/// All of them block progression to preview/export.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The sheet has zero rows, or every row is blank.
    #[error("the sheet is empty: no rows with any content")]
    EmptyInput,

    /// The first non-blank row was classified as a header, but no header
    /// cell carries any text.
    #[error("the header row contains no usable column names")]
    MissingHeader,

    /// Everything after the header was blank.
    #[error("no data rows remain after dropping blank rows")]
    NoDataRows,
}

/// Template loading failures. Fatal for any operation needing the template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error(
        "cannot read template `{path}`: {source}; \
         restore the default template file or pick one explicitly"
    )]
    Unreachable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document parsed, but nothing substitutable remains.
    #[error("template `{0}` has an empty body")]
    EmptyBody(String),
}
