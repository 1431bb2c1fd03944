use thiserror::Error;

/// Failure taxonomy for the whole pipeline.
///
/// Load and sheet errors halt the session; chart errors are absorbed by
/// the exporters, which substitute a visible placeholder and continue.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("impossible de lire le classeur: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("feuille manquante ou illisible: {name}")]
    Sheet { name: String },

    #[error("erreur d'E/S: {0}")]
    Io(#[from] std::io::Error),

    // The reason alone; exporters prepend their own placeholder label.
    #[error("{0}")]
    Chart(String),

    #[error("erreur d'export Excel: {0}")]
    Excel(String),

    #[error("erreur d'export PDF: {0}")]
    Pdf(String),
}

impl From<rust_xlsxwriter::XlsxError> for ReportError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        ReportError::Excel(e.to_string())
    }
}

impl From<lopdf::Error> for ReportError {
    fn from(e: lopdf::Error) -> Self {
        ReportError::Pdf(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
