//! Error types for pdfinspect.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pdfinspect operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while inspecting a PDF.
///
/// The step-level variants (`DocumentOpen`, `EmptyDocument`, `PageSelect`,
/// `Extraction`)
/// wrap a leaf cause and name the step that failed, so the message printed
/// at the process boundary tells the user where inspection stopped.
#[derive(Error, Debug)]
pub enum Error {
    /// The document could not be opened.
    #[error("failed to open document '{}': {source}", path.display())]
    DocumentOpen {
        /// Path that was being opened
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: Box<Error>,
    },

    /// The document opened but has no pages to select.
    #[error("document '{}' has no pages", path.display())]
    EmptyDocument {
        /// Path of the empty document
        path: PathBuf,
    },

    /// A page exists but could not be selected.
    #[error("failed to select page {page}: {source}")]
    PageSelect {
        /// Page number (1-indexed)
        page: u32,
        /// Underlying cause
        #[source]
        source: Box<Error>,
    },

    /// Text or table extraction failed on a page.
    #[error("failed to extract {step} from page {page}: {source}")]
    Extraction {
        /// Extraction step ("text" or "tables")
        step: &'static str,
        /// Page number (1-indexed)
        page: u32,
        /// Underlying cause
        #[source]
        source: Box<Error>,
    },

    /// I/O error when reading files or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("document is encrypted")]
    Encrypted,

    /// Page number is out of range.
    #[error("page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Error while rendering a report.
    #[error("rendering error: {0}")]
    Render(String),
}

impl Error {
    /// Wrap this error as an open-step failure for `path`.
    pub(crate) fn opening(self, path: impl Into<PathBuf>) -> Self {
        Error::DocumentOpen {
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// Wrap this error as a page-select failure.
    pub(crate) fn selecting(self, page: u32) -> Self {
        Error::PageSelect {
            page,
            source: Box::new(self),
        }
    }

    /// Wrap this error as an extraction-step failure.
    pub(crate) fn extracting(self, step: &'static str, page: u32) -> Self {
        Error::Extraction {
            step,
            page,
            source: Box::new(self),
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Encrypted;
        assert_eq!(err.to_string(), "document is encrypted");

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "page 10 is out of range (document has 5 pages)"
        );
    }

    #[test]
    fn test_open_error_names_path() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "No such file or directory");
        let err = Error::from(io_err).opening("/tmp/missing.pdf");
        let msg = err.to_string();
        assert!(msg.contains("/tmp/missing.pdf"));
        assert!(msg.starts_with("failed to open document"));
        assert!(msg.contains("No such file or directory"));
    }

    #[test]
    fn test_empty_document_display() {
        let err = Error::EmptyDocument {
            path: PathBuf::from("blank.pdf"),
        };
        assert_eq!(err.to_string(), "document 'blank.pdf' has no pages");
    }

    #[test]
    fn test_extraction_names_step() {
        let err = Error::PdfParse("bad operator".into()).extracting("tables", 1);
        assert_eq!(
            err.to_string(),
            "failed to extract tables from page 1: PDF parsing error: bad operator"
        );
    }

    #[test]
    fn test_page_select_names_page() {
        let err = Error::PdfParse("object 4 0 not found".into()).selecting(1);
        assert_eq!(
            err.to_string(),
            "failed to select page 1: PDF parsing error: object 4 0 not found"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
