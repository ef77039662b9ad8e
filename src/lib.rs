//! # pdfinspect
//!
//! First-page PDF inspection: open a document, take its first page, and
//! extract the page's text and tables.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfinspect::{inspect_file, InspectOptions};
//!
//! fn main() -> pdfinspect::Result<()> {
//!     let inspection = inspect_file("document.pdf", &InspectOptions::default())?;
//!     inspection.write_text(&mut std::io::stdout())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Text extraction**: reading-order text rebuilt from glyph positions,
//!   with an optional layout-preserving mode
//! - **Table extraction**: ruled tables from drawn lines, or
//!   whitespace-aligned tables from word positions
//! - **Reports**: the delimited text report, or JSON that also carries the
//!   document's Info metadata

pub mod detect;
pub mod document;
pub mod error;
pub mod metadata;
pub mod parser;
pub mod report;
pub mod table;

pub use detect::{is_pdf_bytes, sniff_bytes, sniff_path, PdfHeader};
pub use document::{Document, Page};
pub use error::{Error, Result};
pub use metadata::Metadata;
pub use parser::{LopdfBackend, PdfBackend, TextOptions, UnicodeNorm};
pub use report::{format_row, Inspection, JsonFormat, PageInfo, ReportFormat};
pub use table::{Table, TableDetectorConfig, TableSettings, TableStrategy};

use std::path::Path;

/// Options controlling what is extracted from the page.
#[derive(Debug, Clone, Default)]
pub struct InspectOptions {
    /// Text extraction options
    pub text: TextOptions,
    /// Table finding settings
    pub tables: TableSettings,
}

impl InspectOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable layout-preserving text.
    pub fn with_layout(mut self, layout: bool) -> Self {
        self.text = self.text.with_layout(layout);
        self
    }

    /// Set the table strategy.
    pub fn with_table_strategy(mut self, strategy: TableStrategy) -> Self {
        self.tables = self.tables.with_strategy(strategy);
        self
    }

    /// Replace the text options.
    pub fn with_text_options(mut self, text: TextOptions) -> Self {
        self.text = text;
        self
    }

    /// Replace the table settings.
    pub fn with_table_settings(mut self, tables: TableSettings) -> Self {
        self.tables = tables;
        self
    }
}

/// Inspect the first page of a PDF file.
///
/// The document is closed before this returns, whether or not extraction
/// succeeded.
///
/// # Example
///
/// ```no_run
/// use pdfinspect::{inspect_file, InspectOptions};
///
/// let inspection = inspect_file("document.pdf", &InspectOptions::default()).unwrap();
/// println!("{} table(s)", inspection.tables.len());
/// ```
pub fn inspect_file<P: AsRef<Path>>(path: P, options: &InspectOptions) -> Result<Inspection> {
    let path = path.as_ref();
    let document = Document::open(path)?;
    inspect_document(&document, options)
}

/// Inspect the first page of a PDF held in memory.
pub fn inspect_bytes(data: &[u8], options: &InspectOptions) -> Result<Inspection> {
    let document = Document::from_bytes(data)?;
    inspect_document(&document, options)
}

/// Inspect the first page of an already opened document.
pub fn inspect_document<B: PdfBackend>(
    document: &Document<B>,
    options: &InspectOptions,
) -> Result<Inspection> {
    let page = document.first_page()?;
    let metadata = document.metadata();
    log::debug!(
        "PDF {}{}, {} page(s)",
        metadata.pdf_version,
        if metadata.encrypted { " (encrypted)" } else { "" },
        document.page_count()
    );
    let text = page.extract_text(&options.text)?;
    let tables = page.extract_tables(&options.tables)?;

    log::info!(
        "page {}: {} text, {} table(s)",
        page.number(),
        if text.is_some() { "found" } else { "no" },
        tables.len()
    );

    Ok(Inspection {
        path: document
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
        page_count: document.page_count(),
        metadata,
        page: PageInfo {
            number: page.number(),
            width: page.width(),
            height: page.height(),
        },
        text,
        tables,
    })
}

/// Builder for inspecting PDF documents.
///
/// # Example
///
/// ```no_run
/// use pdfinspect::{Inspector, TableStrategy};
///
/// let report = Inspector::new()
///     .layout()
///     .table_strategy(TableStrategy::Text)
///     .inspect("document.pdf")?
///     .to_text()?;
/// # Ok::<(), pdfinspect::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Inspector {
    options: InspectOptions,
}

impl Inspector {
    /// Create a new inspector with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Preserve the page layout in extracted text.
    pub fn layout(mut self) -> Self {
        self.options = self.options.with_layout(true);
        self
    }

    /// Set the table strategy.
    pub fn table_strategy(mut self, strategy: TableStrategy) -> Self {
        self.options = self.options.with_table_strategy(strategy);
        self
    }

    /// Set Unicode normalization of extracted text.
    pub fn unicode_norm(mut self, norm: UnicodeNorm) -> Self {
        self.options.text = self.options.text.with_unicode_norm(norm);
        self.options.tables.text = self.options.tables.text.with_unicode_norm(norm);
        self
    }

    /// Current options.
    pub fn options(&self) -> &InspectOptions {
        &self.options
    }

    /// Inspect a PDF file.
    pub fn inspect<P: AsRef<Path>>(&self, path: P) -> Result<Inspection> {
        inspect_file(path, &self.options)
    }

    /// Inspect a PDF from bytes.
    pub fn inspect_bytes(&self, data: &[u8]) -> Result<Inspection> {
        inspect_bytes(data, &self.options)
    }
}
