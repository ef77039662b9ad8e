//! Inspection results and report rendering.

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::table::Table;

const TEXT_HEADER: &str = "--- TEXT EXTRACTION ---";
const TEXT_FOOTER: &str = "-----------------------";
const TABLE_HEADER: &str = "--- TABLE EXTRACTION ---";
const TABLE_FOOTER: &str = "------------------------";

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Delimited sections for text and table rows
    #[default]
    Text,
    /// Serialized [`Inspection`]
    Json,
}

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Geometry of the inspected page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageInfo {
    /// Page number (1-indexed)
    pub number: u32,
    pub width: f32,
    pub height: f32,
}

/// What was extracted from the first page of one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inspection {
    /// Source file
    pub path: PathBuf,
    /// Total pages in the document
    pub page_count: u32,
    /// Document Info fields, header version and encryption flag.
    /// JSON only; the text report carries page content alone.
    pub metadata: Metadata,
    /// The inspected page
    pub page: PageInfo,
    /// Page text, absent when the page has no visible characters
    pub text: Option<String>,
    /// Tables, top to bottom
    pub tables: Vec<Table>,
}

impl Inspection {
    /// Write the delimited text report.
    pub fn write_text<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "{TEXT_HEADER}")?;
        if let Some(text) = &self.text {
            writeln!(out, "{text}")?;
        }
        writeln!(out, "{TEXT_FOOTER}")?;

        writeln!(out, "{TABLE_HEADER}")?;
        for table in &self.tables {
            for row in &table.rows {
                writeln!(out, "{}", format_row(row))?;
            }
        }
        writeln!(out, "{TABLE_FOOTER}")?;
        Ok(())
    }

    /// Render the delimited text report to a string.
    pub fn to_text(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_text(&mut buf)?;
        String::from_utf8(buf).map_err(|e| Error::Render(e.to_string()))
    }

    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        let result = match format {
            JsonFormat::Pretty => serde_json::to_string_pretty(self),
            JsonFormat::Compact => serde_json::to_string(self),
        };

        result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
    }

    /// Write the report in the requested format.
    pub fn write_report<W: Write>(
        &self,
        out: &mut W,
        format: ReportFormat,
        json: JsonFormat,
    ) -> Result<()> {
        match format {
            ReportFormat::Text => self.write_text(out),
            ReportFormat::Json => {
                writeln!(out, "{}", self.to_json(json)?)?;
                Ok(())
            }
        }
    }
}

/// Render a table row as a list literal, e.g. `['A', 'B', None]`.
pub fn format_row(row: &[Option<String>]) -> String {
    let cells: Vec<String> = row
        .iter()
        .map(|cell| match cell {
            Some(text) => quote(text),
            None => "None".to_string(),
        })
        .collect();
    format!("[{}]", cells.join(", "))
}

/// Quote a cell as a string literal.
///
/// Single quotes are used unless the text contains a single quote and no
/// double quote.
fn quote(text: &str) -> String {
    let delim = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(text.len() + 2);
    out.push(delim);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}
