//! PDF parsing module.
//!
//! The backend reads the document; the interpreter turns a page's content
//! stream into characters and ruling edges; layout turns characters back
//! into words, lines and text.

mod backend;
mod content;
mod font;
mod geometry;
mod layout;

pub use backend::{
    decode_text_simple, BackendFont, ContentOp, LopdfBackend, PageId, PdfBackend, PdfValue,
    TextDecoder,
};
pub use content::{ContentInterpreter, PageObjects, TextChar};
pub use font::FontMetrics;
pub use geometry::{BBox, Edge, Matrix, Orientation};
pub use layout::{
    extract_text, group_chars_into_spans, group_spans_into_lines, TextLine, TextOptions,
    TextSpan, UnicodeNorm,
};
