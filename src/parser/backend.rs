//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for PDF operations, isolating
//! the concrete PDF library (lopdf) from content interpretation and
//! table finding.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use lopdf::{Dictionary, Document as LopdfDocument, Object};

use crate::error::{Error, Result};
use crate::metadata::{parse_pdf_date, Metadata};

use super::font::FontMetrics;
use super::geometry::BBox;

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// Largest CID a two-byte character code can select.
const MAX_CID: u32 = 0xFFFF;

/// US Letter, used when a page tree carries no usable MediaBox.
const DEFAULT_MEDIA_BOX: BBox = BBox {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// Font information returned by the backend.
#[derive(Debug, Clone)]
pub struct BackendFont {
    /// Font resource name (key in the page's font dictionary).
    pub name: Vec<u8>,
    /// Base font name (e.g., "Helvetica-Bold").
    pub base_font: String,
    /// Glyph advance metrics.
    pub metrics: FontMetrics,
}

/// Decodes a string operand shown with one font.
pub type TextDecoder<'a> = Box<dyn Fn(&[u8]) -> String + 'a>;

/// A value from a PDF content stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

impl PdfValue {
    /// Numeric value of an integer or real operand.
    pub fn as_number(&self) -> Option<f32> {
        match self {
            PdfValue::Integer(i) => Some(*i as f32),
            PdfValue::Real(r) => Some(*r),
            _ => None,
        }
    }
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    /// Create an operation (handy for tests and synthetic streams).
    pub fn new(operator: &str, operands: Vec<PdfValue>) -> Self {
        Self {
            operator: operator.to_string(),
            operands,
        }
    }

    /// Operand `idx` as a number.
    pub fn number(&self, idx: usize) -> Option<f32> {
        self.operands.get(idx).and_then(PdfValue::as_number)
    }
}

/// Abstract interface for PDF document access.
///
/// Implementations provide page enumeration, page geometry, font metrics,
/// content stream decoding and text decoding, without exposing any concrete
/// PDF library types.
pub trait PdfBackend {
    /// Return all pages as (page_number → PageId), page numbers 1-indexed.
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Return the page's MediaBox, honouring inheritance from the page tree.
    fn media_box(&self, page: PageId) -> Result<BBox>;

    /// Return font info for a given page.
    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFont>>;

    /// Return the raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// Resolve a text decoder for each font on the page, keyed by resource name.
    ///
    /// Fonts missing from the map have no usable encoding; their strings
    /// fall back to [`decode_text_simple`].
    fn font_decoders(&self, page: PageId) -> HashMap<Vec<u8>, TextDecoder<'_>>;

    /// Document information and header version.
    fn metadata(&self) -> Metadata {
        Metadata::default()
    }
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

// ---------------------------------------------------------------------------
// LopdfBackend: concrete implementation backed by lopdf
// ---------------------------------------------------------------------------

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
    encrypted: bool,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path)?;
        Self::checked(doc)
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)?;
        Self::checked(doc)
    }

    /// Decrypt with the empty user password when the file is encrypted.
    ///
    /// Owner-password-only files (print or copy restrictions) open this way.
    /// Anything that needs a real user password is rejected as encrypted.
    fn checked(mut doc: LopdfDocument) -> Result<Self> {
        let encrypted = doc.is_encrypted();
        if encrypted {
            doc.decrypt("").map_err(|e| {
                log::debug!("empty user password rejected: {}", e);
                Error::Encrypted
            })?;
            log::debug!("decrypted with the empty user password");
        }
        Ok(Self { doc, encrypted })
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    /// Follow a single indirect reference.
    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        self.resolve(obj).and_then(|o| o.as_dict().ok())
    }

    fn resolve_array<'a>(&'a self, obj: &'a Object) -> Option<&'a Vec<Object>> {
        self.resolve(obj).and_then(|o| o.as_array().ok())
    }

    fn number(&self, obj: &Object) -> Option<f32> {
        self.resolve(obj).and_then(|o| o.as_float().ok())
    }

    /// Build glyph metrics from a font dictionary.
    fn font_metrics(&self, font: &Dictionary) -> FontMetrics {
        let subtype = font
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .unwrap_or_default();

        if subtype == b"Type0" {
            return self.composite_metrics(font);
        }

        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|o| self.number(o))
            .unwrap_or(0.0) as u32;
        let widths: Vec<f32> = font
            .get(b"Widths")
            .ok()
            .and_then(|o| self.resolve_array(o))
            .map(|arr| arr.iter().map(|w| self.number(w).unwrap_or(0.0)).collect())
            .unwrap_or_default();
        let missing_width = font
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| self.resolve_dict(o))
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(|o| self.number(o));

        FontMetrics::simple(first_char, widths, missing_width)
    }

    /// Metrics for a Type0 font, read from its first descendant CIDFont.
    fn composite_metrics(&self, font: &Dictionary) -> FontMetrics {
        let descendant = font
            .get(b"DescendantFonts")
            .ok()
            .and_then(|o| self.resolve_array(o))
            .and_then(|arr| arr.first())
            .and_then(|o| self.resolve_dict(o));

        let Some(descendant) = descendant else {
            return FontMetrics::composite(None, HashMap::new());
        };

        let default_width = descendant
            .get(b"DW")
            .ok()
            .and_then(|o| self.number(o));

        let mut widths = HashMap::new();
        if let Some(w) = descendant
            .get(b"W")
            .ok()
            .and_then(|o| self.resolve_array(o))
        {
            self.parse_cid_widths(w, &mut widths);
        }

        FontMetrics::composite(default_width, widths)
    }

    /// Parse a CIDFont `W` array: `c [w1 w2 ...]` or `c_first c_last w`.
    ///
    /// CIDs outside `0..=MAX_CID` are dropped, as are reversed ranges.
    fn parse_cid_widths(&self, w: &[Object], out: &mut HashMap<u32, f32>) {
        let mut i = 0;
        while i < w.len() {
            let Some(first) = self.number(&w[i]) else {
                break;
            };
            match w.get(i + 1).and_then(|o| self.resolve(o)) {
                Some(Object::Array(list)) => {
                    if let Some(first) = cid(first) {
                        for (offset, width) in list.iter().enumerate() {
                            let Some(code) = u32::try_from(offset)
                                .ok()
                                .and_then(|o| first.checked_add(o))
                                .filter(|c| *c <= MAX_CID)
                            else {
                                break;
                            };
                            if let Some(width) = self.number(width) {
                                out.insert(code, width);
                            }
                        }
                    } else {
                        log::debug!("W entry at CID {} is out of range", first);
                    }
                    i += 2;
                }
                Some(last) => {
                    let (Some(last), Some(width)) =
                        (self.number(last), w.get(i + 2).and_then(|o| self.number(o)))
                    else {
                        break;
                    };
                    match (cid(first), cid(last)) {
                        (Some(first), Some(last)) if first <= last => {
                            for code in first..=last {
                                out.insert(code, width);
                            }
                        }
                        _ => log::debug!("W range {}..{} skipped", first, last),
                    }
                    i += 3;
                }
                None => break,
            }
        }
    }

    /// Text string from the Info dictionary, `None` when absent or blank.
    fn info_string(&self, info: &Dictionary, key: &[u8]) -> Option<String> {
        let text = match self.resolve(info.get(key).ok()?)? {
            Object::String(bytes, _) => decode_text_simple(bytes),
            Object::Name(name) => String::from_utf8_lossy(name).into_owned(),
            _ => return None,
        };
        let text = text.trim_matches(char::from(0)).trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn media_box(&self, page: PageId) -> Result<BBox> {
        let mut node = self
            .doc
            .get_dictionary(page)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        // Bounded walk: malformed files can contain Parent cycles
        for _ in 0..32 {
            if let Some(arr) = node
                .get(b"MediaBox")
                .ok()
                .and_then(|o| self.resolve_array(o))
            {
                let nums: Vec<f32> = arr.iter().filter_map(|o| self.number(o)).collect();
                if nums.len() >= 4 {
                    return Ok(BBox::new(nums[0], nums[1], nums[2], nums[3]));
                }
            }
            match node.get(b"Parent").ok().and_then(|o| self.resolve_dict(o)) {
                Some(parent) => node = parent,
                None => break,
            }
        }

        log::debug!("page {:?} has no MediaBox, assuming Letter", page);
        Ok(DEFAULT_MEDIA_BOX)
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFont>> {
        let lopdf_fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        let mut result = Vec::with_capacity(lopdf_fonts.len());
        for (name, font_dict) in &lopdf_fonts {
            let base_font = font_dict
                .get(b"BaseFont")
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            result.push(BackendFont {
                name: name.clone(),
                base_font,
                metrics: self.font_metrics(font_dict),
            });
        }
        Ok(result)
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>> {
        let page_dict = self
            .doc
            .get_dictionary(page)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        // A page without /Contents is blank, not broken
        let Ok(contents) = page_dict.get(b"Contents") else {
            return Ok(Vec::new());
        };

        let streams: Vec<&Object> = match self.resolve(contents) {
            Some(Object::Array(arr)) => arr.iter().collect(),
            Some(obj) => vec![obj],
            None => return Err(Error::PdfParse("dangling /Contents reference".to_string())),
        };

        let mut content = Vec::new();
        for obj in streams {
            match self.resolve(obj) {
                Some(Object::Stream(s)) => {
                    let data = s
                        .decompressed_content()
                        .unwrap_or_else(|_| s.content.clone());
                    content.extend_from_slice(&data);
                    content.push(b'\n');
                }
                _ => return Err(Error::PdfParse("invalid content stream".to_string())),
            }
        }
        Ok(content)
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content =
            lopdf::content::Content::decode(data).map_err(|e| Error::PdfParse(e.to_string()))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operands: op.operands.iter().map(convert_object).collect(),
                operator: op.operator,
            })
            .collect())
    }

    fn font_decoders(&self, page: PageId) -> HashMap<Vec<u8>, TextDecoder<'_>> {
        let mut decoders: HashMap<Vec<u8>, TextDecoder<'_>> = HashMap::new();
        let Ok(lopdf_fonts) = self.doc.get_page_fonts(page) else {
            return decoders;
        };

        for (name, font_dict) in lopdf_fonts {
            // lopdf only reads encodings from dictionaries typed /Font
            if !font_dict.type_is(b"Font") {
                continue;
            }
            match font_dict.get_font_encoding(&self.doc) {
                Ok(enc) => {
                    let decoder: TextDecoder<'_> = Box::new(move |bytes: &[u8]| {
                        LopdfDocument::decode_text(&enc, bytes)
                            .unwrap_or_else(|_| decode_text_simple(bytes))
                    });
                    decoders.insert(name, decoder);
                }
                Err(e) => log::debug!(
                    "font {} has no usable encoding: {}",
                    String::from_utf8_lossy(&name),
                    e
                ),
            }
        }
        decoders
    }

    fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::with_version(self.version());
        metadata.encrypted = self.encrypted;

        let Some(info) = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|o| self.resolve_dict(o))
        else {
            return metadata;
        };

        metadata.title = self.info_string(info, b"Title");
        metadata.author = self.info_string(info, b"Author");
        metadata.subject = self.info_string(info, b"Subject");
        metadata.keywords = self.info_string(info, b"Keywords");
        metadata.creator = self.info_string(info, b"Creator");
        metadata.producer = self.info_string(info, b"Producer");
        metadata.created = self
            .info_string(info, b"CreationDate")
            .and_then(|d| parse_pdf_date(&d));
        metadata.modified = self
            .info_string(info, b"ModDate")
            .and_then(|d| parse_pdf_date(&d));
        metadata
    }
}

/// A `W` array value as a CID, if it is one a two-byte code can select.
fn cid(value: f32) -> Option<u32> {
    (0.0..=MAX_CID as f32)
        .contains(&value)
        .then(|| value as u32)
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        _ => PdfValue::Other,
    }
}
