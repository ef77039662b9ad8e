//! Opened documents and their pages.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::detect::{sniff_bytes, sniff_path};
use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::parser::{
    extract_text, BBox, ContentInterpreter, Edge, LopdfBackend, PageId, PageObjects, PdfBackend,
    TextChar, TextOptions,
};
use crate::table::{find_tables, Table, TableSettings};

/// Name reported for documents that were not read from a file.
const IN_MEMORY: &str = "<memory>";

/// An opened PDF document.
///
/// The underlying backend is released when the document is dropped.
pub struct Document<B: PdfBackend = LopdfBackend> {
    backend: B,
    path: Option<PathBuf>,
    pages: BTreeMap<u32, PageId>,
}

impl Document<LopdfBackend> {
    /// Open a PDF file.
    ///
    /// Every failure is reported as [`Error::DocumentOpen`] naming `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let header = sniff_path(path).map_err(|e| e.opening(path))?;
        log::debug!("{}: {} header at offset {}", path.display(), header, header.offset);

        let backend = LopdfBackend::load_file(path).map_err(|e| e.opening(path))?;
        Ok(Self::with_backend(backend, Some(path.to_path_buf())))
    }

    /// Open a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        sniff_bytes(data).map_err(|e| e.opening(IN_MEMORY))?;
        let backend = LopdfBackend::load_bytes(data).map_err(|e| e.opening(IN_MEMORY))?;
        Ok(Self::with_backend(backend, None))
    }

    /// Open a PDF from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| Error::from(e).opening(IN_MEMORY))?;
        Self::from_bytes(&data)
    }

    /// PDF version from the file header.
    pub fn version(&self) -> String {
        self.backend.version()
    }
}

impl<B: PdfBackend> Document<B> {
    /// Wrap an already loaded backend.
    pub fn with_backend(backend: B, path: Option<PathBuf>) -> Self {
        let pages = backend.pages();
        Self {
            backend,
            path,
            pages,
        }
    }

    /// Path the document was opened from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Document information dictionary and header version.
    pub fn metadata(&self) -> Metadata {
        self.backend.metadata()
    }

    /// Get a page by 1-indexed number.
    pub fn page(&self, number: u32) -> Result<Page<'_, B>> {
        let id = *self
            .pages
            .get(&number)
            .ok_or(Error::PageOutOfRange(number, self.page_count()))?;
        let bbox = self
            .backend
            .media_box(id)
            .map_err(|e| e.selecting(number))?;
        Ok(Page::new(&self.backend, id, number, bbox))
    }

    /// Get the first page of the document.
    pub fn first_page(&self) -> Result<Page<'_, B>> {
        let Some(&number) = self.pages.keys().next() else {
            return Err(Error::EmptyDocument {
                path: self
                    .path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(IN_MEMORY)),
            });
        };
        self.page(number)
    }
}

/// A read-only view of one page.
///
/// The page's characters and ruling edges are interpreted on first use
/// and cached for subsequent extractions.
pub struct Page<'a, B: PdfBackend> {
    backend: &'a B,
    id: PageId,
    number: u32,
    bbox: BBox,
    objects: OnceCell<PageObjects>,
}

impl<'a, B: PdfBackend> Page<'a, B> {
    fn new(backend: &'a B, id: PageId, number: u32, bbox: BBox) -> Self {
        Self {
            backend,
            id,
            number,
            bbox,
            objects: OnceCell::new(),
        }
    }

    /// Page number (1-indexed).
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn width(&self) -> f32 {
        self.bbox.width()
    }

    pub fn height(&self) -> f32 {
        self.bbox.height()
    }

    /// The page's MediaBox.
    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    /// Interpreted page content.
    pub fn objects(&self) -> Result<&PageObjects> {
        if let Some(objects) = self.objects.get() {
            return Ok(objects);
        }
        let objects = ContentInterpreter::new(self.backend, self.id)?.interpret_page()?;
        log::debug!(
            "page {}: {} chars, {} edges",
            self.number,
            objects.chars.len(),
            objects.edges.len()
        );
        Ok(self.objects.get_or_init(|| objects))
    }

    pub fn chars(&self) -> Result<&[TextChar]> {
        Ok(&self.objects()?.chars)
    }

    pub fn edges(&self) -> Result<&[Edge]> {
        Ok(&self.objects()?.edges)
    }

    /// Extract the page's text in reading order.
    ///
    /// Returns `Ok(None)` when the page has no visible characters.
    pub fn extract_text(&self, options: &TextOptions) -> Result<Option<String>> {
        let objects = self
            .objects()
            .map_err(|e| e.extracting("text", self.number))?;
        Ok(extract_text(&objects.chars, &self.bbox, options))
    }

    /// Find the tables on the page, top to bottom then left to right.
    pub fn extract_tables(&self, settings: &TableSettings) -> Result<Vec<Table>> {
        let objects = self
            .objects()
            .map_err(|e| e.extracting("tables", self.number))?;
        Ok(find_tables(objects, settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Object, Stream};

    fn build_pdf(contents: &[&str]) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids: Vec<Object> = Vec::new();
        for content in contents {
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_first_page_geometry() {
        let data = build_pdf(&["BT /F1 12 Tf 72 720 Td (Hello) Tj ET"]);
        let doc = Document::from_bytes(&data).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert!(doc.path().is_none());

        let page = doc.first_page().unwrap();
        assert_eq!(page.number(), 1);
        assert_eq!(page.width(), 595.0);
        assert_eq!(page.height(), 842.0);
    }

    #[test]
    fn test_extract_text_from_first_page_only() {
        let data = build_pdf(&[
            "BT /F1 12 Tf 72 720 Td (Hello) Tj ET",
            "BT /F1 12 Tf 72 720 Td (Second) Tj ET",
        ]);
        let doc = Document::from_bytes(&data).unwrap();
        let page = doc.first_page().unwrap();
        let text = page.extract_text(&TextOptions::default()).unwrap();
        assert_eq!(text.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_blank_page_has_no_text() {
        let data = build_pdf(&["0 0 m 10 0 l S"]);
        let doc = Document::from_bytes(&data).unwrap();
        let page = doc.first_page().unwrap();
        assert_eq!(page.extract_text(&TextOptions::default()).unwrap(), None);
        assert!(page
            .extract_tables(&TableSettings::default())
            .unwrap()
            .is_empty());
        assert_eq!(page.edges().unwrap().len(), 1);
    }

    #[test]
    fn test_objects_are_cached() {
        let data = build_pdf(&["BT /F1 12 Tf 72 720 Td (Hi) Tj ET"]);
        let doc = Document::from_bytes(&data).unwrap();
        let page = doc.first_page().unwrap();
        let first = page.chars().unwrap().as_ptr();
        let second = page.chars().unwrap().as_ptr();
        assert_eq!(first, second);
        assert_eq!(page.chars().unwrap().len(), 2);
    }

    #[test]
    fn test_from_reader_and_version() {
        let data = build_pdf(&["BT /F1 12 Tf 72 720 Td (Hello) Tj ET"]);
        let doc = Document::from_reader(std::io::Cursor::new(data)).unwrap();
        assert_eq!(doc.version(), "1.5");
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.metadata().pdf_version, "1.5");
        assert!(!doc.metadata().encrypted);
    }

    #[test]
    fn test_from_reader_rejects_garbage() {
        let err = Document::from_reader(&b"GIF89a"[..]).err().unwrap();
        assert!(matches!(err, Error::DocumentOpen { .. }));
        assert!(err.to_string().contains("<memory>"));
    }

    /// Backend whose pages all have an unreadable MediaBox.
    struct BrokenGeometry;

    impl PdfBackend for BrokenGeometry {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            BTreeMap::from([(1, (4, 0))])
        }

        fn media_box(&self, _page: PageId) -> Result<BBox> {
            Err(Error::PdfParse("object 4 0 not found".to_string()))
        }

        fn page_fonts(&self, _page: PageId) -> Result<Vec<crate::parser::BackendFont>> {
            Ok(Vec::new())
        }

        fn page_content(&self, _page: PageId) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }

        fn decode_content(&self, _data: &[u8]) -> Result<Vec<crate::parser::ContentOp>> {
            Ok(Vec::new())
        }

        fn font_decoders(
            &self,
            _page: PageId,
        ) -> std::collections::HashMap<Vec<u8>, crate::parser::TextDecoder<'_>> {
            std::collections::HashMap::new()
        }
    }

    #[test]
    fn test_page_select_failure_names_step() {
        let doc = Document::with_backend(BrokenGeometry, None);
        let err = doc.first_page().err().unwrap();
        assert!(matches!(err, Error::PageSelect { page: 1, .. }));
        assert!(err.to_string().starts_with("failed to select page 1"));
        assert_eq!(doc.metadata(), Metadata::default());
    }

    #[test]
    fn test_page_out_of_range() {
        let data = build_pdf(&["BT ET"]);
        let doc = Document::from_bytes(&data).unwrap();
        assert!(matches!(doc.page(3), Err(Error::PageOutOfRange(3, 1))));
    }

    #[test]
    fn test_empty_document() {
        let data = build_pdf(&[]);
        let doc = Document::from_bytes(&data).unwrap();
        assert_eq!(doc.page_count(), 0);
        let err = doc.first_page().err().unwrap();
        assert!(matches!(err, Error::EmptyDocument { .. }));
        assert!(err.to_string().contains("has no pages"));
    }

    #[test]
    fn test_garbage_bytes_fail_to_open() {
        let err = Document::from_bytes(b"not a pdf at all").err().unwrap();
        assert!(matches!(err, Error::DocumentOpen { .. }));
        assert!(err.to_string().contains("not a valid PDF"));
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = Document::open("/nonexistent/missing.pdf").err().unwrap();
        assert!(err.to_string().contains("/nonexistent/missing.pdf"));
    }
}
