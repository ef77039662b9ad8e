//! Fixture PDFs built with lopdf.

#![allow(dead_code)]

use std::io::Write;

use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use tempfile::NamedTempFile;

/// Two lines of plain text.
pub const TEXT_PAGE: &str = "BT /F1 12 Tf 72 720 Td (Hello World) Tj 0 -20 Td (Second line) Tj ET";

/// A 2x2 grid of stroked rulings holding A, B / C, D.
pub const RULED_TABLE_PAGE: &str = "\
72 700 m 272 700 l S
72 670 m 272 670 l S
72 640 m 272 640 l S
72 640 m 72 700 l S
172 640 m 172 700 l S
272 640 m 272 700 l S
BT /F1 12 Tf 80 680 Td (A) Tj ET
BT /F1 12 Tf 180 680 Td (B) Tj ET
BT /F1 12 Tf 80 650 Td (C) Tj ET
BT /F1 12 Tf 180 650 Td (D) Tj ET";

/// The same grid drawn as four stroked rectangles.
pub const RECT_TABLE_PAGE: &str = "\
72 670 100 30 re 172 670 100 30 re 72 640 100 30 re 172 640 100 30 re S
BT /F1 12 Tf 80 680 Td (A) Tj ET
BT /F1 12 Tf 180 680 Td (B) Tj ET
BT /F1 12 Tf 80 650 Td (C) Tj ET
BT /F1 12 Tf 180 650 Td (D) Tj ET";

/// A header row spanning both columns of the row below it.
pub const MERGED_TABLE_PAGE: &str = "\
72 700 m 272 700 l S
72 670 m 272 670 l S
72 640 m 272 640 l S
72 640 m 72 700 l S
272 640 m 272 700 l S
172 640 m 172 670 l S
BT /F1 12 Tf 140 680 Td (Title) Tj ET
BT /F1 12 Tf 80 650 Td (C) Tj ET
BT /F1 12 Tf 180 650 Td (D) Tj ET";

/// Three rows of words aligned in two columns, with no rulings.
pub const ALIGNED_TABLE_PAGE: &str = "\
BT /F1 12 Tf 72 700 Td (Name) Tj 128 0 Td (Age) Tj ET
BT /F1 12 Tf 72 680 Td (Alice) Tj 128 0 Td (30) Tj ET
BT /F1 12 Tf 72 660 Td (Bob) Tj 128 0 Td (25) Tj ET";

/// A bulleted list, which must not read as a two-column table.
pub const BULLET_LIST_PAGE: &str = "\
BT /F1 12 Tf 72 700 Td (-) Tj 28 0 Td (Management) Tj ET
BT /F1 12 Tf 72 680 Td (-) Tj 28 0 Td (Interfaces) Tj ET
BT /F1 12 Tf 72 660 Td (-) Tj 28 0 Td (Firmware) Tj ET";

/// The Type1 font every fixture page uses as `/F1` unless told otherwise.
pub fn helvetica() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    }
}

/// Build a PDF with one page per content stream.
pub fn build_pdf(contents: &[&str]) -> Vec<u8> {
    save(&mut build_document(contents, helvetica()))
}

/// Build an unsaved document with one page per content stream, all pages
/// sharing `font` as `/F1`.
pub fn build_document(contents: &[&str], font: Dictionary) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(font);

    let mut kids: Vec<Object> = Vec::new();
    for content in contents {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
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
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn save(doc: &mut Document) -> Vec<u8> {
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("serialize fixture PDF");
    out
}

/// Point the first page's `/Contents` at `contents`.
pub fn set_first_page_contents(doc: &mut Document, contents: Object) {
    let page_id = *doc.get_pages().get(&1).expect("fixture has a first page");
    doc.get_dictionary_mut(page_id)
        .expect("page dictionary")
        .set("Contents", contents);
}

/// RC4-encrypt every string and stream with the standard security handler
/// (40-bit key, revision 2) keyed by the empty user password.
///
/// `user_hash` becomes the `/U` entry. Without one, lopdf accepts the
/// empty password unchecked; a wrong hash makes the empty password fail.
pub fn encrypt_with_empty_password(doc: &mut Document, user_hash: Option<Vec<u8>>) {
    let mut encrypt = dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "Length" => 40,
        "O" => Object::string_literal(vec![0x5A_u8; 32]),
        "P" => -44,
    };
    if let Some(hash) = user_hash {
        encrypt.set("U", Object::string_literal(hash));
    }
    let encrypt_id = doc.add_object(encrypt);
    doc.trailer.set("Encrypt", encrypt_id);
    doc.trailer.set(
        "ID",
        vec![
            Object::string_literal("pdfinspect-fixt"),
            Object::string_literal("pdfinspect-fixt"),
        ],
    );

    let key = lopdf::encryption::get_encryption_key(doc, "", false).expect("derive fixture key");
    for (&id, obj) in doc.objects.iter_mut() {
        if id == encrypt_id {
            continue;
        }
        // RC4 is symmetric, so decrypting plaintext encrypts it
        let Ok(cipher) = lopdf::encryption::decrypt_object(&key, id, obj) else {
            continue;
        };
        match obj {
            Object::Stream(stream) => stream.set_content(cipher),
            Object::String(bytes, _) => *bytes = cipher,
            _ => {}
        }
    }
}

/// Write `data` to a temporary `.pdf` file that lives as long as the handle.
pub fn write_temp(data: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .expect("create temp file");
    file.write_all(data).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

/// Build a PDF and write it to a temporary file.
pub fn temp_pdf(contents: &[&str]) -> NamedTempFile {
    write_temp(&build_pdf(contents))
}
