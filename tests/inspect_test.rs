//! Integration tests for first-page inspection.

mod common;

use common::{
    build_document, build_pdf, encrypt_with_empty_password, helvetica, save,
    set_first_page_contents, temp_pdf, write_temp, ALIGNED_TABLE_PAGE, BULLET_LIST_PAGE,
    MERGED_TABLE_PAGE, RECT_TABLE_PAGE, RULED_TABLE_PAGE, TEXT_PAGE,
};
use lopdf::{dictionary, Dictionary, Object};
use pdfinspect::{
    inspect_bytes, inspect_file, Document, Error, InspectOptions, Inspector, JsonFormat,
    TableDetectorConfig, TableSettings, TableStrategy, TextOptions,
};

fn row(values: &[&str]) -> Vec<Option<String>> {
    values.iter().map(|v| Some(v.to_string())).collect()
}

#[test]
fn test_known_text() {
    let file = temp_pdf(&[TEXT_PAGE]);
    let inspection = inspect_file(file.path(), &InspectOptions::default()).unwrap();

    assert_eq!(inspection.text.as_deref(), Some("Hello World\nSecond line"));
    assert_eq!(inspection.page_count, 1);
    assert_eq!(inspection.page.number, 1);
    assert_eq!(inspection.path, file.path());
}

#[test]
fn test_page_without_tables() {
    let file = temp_pdf(&[TEXT_PAGE]);
    let inspection = inspect_file(file.path(), &InspectOptions::default()).unwrap();
    assert!(inspection.tables.is_empty());

    let report = inspection.to_text().unwrap();
    assert!(report.ends_with("--- TABLE EXTRACTION ---\n------------------------\n"));
}

#[test]
fn test_ruled_table() {
    let file = temp_pdf(&[RULED_TABLE_PAGE]);
    let inspection = inspect_file(file.path(), &InspectOptions::default()).unwrap();

    assert_eq!(inspection.tables.len(), 1);
    assert_eq!(inspection.tables[0].rows, vec![row(&["A", "B"]), row(&["C", "D"])]);

    let report = inspection.to_text().unwrap();
    let ab = report.find("['A', 'B']").unwrap();
    let cd = report.find("['C', 'D']").unwrap();
    assert!(ab < cd);
}

#[test]
fn test_rectangle_table() {
    let inspection = inspect_bytes(&build_pdf(&[RECT_TABLE_PAGE]), &InspectOptions::default())
        .unwrap();
    assert_eq!(inspection.tables.len(), 1);
    assert_eq!(inspection.tables[0].rows, vec![row(&["A", "B"]), row(&["C", "D"])]);
}

#[test]
fn test_merged_cell_is_none() {
    let inspection = inspect_bytes(&build_pdf(&[MERGED_TABLE_PAGE]), &InspectOptions::default())
        .unwrap();
    assert_eq!(inspection.tables.len(), 1);

    let table = &inspection.tables[0];
    assert_eq!(table.rows[0], vec![Some("Title".to_string()), None]);
    assert_eq!(table.rows[1], row(&["C", "D"]));

    let report = inspection.to_text().unwrap();
    assert!(report.contains("['Title', None]\n"));
}

#[test]
fn test_text_strategy_finds_aligned_table() {
    let options = InspectOptions::new().with_table_strategy(TableStrategy::Text);
    let inspection = inspect_bytes(&build_pdf(&[ALIGNED_TABLE_PAGE]), &options).unwrap();

    assert_eq!(inspection.tables.len(), 1);
    assert_eq!(
        inspection.tables[0].rows,
        vec![row(&["Name", "Age"]), row(&["Alice", "30"]), row(&["Bob", "25"])]
    );

    // No rulings on the page
    let lines = inspect_bytes(&build_pdf(&[ALIGNED_TABLE_PAGE]), &InspectOptions::default())
        .unwrap();
    assert!(lines.tables.is_empty());
}

#[test]
fn test_text_strategy_rejects_bullet_list() {
    let inspection = Inspector::new()
        .table_strategy(TableStrategy::Text)
        .inspect_bytes(&build_pdf(&[BULLET_LIST_PAGE]))
        .unwrap();
    assert!(inspection.tables.is_empty());
    assert!(inspection.text.unwrap().contains("Management"));
}

#[test]
fn test_only_first_page_is_inspected() {
    let file = temp_pdf(&[TEXT_PAGE, RULED_TABLE_PAGE]);
    let inspection = inspect_file(file.path(), &InspectOptions::default()).unwrap();
    assert_eq!(inspection.page_count, 2);
    assert!(inspection.tables.is_empty());
    assert!(!inspection.text.unwrap().contains('A'));
}

#[test]
fn test_blank_page_text_is_absent() {
    let inspection = inspect_bytes(&build_pdf(&["q Q"]), &InspectOptions::default()).unwrap();
    assert_eq!(inspection.text, None);
    assert_eq!(
        inspection.to_text().unwrap(),
        "--- TEXT EXTRACTION ---\n\
         -----------------------\n\
         --- TABLE EXTRACTION ---\n\
         ------------------------\n"
    );
}

#[test]
fn test_missing_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.pdf");

    let err = inspect_file(&missing, &InspectOptions::default()).unwrap_err();
    assert!(matches!(err, Error::DocumentOpen { .. }));
    assert!(err.to_string().contains("missing.pdf"));
}

#[test]
fn test_not_a_pdf() {
    let file = common::write_temp(b"plain text, not a PDF");
    let err = inspect_file(file.path(), &InspectOptions::default()).unwrap_err();
    assert!(matches!(err, Error::DocumentOpen { .. }));
    assert!(err.to_string().contains("not a valid PDF"));
}

#[test]
fn test_zero_page_document() {
    let file = temp_pdf(&[]);
    let err = inspect_file(file.path(), &InspectOptions::default()).unwrap_err();
    assert!(matches!(err, Error::EmptyDocument { .. }));
    assert!(err.to_string().contains("has no pages"));
}

#[test]
fn test_idempotent() {
    let file = temp_pdf(&[RULED_TABLE_PAGE]);
    let options = InspectOptions::default();
    let first = inspect_file(file.path(), &options).unwrap();
    let second = inspect_file(file.path(), &options).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_text().unwrap(), second.to_text().unwrap());
}

#[test]
fn test_page_extraction_is_repeatable() {
    let file = temp_pdf(&[RULED_TABLE_PAGE]);
    let doc = Document::open(file.path()).unwrap();
    let page = doc.first_page().unwrap();
    let settings = InspectOptions::default().tables;

    let first = page.extract_tables(&settings).unwrap();
    let second = page.extract_tables(&settings).unwrap();
    assert_eq!(first, second);
    assert!(page.extract_text(&TextOptions::default()).unwrap().is_some());
}

#[test]
fn test_json_report() {
    let inspection = inspect_bytes(&build_pdf(&[RULED_TABLE_PAGE]), &InspectOptions::default())
        .unwrap();
    let json = inspection.to_json(JsonFormat::Compact).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["page_count"], 1);
    assert_eq!(value["page"]["width"], 612.0);
    assert_eq!(value["tables"][0]["rows"][1][0], "C");
}

/// A Type0 font whose only CIDFont has the given `W` array.
fn type0_font(w: Vec<Object>) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => "NotoSansCJK",
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Dictionary(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "W" => w,
        })],
    }
}

#[test]
fn test_type0_font_with_oversized_width_ranges() {
    let font = type0_font(vec![
        Object::Integer(4_294_967_295),
        vec![Object::Integer(500), Object::Integer(500)].into(),
        0.into(),
        Object::Integer(300_000_000),
        500.into(),
    ]);
    let data = save(&mut build_document(
        &["BT /F1 12 Tf 72 720 Td <00410042> Tj ET"],
        font,
    ));

    let inspection = inspect_bytes(&data, &InspectOptions::default()).unwrap();
    let text = inspection.text.unwrap();
    assert!(text.contains('A'));
    assert!(text.contains('B'));
}

#[test]
fn test_owner_password_only_pdf_is_decrypted() {
    let mut doc = build_document(&[TEXT_PAGE], helvetica());
    encrypt_with_empty_password(&mut doc, None);
    let file = write_temp(&save(&mut doc));

    let inspection = inspect_file(file.path(), &InspectOptions::default()).unwrap();
    assert_eq!(inspection.text.as_deref(), Some("Hello World\nSecond line"));
    assert!(inspection.metadata.encrypted);
}

#[test]
fn test_user_password_pdf_is_rejected() {
    let mut doc = build_document(&[TEXT_PAGE], helvetica());
    encrypt_with_empty_password(&mut doc, Some(vec![0; 32]));
    let file = write_temp(&save(&mut doc));

    let err = inspect_file(file.path(), &InspectOptions::default()).unwrap_err();
    match &err {
        Error::DocumentOpen { path, source } => {
            assert_eq!(path, file.path());
            assert!(matches!(**source, Error::Encrypted));
        }
        other => panic!("expected DocumentOpen, got {other:?}"),
    }
    assert!(err.to_string().contains("document is encrypted"));
}

#[test]
fn test_dangling_contents_is_extraction_error() {
    let mut doc = build_document(&[TEXT_PAGE], helvetica());
    set_first_page_contents(&mut doc, Object::Reference((9999, 0)));

    let err = inspect_bytes(&save(&mut doc), &InspectOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Extraction { step: "text", page: 1, .. }));
    assert!(err
        .to_string()
        .starts_with("failed to extract text from page 1"));
}

#[test]
fn test_non_stream_contents_is_extraction_error() {
    let mut doc = build_document(&[TEXT_PAGE], helvetica());
    set_first_page_contents(&mut doc, Object::Integer(42));

    let doc_bytes = save(&mut doc);
    let document = Document::from_bytes(&doc_bytes).unwrap();
    let page = document.first_page().unwrap();
    let err = page.extract_tables(&TableSettings::default()).unwrap_err();
    assert!(matches!(err, Error::Extraction { step: "tables", .. }));
    assert!(err.to_string().contains("invalid content stream"));
}

#[test]
fn test_metadata_in_json_report() {
    let mut doc = build_document(&[TEXT_PAGE], helvetica());
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Statement March"),
        "Producer" => Object::string_literal("Skia/PDF m120"),
        "CreationDate" => Object::string_literal("D:20240301090000+01'00'"),
    });
    doc.trailer.set("Info", info_id);

    let inspection = inspect_bytes(&save(&mut doc), &InspectOptions::default()).unwrap();
    assert_eq!(inspection.metadata.title.as_deref(), Some("Statement March"));
    assert_eq!(inspection.metadata.pdf_version, "1.5");
    assert!(!inspection.metadata.encrypted);

    let value: serde_json::Value =
        serde_json::from_str(&inspection.to_json(JsonFormat::Compact).unwrap()).unwrap();
    assert_eq!(value["metadata"]["producer"], "Skia/PDF m120");
    assert_eq!(value["metadata"]["created"], "2024-03-01T08:00:00Z");

    // The text report stays limited to page content
    assert!(!inspection.to_text().unwrap().contains("Skia"));
}

#[test]
fn test_custom_text_tolerance() {
    let page = "BT /F1 12 Tf 72 700 Td (Total:) Tj 60 1.5 Td (42.00) Tj ET";
    let data = build_pdf(&[page]);

    let default = inspect_bytes(&data, &InspectOptions::default()).unwrap();
    assert_eq!(default.text.as_deref(), Some("Total: 42.00"));

    let tight = InspectOptions::new().with_text_options(TextOptions::new().with_tolerance(3.0, 1.0));
    let split = inspect_bytes(&data, &tight).unwrap();
    assert_eq!(split.text.as_deref(), Some("42.00\nTotal:"));
}

#[test]
fn test_custom_detector_settings() {
    let settings = TableSettings::new()
        .with_strategy(TableStrategy::Text)
        .with_detector(TableDetectorConfig {
            min_rows: 4,
            ..TableDetectorConfig::default()
        });
    let options = InspectOptions::new().with_table_settings(settings);

    // three aligned rows fall short of four
    let inspection = inspect_bytes(&build_pdf(&[ALIGNED_TABLE_PAGE]), &options).unwrap();
    assert!(inspection.tables.is_empty());
}
