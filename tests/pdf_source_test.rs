//! Integration tests for the lopdf extraction backend.
//!
//! Fixtures are generated with lopdf into temporary directories.

use std::fs;
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use sectionrank::extract::DocumentSource;
use sectionrank::{
    segment_bytes, segment_file, Error, HashingEmbedder, PdfSource, Pipeline, Query,
};

/// A line of text drawn at an absolute position.
struct Line<'a> {
    font: &'a str,
    size: i64,
    y: i64,
    text: &'a str,
}

fn heading(y: i64, text: &str) -> Line<'_> {
    Line {
        font: "F2",
        size: 18,
        y,
        text,
    }
}

fn body(y: i64, text: &str) -> Line<'_> {
    Line {
        font: "F1",
        size: 11,
        y,
        text,
    }
}

/// Build a PDF with one page per entry; `None` makes a page without contents.
fn build_pdf(pages: &[Option<Vec<Line>>]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };

        if let Some(lines) = lines {
            let mut operations = Vec::new();
            for line in lines {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new(
                    "Tf",
                    vec![line.font.into(), line.size.into()],
                ));
                operations.push(Operation::new("Td", vec![72.into(), line.y.into()]));
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(line.text)],
                ));
                operations.push(Operation::new("ET", vec![]));
            }
            let content = Content { operations };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            page.set("Contents", content_id);
        }

        kids.push(doc.add_object(page).into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

fn riviera_guide() -> Document {
    build_pdf(&[
        Some(vec![
            heading(720, "Coastal Towns"),
            body(690, "Nice has a long pebble beach."),
            body(676, "Antibes hides a quiet old port."),
            body(662, "Menton is known for lemons."),
        ]),
        Some(vec![
            heading(720, "Local Food"),
            body(690, "Local food markets sell socca every morning."),
            body(676, "Socca is a chickpea pancake."),
            body(662, "Desserts lean on citrus and almonds."),
        ]),
    ])
}

fn save(doc: &mut Document, dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

#[test]
fn test_extract_blocks_and_styles() {
    let dir = tempfile::tempdir().unwrap();
    let path = save(&mut riviera_guide(), dir.path(), "riviera.pdf");

    let doc = PdfSource::new().extract(&path).unwrap();

    assert_eq!(doc.name, "riviera.pdf");
    assert_eq!(doc.pages.len(), 2);
    assert_eq!(doc.pages[0].number, 1);

    let blocks = &doc.pages[0].blocks;
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].text(), "Coastal Towns");

    let lead = blocks[0].first_span().unwrap();
    assert!(lead.is_bold);
    assert_eq!(lead.font_size, 18.0);
    assert_eq!(lead.font_name, "Helvetica-Bold");

    assert_eq!(blocks[1].lines.len(), 3);
    assert_eq!(doc.pages[0].base_font_size(10.0), 11.0);
}

#[test]
fn test_segment_generated_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let path = save(&mut riviera_guide(), dir.path(), "riviera.pdf");

    let sections = segment_file(&path).unwrap();

    let titles: Vec<_> = sections.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Coastal Towns", "Local Food"]);
    assert_eq!(
        sections[0].content,
        "Nice has a long pebble beach. Antibes hides a quiet old port. Menton is known for lemons."
    );
    // Closed by the heading on page 2
    assert_eq!(sections[0].page_number, 2);
    assert_eq!(sections[1].page_number, 2);
}

#[test]
fn test_segment_bytes_matches_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = riviera_guide();
    let path = save(&mut doc, dir.path(), "riviera.pdf");

    let data = fs::read(&path).unwrap();
    let from_bytes = segment_bytes("riviera.pdf", &data).unwrap();
    let from_file = segment_file(&path).unwrap();

    assert_eq!(from_bytes, from_file);
}

#[test]
fn test_page_without_contents_yields_no_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = build_pdf(&[
        None,
        Some(vec![body(700, "Only the second page has text.")]),
    ]);
    let path = save(&mut doc, dir.path(), "sparse.pdf");

    let extracted = PdfSource::new().extract(&path).unwrap();

    assert!(extracted.pages[0].blocks.is_empty());
    assert_eq!(extracted.pages[1].blocks.len(), 1);

    let sections = segment_file(&path).unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].title, "Introduction");
}

#[test]
fn test_non_pdf_is_unknown_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.pdf");
    fs::write(&path, "These are plain text notes, not a PDF.").unwrap();

    let err = PdfSource::new().extract(&path).unwrap_err();
    assert!(matches!(err, Error::UnknownFormat));
}

#[test]
fn test_truncated_pdf_is_document_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.pdf");
    fs::write(&path, "%PDF-1.7\n1 0 obj << /Type /Catalog").unwrap();

    let err = PdfSource::new().extract(&path).unwrap_err();
    assert!(err.is_document_error(), "unexpected error: {}", err);
}

#[test]
fn test_missing_file_is_io_error() {
    let err = PdfSource::new()
        .extract(Path::new("/nonexistent/sectionrank/guide.pdf"))
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_pipeline_over_generated_pdfs() {
    let dir = tempfile::tempdir().unwrap();
    let guide = save(&mut riviera_guide(), dir.path(), "riviera.pdf");
    let broken = dir.path().join("broken.pdf");
    fs::write(&broken, "not a pdf at all").unwrap();

    let query = Query::new("Food Critic", "Find the best local food").unwrap();
    let result = Pipeline::new(HashingEmbedder::default())
        .run(&[broken, guide], &query)
        .unwrap();

    assert_eq!(
        result.metadata.input_documents,
        vec!["broken.pdf", "riviera.pdf"]
    );

    let ranked: Vec<_> = result
        .extracted_sections
        .iter()
        .map(|s| (s.importance_rank, s.section_title.as_str()))
        .collect();
    assert_eq!(ranked, vec![(1, "Local Food"), (2, "Coastal Towns")]);

    assert_eq!(result.subsection_analysis.len(), 1);
    assert_eq!(
        result.subsection_analysis[0].refined_text,
        "Local food markets sell socca every morning."
    );
    assert_eq!(result.subsection_analysis[0].document, "riviera.pdf");
}
