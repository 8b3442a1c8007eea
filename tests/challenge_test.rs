//! Integration tests for challenge input discovery and JSON output.

use std::fs;
use std::path::Path;

use sectionrank::extract::{document_name, DocumentSource};
use sectionrank::{
    find_challenge_file, report, Challenge, Error, ExtractedDocument, HashingEmbedder,
    JsonFormat, PageLayout, Pipeline, Result, TextBlock, TextSpan,
};

const TRAVEL_CHALLENGE: &str = r#"{
    "challenge_info": {
        "challenge_id": "round_1b_002",
        "test_case_name": "travel_planner",
        "description": "France Travel"
    },
    "documents": [
        { "filename": "Cities.pdf", "title": "Cities" },
        { "filename": "Cuisine.pdf", "title": "Cuisine" }
    ],
    "persona": { "role": "Travel Planner" },
    "job_to_be_done": { "task": "Plan a trip of 4 days for a group of 10 college friends." }
}"#;

/// Builds a small document for any requested file name.
struct GeneratedSource;

impl DocumentSource for GeneratedSource {
    fn name(&self) -> &str {
        "generated"
    }

    fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
        let name = document_name(path);
        let body: Vec<_> = "Group trip ideas for college friends on a budget."
            .split_whitespace()
            .map(|w| TextSpan::styled(w, 10.0, "Arial"))
            .collect();
        let title = format!("{} for groups", name.trim_end_matches(".pdf"));
        let heading = TextSpan::styled(title, 15.0, "Arial-Bold");

        Ok(ExtractedDocument::new(name).with_page(PageLayout::new(
            1,
            vec![TextBlock::from_spans(vec![heading]), TextBlock::from_spans(body)],
        )))
    }
}

#[test]
fn test_find_challenge_file_picks_first_json_by_name() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("b_input.json"), "{}").unwrap();
    fs::write(dir.path().join("a_input.JSON"), "{}").unwrap();
    fs::write(dir.path().join("0_readme.txt"), "notes").unwrap();
    fs::create_dir(dir.path().join("0_dir.json")).unwrap();

    let found = find_challenge_file(dir.path()).unwrap();
    assert_eq!(found, dir.path().join("a_input.JSON"));
}

#[test]
fn test_find_challenge_file_without_json() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("guide.pdf"), "%PDF-1.4").unwrap();

    let err = find_challenge_file(dir.path()).unwrap_err();
    assert!(matches!(err, Error::Challenge(_)));
}

#[test]
fn test_challenge_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("challenge1b_input.json");
    fs::write(&path, TRAVEL_CHALLENGE).unwrap();

    let challenge = Challenge::from_path(&path).unwrap();

    assert_eq!(challenge.documents.len(), 2);
    assert_eq!(challenge.documents[0].title.as_deref(), Some("Cities"));
    assert_eq!(
        challenge.document_paths(dir.path()),
        vec![dir.path().join("Cities.pdf"), dir.path().join("Cuisine.pdf")]
    );
}

#[test]
fn test_malformed_challenge_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ \"documents\": [").unwrap();

    let err = Challenge::from_path(&path).unwrap_err();
    assert!(matches!(err, Error::Challenge(ref msg) if msg.contains("broken.json")));
}

#[test]
fn test_blank_persona_and_task_rejected() {
    let json = r#"{
        "documents": [],
        "persona": { "role": "  " },
        "job_to_be_done": { "task": "" }
    }"#;
    let challenge = Challenge::from_json(json).unwrap();
    assert!(matches!(challenge.query(), Err(Error::InvalidQuery(_))));
}

#[test]
fn test_run_challenge_output_shape() {
    let challenge = Challenge::from_json(TRAVEL_CHALLENGE).unwrap();
    let result = Pipeline::new(HashingEmbedder::default())
        .with_source(GeneratedSource)
        .run_challenge(&challenge, Path::new("input"))
        .unwrap();

    let json = report::to_json(&result, JsonFormat::Pretty).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    let metadata = &value["metadata"];
    assert_eq!(
        metadata["input_documents"],
        serde_json::json!(["Cities.pdf", "Cuisine.pdf"])
    );
    assert_eq!(metadata["persona"], "Travel Planner");
    assert_eq!(
        metadata["job_to_be_done"],
        "Plan a trip of 4 days for a group of 10 college friends."
    );
    let timestamp = metadata["processing_timestamp"].as_str().unwrap();
    assert_eq!(timestamp.len(), "2025-07-10T15:31:22Z".len());
    assert!(timestamp.ends_with('Z'));

    let sections = value["extracted_sections"].as_array().unwrap();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0]["importance_rank"], 1);
    assert_eq!(sections[0]["page_number"], 1);
    let keys: Vec<_> = sections[0].as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys.len(), 4);

    let refined = value["subsection_analysis"].as_array().unwrap();
    assert_eq!(refined.len(), 2);
    assert_eq!(
        refined[0]["refined_text"],
        "Group trip ideas for college friends on a budget."
    );
}
